//! The platform surface the agent drives.
//!
//! In the worker this is `fetch`, `CacheStorage` and `clients` (see
//! [`crate::web::WebHost`]). Keeping it behind a trait lets the fetch policy
//! run against an in-memory host in native tests.

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Cors,
    Default,
    Error,
    Opaque,
    OpaqueRedirect,
}

pub trait FetchRequest: Sized {
    fn method(&self) -> String;
    fn url(&self) -> String;
    fn mode(&self) -> RequestMode;
    fn destination(&self) -> Destination;
    /// Independent copy with its own readable body.
    fn try_clone(&self) -> Result<Self, AgentError>;
}

pub trait FetchResponse: Sized {
    fn status(&self) -> u16;
    fn kind(&self) -> ResponseKind;
    fn redirected(&self) -> bool;
    /// Independent copy with its own readable body.
    fn try_clone(&self) -> Result<Self, AgentError>;
}

/// Cache and network operations used by [`crate::OfflineCacheAgent`].
///
/// Every cache operation names the cache it targets; `add_all`, `put` and
/// the `match_*` calls open (or create) that cache first.
#[allow(async_fn_in_trait)]
pub trait Host: Clone + 'static {
    type Request: FetchRequest + 'static;
    type Response: FetchResponse + 'static;

    async fn fetch(&self, request: Self::Request) -> Result<Self::Response, AgentError>;

    /// Fetches every url and stores the responses in one batch. Fails
    /// without a partial guarantee if any url fails or answers non-OK.
    async fn add_all(&self, cache: &str, urls: &[String]) -> Result<(), AgentError>;

    async fn match_request(
        &self,
        cache: &str,
        request: &Self::Request,
    ) -> Result<Option<Self::Response>, AgentError>;

    async fn match_url(&self, cache: &str, url: &str) -> Result<Option<Self::Response>, AgentError>;

    async fn put(
        &self,
        cache: &str,
        request: &Self::Request,
        response: Self::Response,
    ) -> Result<(), AgentError>;

    async fn cache_names(&self) -> Result<Vec<String>, AgentError>;

    async fn delete_cache(&self, cache: &str) -> Result<bool, AgentError>;

    fn text_response(
        &self,
        status: u16,
        content_type: &str,
        body: &str,
    ) -> Result<Self::Response, AgentError>;

    async fn skip_waiting(&self) -> Result<(), AgentError>;

    async fn claim_clients(&self) -> Result<(), AgentError>;
}
