//! In-memory host for driving the agent in native tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use crate::error::AgentError;
use crate::host::{Destination, FetchRequest, FetchResponse, Host, RequestMode, ResponseKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRequest {
    method: String,
    url: String,
    mode: RequestMode,
    destination: Destination,
    body_used: bool,
}

impl MemoryRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.to_string(),
            mode: RequestMode::Cors,
            destination: Destination::Other,
            body_used: false,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn body_used(mut self) -> Self {
        self.body_used = true;
        self
    }
}

impl FetchRequest for MemoryRequest {
    fn method(&self) -> String {
        self.method.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn mode(&self) -> RequestMode {
        self.mode
    }

    fn destination(&self) -> Destination {
        self.destination
    }

    fn try_clone(&self) -> Result<Self, AgentError> {
        if self.body_used {
            return Err(AgentError::BodyUsed(self.url.clone()));
        }
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryResponse {
    pub status: u16,
    pub kind: ResponseKind,
    pub redirected: bool,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub body_used: bool,
}

impl MemoryResponse {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            kind: ResponseKind::Basic,
            redirected: false,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
            body_used: false,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn redirected(mut self) -> Self {
        self.redirected = true;
        self
    }

    pub fn body_used(mut self) -> Self {
        self.body_used = true;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl FetchResponse for MemoryResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn kind(&self) -> ResponseKind {
        self.kind
    }

    fn redirected(&self) -> bool {
        self.redirected
    }

    fn try_clone(&self) -> Result<Self, AgentError> {
        if self.body_used {
            return Err(AgentError::BodyUsed(format!("response {}", self.status)));
        }
        Ok(self.clone())
    }
}

#[derive(Default)]
struct State {
    caches: BTreeMap<String, BTreeMap<String, MemoryResponse>>,
    network: HashMap<String, MemoryResponse>,
    fetched: Vec<String>,
    puts: usize,
    fail_puts: bool,
    fail_matches: bool,
    fail_cache_names: bool,
    fail_claim: bool,
    fail_skip_waiting: bool,
    fail_delete: HashSet<String>,
    skipped_waiting: bool,
    claimed: bool,
}

/// Cache storage plus a canned network. Urls not served by the network
/// behave as if the device were offline.
#[derive(Clone, Default)]
pub struct MemoryHost {
    state: Rc<RefCell<State>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, response: MemoryResponse) {
        self.state.borrow_mut().network.insert(url.to_string(), response);
    }

    pub fn seed(&self, cache: &str, url: &str, response: MemoryResponse) {
        self.state
            .borrow_mut()
            .caches
            .entry(cache.to_string())
            .or_default()
            .insert(url.to_string(), response);
    }

    pub fn cached(&self, cache: &str, url: &str) -> Option<MemoryResponse> {
        self.state.borrow().caches.get(cache)?.get(url).cloned()
    }

    pub fn cache_keys(&self, cache: &str) -> Vec<String> {
        self.state
            .borrow()
            .caches
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.borrow().fetched.clone()
    }

    pub fn puts(&self) -> usize {
        self.state.borrow().puts
    }

    pub fn fail_puts(&self) {
        self.state.borrow_mut().fail_puts = true;
    }

    pub fn fail_matches(&self) {
        self.state.borrow_mut().fail_matches = true;
    }

    pub fn fail_cache_names(&self) {
        self.state.borrow_mut().fail_cache_names = true;
    }

    pub fn fail_claim(&self) {
        self.state.borrow_mut().fail_claim = true;
    }

    pub fn fail_skip_waiting(&self) {
        self.state.borrow_mut().fail_skip_waiting = true;
    }

    pub fn fail_delete(&self, cache: &str) {
        self.state.borrow_mut().fail_delete.insert(cache.to_string());
    }

    pub fn skipped_waiting(&self) -> bool {
        self.state.borrow().skipped_waiting
    }

    pub fn claimed(&self) -> bool {
        self.state.borrow().claimed
    }

    fn check_match(&self, cache: &str) -> Result<(), AgentError> {
        if self.state.borrow().fail_matches {
            return Err(AgentError::Cache {
                cache: cache.to_string(),
                reason: "match rejected".to_string(),
            });
        }
        Ok(())
    }
}

impl Host for MemoryHost {
    type Request = MemoryRequest;
    type Response = MemoryResponse;

    async fn fetch(&self, request: MemoryRequest) -> Result<MemoryResponse, AgentError> {
        let mut state = self.state.borrow_mut();
        state.fetched.push(request.url.clone());
        state.network.get(&request.url).cloned().ok_or(AgentError::Network {
            url: request.url,
            reason: "offline".to_string(),
        })
    }

    async fn add_all(&self, cache: &str, urls: &[String]) -> Result<(), AgentError> {
        let mut state = self.state.borrow_mut();
        let mut batch = Vec::with_capacity(urls.len());
        for url in urls {
            match state.network.get(url) {
                Some(response) if (200..300).contains(&response.status) => {
                    batch.push((url.clone(), response.clone()))
                }
                Some(response) => {
                    return Err(AgentError::Install {
                        cache: cache.to_string(),
                        reason: format!("{} answered {}", url, response.status),
                    });
                }
                None => {
                    return Err(AgentError::Install {
                        cache: cache.to_string(),
                        reason: format!("{} unreachable", url),
                    });
                }
            }
        }
        state.caches.entry(cache.to_string()).or_default().extend(batch);
        Ok(())
    }

    async fn match_request(
        &self,
        cache: &str,
        request: &MemoryRequest,
    ) -> Result<Option<MemoryResponse>, AgentError> {
        self.check_match(cache)?;
        if request.method != "GET" {
            return Ok(None);
        }
        Ok(self.cached(cache, &request.url))
    }

    async fn match_url(&self, cache: &str, url: &str) -> Result<Option<MemoryResponse>, AgentError> {
        self.check_match(cache)?;
        Ok(self.cached(cache, url))
    }

    async fn put(
        &self,
        cache: &str,
        request: &MemoryRequest,
        response: MemoryResponse,
    ) -> Result<(), AgentError> {
        let mut state = self.state.borrow_mut();
        if state.fail_puts || request.method != "GET" {
            return Err(AgentError::Cache {
                cache: cache.to_string(),
                reason: "put rejected".to_string(),
            });
        }
        state.puts += 1;
        state
            .caches
            .entry(cache.to_string())
            .or_default()
            .insert(request.url.clone(), response);
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>, AgentError> {
        if self.state.borrow().fail_cache_names {
            return Err(AgentError::Js("caches.keys rejected".to_string()));
        }
        Ok(self.state.borrow().caches.keys().cloned().collect())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, AgentError> {
        let mut state = self.state.borrow_mut();
        if state.fail_delete.contains(cache) {
            return Err(AgentError::Cache {
                cache: cache.to_string(),
                reason: "delete rejected".to_string(),
            });
        }
        Ok(state.caches.remove(cache).is_some())
    }

    fn text_response(
        &self,
        status: u16,
        content_type: &str,
        body: &str,
    ) -> Result<MemoryResponse, AgentError> {
        Ok(MemoryResponse {
            status,
            kind: ResponseKind::Default,
            redirected: false,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.as_bytes().to_vec(),
            body_used: false,
        })
    }

    async fn skip_waiting(&self) -> Result<(), AgentError> {
        if self.state.borrow().fail_skip_waiting {
            return Err(AgentError::Js("skipWaiting rejected".to_string()));
        }
        self.state.borrow_mut().skipped_waiting = true;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), AgentError> {
        if self.state.borrow().fail_claim {
            return Err(AgentError::Js("clients.claim rejected".to_string()));
        }
        self.state.borrow_mut().claimed = true;
        Ok(())
    }
}
