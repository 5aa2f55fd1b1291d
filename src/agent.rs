use futures::future::{LocalBoxFuture, join_all};

use crate::config::{AgentConfig, NETWORK_ERROR_BODY};
use crate::error::AgentError;
use crate::host::{Destination, FetchRequest, FetchResponse, Host, RequestMode, ResponseKind};
use crate::sync::{EmptyQueue, PendingActionQueue, SyncOutcome};

/// Which branch of the fetch policy produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    OfflinePage,
    OfflineImage,
    NetworkError,
}

pub struct Interception<R> {
    pub response: R,
    pub source: ResponseSource,
    /// Cache write to run after the response is handed back. Failures are
    /// logged inside the future.
    pub background: Option<LocalBoxFuture<'static, ()>>,
}

impl<R> Interception<R> {
    fn settled(response: R, source: ResponseSource) -> Self {
        Self {
            response,
            source,
            background: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, AgentError)>,
    pub claim_error: Option<AgentError>,
}

pub struct OfflineCacheAgent<H, Q = EmptyQueue> {
    config: AgentConfig,
    host: H,
    queue: Q,
}

impl<H: Host> OfflineCacheAgent<H, EmptyQueue> {
    pub fn new(config: AgentConfig, host: H) -> Self {
        Self::with_queue(config, host, EmptyQueue)
    }
}

impl<H: Host, Q: PendingActionQueue> OfflineCacheAgent<H, Q> {
    pub fn with_queue(config: AgentConfig, host: H, queue: Q) -> Self {
        Self {
            config,
            host,
            queue,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Stores the whole manifest in the current cache, then skips waiting.
    pub async fn install(&self) -> Result<(), AgentError> {
        let cache = &self.config.cache_name;
        log::info!("opening cache {}", cache);

        self.host
            .add_all(cache, self.config.assets.urls())
            .await
            .map_err(|err| match err {
                AgentError::Install { .. } => err,
                other => AgentError::Install {
                    cache: cache.clone(),
                    reason: other.to_string(),
                },
            })?;
        log::info!("precached {} assets into {}", self.config.assets.len(), cache);

        self.host.skip_waiting().await
    }

    /// Drops every cache except the current one and claims open clients.
    /// Never fails; problems end up in the report and the log.
    pub async fn activate(&self) -> ActivationReport {
        let mut report = ActivationReport::default();

        let names = match self.host.cache_names().await {
            Ok(names) => names,
            Err(err) => {
                log::warn!("could not list caches: {}", err);
                Vec::new()
            }
        };

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| *name != self.config.cache_name)
            .collect();

        let deletions = stale.iter().map(|name| async move {
            log::info!("Deleting old cache: {}", name);
            (name.clone(), self.host.delete_cache(name).await)
        });

        for (name, result) in join_all(deletions).await {
            match result {
                Ok(_) => report.deleted.push(name),
                Err(err) => {
                    log::warn!("failed to delete cache {}: {}", name, err);
                    report.failed.push((name, err));
                }
            }
        }

        if let Err(err) = self.host.claim_clients().await {
            log::warn!("clients.claim failed: {}", err);
            report.claim_error = Some(err);
        }

        report
    }

    /// Cache first, then network, then an offline substitute.
    pub async fn intercept(
        &self,
        request: H::Request,
    ) -> Result<Interception<H::Response>, AgentError> {
        let cache = &self.config.cache_name;

        match self.host.match_request(cache, &request).await {
            Ok(Some(cached)) => return Ok(Interception::settled(cached, ResponseSource::Cache)),
            Ok(None) => {}
            Err(err) => log::warn!("cache lookup for {} failed: {}", request.url(), err),
        }

        let fetched = match request.try_clone() {
            Ok(network_request) => self.host.fetch(network_request).await,
            Err(err) => Err(err),
        };

        match fetched {
            Ok(response) => Ok(self.network_response(request, response)),
            Err(err) => {
                log::debug!("network unavailable for {}: {}", request.url(), err);
                self.offline_fallback(&request).await
            }
        }
    }

    fn network_response(
        &self,
        request: H::Request,
        response: H::Response,
    ) -> Interception<H::Response> {
        if !is_valid_response(&response) || !self.is_cacheable_request(&request) {
            return Interception::settled(response, ResponseSource::Network);
        }

        let copy = match response.try_clone() {
            Ok(copy) => copy,
            Err(err) => {
                log::warn!("not caching {}: {}", request.url(), err);
                return Interception::settled(response, ResponseSource::Network);
            }
        };

        Interception {
            response,
            source: ResponseSource::Network,
            background: Some(self.cache_write(request, copy)),
        }
    }

    fn is_cacheable_request(&self, request: &H::Request) -> bool {
        request.method() == "GET" && !self.config.is_uncacheable_url(&request.url())
    }

    fn cache_write(
        &self,
        request: H::Request,
        response: H::Response,
    ) -> LocalBoxFuture<'static, ()> {
        let host = self.host.clone();
        let cache = self.config.cache_name.clone();
        Box::pin(async move {
            if let Err(err) = host.put(&cache, &request, response).await {
                log::warn!("failed to cache {}: {}", request.url(), err);
            }
        })
    }

    async fn offline_fallback(
        &self,
        request: &H::Request,
    ) -> Result<Interception<H::Response>, AgentError> {
        let fallback = if request.mode() == RequestMode::Navigate {
            Some((self.config.offline_page.as_str(), ResponseSource::OfflinePage))
        } else if request.destination() == Destination::Image {
            Some((self.config.offline_image.as_str(), ResponseSource::OfflineImage))
        } else {
            None
        };

        if let Some((url, source)) = fallback {
            match self.host.match_url(&self.config.cache_name, url).await {
                Ok(Some(cached)) => return Ok(Interception::settled(cached, source)),
                Ok(None) => log::warn!("offline fallback {} is not cached", url),
                Err(err) => log::warn!("offline fallback {} unavailable: {}", url, err),
            }
        }

        let response = self.host.text_response(408, "text/plain", NETWORK_ERROR_BODY)?;
        Ok(Interception::settled(response, ResponseSource::NetworkError))
    }

    pub async fn sync(&self, tag: &str) -> Result<SyncOutcome, AgentError> {
        if tag != self.config.sync_tag {
            log::debug!("ignoring sync tag {}", tag);
            return Ok(SyncOutcome::Ignored);
        }

        let actions = self.queue.pending().await?;
        if actions.is_empty() {
            return Ok(SyncOutcome::Empty);
        }

        log::info!("Syncing favorites ({} pending)", actions.len());
        for action in &actions {
            log::debug!("sync {}: {} bytes", action.kind, action.payload.len());
        }
        self.queue.clear().await?;

        Ok(SyncOutcome::Synced(actions.len()))
    }
}

/// Only same-origin, unredirected 200s are worth keeping.
fn is_valid_response<R: FetchResponse>(response: &R) -> bool {
    response.status() == 200 && response.kind() == ResponseKind::Basic && !response.redirected()
}
