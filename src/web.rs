use std::rc::Rc;

use js_sys::{Array, Function, Promise, Reflect};
use wasm_bindgen::{JsCast, closure::Closure, prelude::*};
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{
    Cache, CacheStorage, ExtendableEvent, FetchEvent, Headers, Request, Response, ResponseInit,
    ServiceWorkerGlobalScope,
};

use crate::agent::OfflineCacheAgent;
use crate::error::{AgentError, js_value_to_string};
use crate::host::{Destination, FetchRequest, FetchResponse, Host, RequestMode, ResponseKind};
use crate::sync::PendingActionQueue;

/// [`Host`] backed by the service worker global scope.
#[derive(Clone)]
pub struct WebHost {
    scope: ServiceWorkerGlobalScope,
}

impl WebHost {
    pub fn new() -> Result<Self, AgentError> {
        let scope = js_sys::global()
            .dyn_into::<ServiceWorkerGlobalScope>()
            .map_err(|err| AgentError::Js(format!("not a service worker scope: {:?}", err)))?;
        Ok(Self { scope })
    }

    pub fn scope(&self) -> &ServiceWorkerGlobalScope {
        &self.scope
    }

    fn caches(&self) -> Result<CacheStorage, AgentError> {
        self.scope.caches().map_err(AgentError::from_js_value)
    }

    async fn open(&self, name: &str) -> Result<Cache, AgentError> {
        let cache_value = JsFuture::from(self.caches()?.open(name))
            .await
            .map_err(|err| AgentError::cache(name, err))?;
        cache_value
            .dyn_into::<Cache>()
            .map_err(|err| AgentError::cache(name, err))
    }
}

async fn matched_response(name: &str, promise: Promise) -> Result<Option<Response>, AgentError> {
    let matched = JsFuture::from(promise)
        .await
        .map_err(|err| AgentError::cache(name, err))?;

    if matched.is_undefined() || matched.is_null() {
        return Ok(None);
    }

    Ok(Some(
        matched
            .dyn_into::<Response>()
            .map_err(|err| AgentError::cache(name, err))?,
    ))
}

fn js_function(target: &JsValue, name: &str) -> Result<Function, AgentError> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(AgentError::from_js_value)?
        .dyn_into::<Function>()
        .map_err(|_| AgentError::Js(format!("{} missing", name)))
}

impl FetchRequest for Request {
    fn method(&self) -> String {
        Request::method(self)
    }

    fn url(&self) -> String {
        Request::url(self)
    }

    fn mode(&self) -> RequestMode {
        match Request::mode(self) {
            web_sys::RequestMode::Navigate => RequestMode::Navigate,
            web_sys::RequestMode::SameOrigin => RequestMode::SameOrigin,
            web_sys::RequestMode::NoCors => RequestMode::NoCors,
            web_sys::RequestMode::Cors => RequestMode::Cors,
            _ => RequestMode::Other,
        }
    }

    fn destination(&self) -> Destination {
        match Request::destination(self) {
            web_sys::RequestDestination::Document => Destination::Document,
            web_sys::RequestDestination::Image => Destination::Image,
            web_sys::RequestDestination::Script => Destination::Script,
            web_sys::RequestDestination::Style => Destination::Style,
            web_sys::RequestDestination::Font => Destination::Font,
            _ => Destination::Other,
        }
    }

    fn try_clone(&self) -> Result<Self, AgentError> {
        Request::clone(self).map_err(|err| AgentError::BodyUsed(js_value_to_string(&err)))
    }
}

impl FetchResponse for Response {
    fn status(&self) -> u16 {
        Response::status(self)
    }

    fn kind(&self) -> ResponseKind {
        match Response::type_(self) {
            web_sys::ResponseType::Basic => ResponseKind::Basic,
            web_sys::ResponseType::Cors => ResponseKind::Cors,
            web_sys::ResponseType::Opaque => ResponseKind::Opaque,
            web_sys::ResponseType::Opaqueredirect => ResponseKind::OpaqueRedirect,
            web_sys::ResponseType::Error => ResponseKind::Error,
            _ => ResponseKind::Default,
        }
    }

    fn redirected(&self) -> bool {
        Response::redirected(self)
    }

    fn try_clone(&self) -> Result<Self, AgentError> {
        Response::clone(self).map_err(|err| AgentError::BodyUsed(js_value_to_string(&err)))
    }
}

impl Host for WebHost {
    type Request = Request;
    type Response = Response;

    async fn fetch(&self, request: Request) -> Result<Response, AgentError> {
        let url = request.url();
        let network_error = |err: JsValue| AgentError::Network {
            url: url.clone(),
            reason: js_value_to_string(&err),
        };
        let fetched = JsFuture::from(self.scope.fetch_with_request(&request))
            .await
            .map_err(network_error)?;
        fetched.dyn_into::<Response>().map_err(network_error)
    }

    async fn add_all(&self, cache: &str, urls: &[String]) -> Result<(), AgentError> {
        let install_error = |err: JsValue| AgentError::Install {
            cache: cache.to_string(),
            reason: js_value_to_string(&err),
        };
        let opened = self.open(cache).await?;
        let requests: Array = urls.iter().map(|url| JsValue::from_str(url)).collect();
        let _ = JsFuture::from(opened.add_all_with_str_sequence(&requests))
            .await
            .map_err(install_error)?;
        Ok(())
    }

    async fn match_request(&self, cache: &str, request: &Request) -> Result<Option<Response>, AgentError> {
        let opened = self.open(cache).await?;
        matched_response(cache, opened.match_with_request(request)).await
    }

    async fn match_url(&self, cache: &str, url: &str) -> Result<Option<Response>, AgentError> {
        let opened = self.open(cache).await?;
        matched_response(cache, opened.match_with_str(url)).await
    }

    async fn put(&self, cache: &str, request: &Request, response: Response) -> Result<(), AgentError> {
        let opened = self.open(cache).await?;
        let _ = JsFuture::from(opened.put_with_request(request, &response))
            .await
            .map_err(|err| AgentError::cache(cache, err))?;
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>, AgentError> {
        let keys = JsFuture::from(self.caches()?.keys())
            .await
            .map_err(AgentError::from_js_value)?;
        Ok(Array::from(&keys).iter().filter_map(|name| name.as_string()).collect())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, AgentError> {
        let deleted = JsFuture::from(self.caches()?.delete(cache))
            .await
            .map_err(|err| AgentError::cache(cache, err))?;
        Ok(deleted.as_bool().unwrap_or(false))
    }

    fn text_response(&self, status: u16, content_type: &str, body: &str) -> Result<Response, AgentError> {
        let headers = Headers::new().map_err(AgentError::from_js_value)?;
        headers
            .set("Content-Type", content_type)
            .map_err(AgentError::from_js_value)?;

        let init = ResponseInit::new();
        init.set_status(status);
        init.set_headers(&headers);
        Response::new_with_opt_str_and_init(Some(body), &init).map_err(AgentError::from_js_value)
    }

    async fn skip_waiting(&self) -> Result<(), AgentError> {
        let skip_waiting = js_function(&self.scope, "skipWaiting")?;
        let promise_val = skip_waiting
            .call0(&self.scope)
            .map_err(AgentError::from_js_value)?;
        let _ = JsFuture::from(Promise::from(promise_val))
            .await
            .map_err(AgentError::from_js_value)?;
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), AgentError> {
        let clients = Reflect::get(&self.scope, &JsValue::from_str("clients"))
            .map_err(AgentError::from_js_value)?;
        let claim = js_function(&clients, "claim")?;
        let promise_val = claim.call0(&clients).map_err(AgentError::from_js_value)?;
        let _ = JsFuture::from(Promise::from(promise_val))
            .await
            .map_err(AgentError::from_js_value)?;
        Ok(())
    }
}

/// Hooks install, activate, fetch and sync on the worker scope.
pub fn listen<Q>(agent: Rc<OfflineCacheAgent<WebHost, Q>>) -> Result<(), AgentError>
where
    Q: PendingActionQueue + 'static,
{
    let scope = agent.host().scope().clone();
    install_install_listener(&scope, agent.clone())?;
    install_activate_listener(&scope, agent.clone())?;
    install_fetch_listener(&scope, agent.clone())?;
    install_sync_listener(&scope, agent)?;
    Ok(())
}

fn add_listener(
    scope: &ServiceWorkerGlobalScope,
    event: &str,
    callback: &Closure<dyn FnMut(JsValue)>,
) -> Result<(), AgentError> {
    scope
        .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        .map_err(AgentError::from_js_value)
}

fn install_install_listener<Q>(
    scope: &ServiceWorkerGlobalScope,
    agent: Rc<OfflineCacheAgent<WebHost, Q>>,
) -> Result<(), AgentError>
where
    Q: PendingActionQueue + 'static,
{
    let on_install = Closure::wrap(Box::new(move |event: JsValue| {
        let event: ExtendableEvent = event.unchecked_into();
        let agent = agent.clone();
        let promise = future_to_promise(async move {
            if let Err(err) = agent.install().await {
                log::error!("install failed: {}", err);
                return Err(err.into());
            }
            Ok(JsValue::UNDEFINED)
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(_)>);

    add_listener(scope, "install", &on_install)?;
    on_install.forget();
    Ok(())
}

fn install_activate_listener<Q>(
    scope: &ServiceWorkerGlobalScope,
    agent: Rc<OfflineCacheAgent<WebHost, Q>>,
) -> Result<(), AgentError>
where
    Q: PendingActionQueue + 'static,
{
    let on_activate = Closure::wrap(Box::new(move |event: JsValue| {
        let event: ExtendableEvent = event.unchecked_into();
        let agent = agent.clone();
        let promise = future_to_promise(async move {
            let report = agent.activate().await;
            log::info!(
                "activated (deleted={}, failed={})",
                report.deleted.len(),
                report.failed.len()
            );
            Ok(JsValue::UNDEFINED)
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(_)>);

    add_listener(scope, "activate", &on_activate)?;
    on_activate.forget();
    Ok(())
}

fn install_fetch_listener<Q>(
    scope: &ServiceWorkerGlobalScope,
    agent: Rc<OfflineCacheAgent<WebHost, Q>>,
) -> Result<(), AgentError>
where
    Q: PendingActionQueue + 'static,
{
    let on_fetch = Closure::wrap(Box::new(move |event: JsValue| {
        let event: FetchEvent = event.unchecked_into();
        let agent = agent.clone();
        let request = event.request();
        let tracker = event.clone();
        let promise = future_to_promise(async move {
            let interception = agent.intercept(request).await?;
            if let Some(write) = interception.background {
                // Keeps the worker alive for the write without delaying the response.
                let write = future_to_promise(async move {
                    write.await;
                    Ok(JsValue::UNDEFINED)
                });
                let _ = tracker.wait_until(&write);
            }
            Ok(interception.response.into())
        });
        if let Err(err) = event.respond_with(&promise) {
            log::error!("respondWith failed: {}", js_value_to_string(&err));
        }
    }) as Box<dyn FnMut(_)>);

    add_listener(scope, "fetch", &on_fetch)?;
    on_fetch.forget();
    Ok(())
}

fn install_sync_listener<Q>(
    scope: &ServiceWorkerGlobalScope,
    agent: Rc<OfflineCacheAgent<WebHost, Q>>,
) -> Result<(), AgentError>
where
    Q: PendingActionQueue + 'static,
{
    let on_sync = Closure::wrap(Box::new(move |event: JsValue| {
        // web-sys has no SyncEvent binding; read the tag reflectively.
        let tag = Reflect::get(&event, &JsValue::from_str("tag"))
            .ok()
            .and_then(|tag| tag.as_string())
            .unwrap_or_default();
        if tag != agent.config().sync_tag {
            return;
        }

        let event: ExtendableEvent = event.unchecked_into();
        let agent = agent.clone();
        let promise = future_to_promise(async move {
            if let Err(err) = agent.sync(&tag).await {
                log::error!("sync {} failed: {}", tag, err);
                return Err(err.into());
            }
            Ok(JsValue::UNDEFINED)
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(_)>);

    add_listener(scope, "sync", &on_sync)?;
    on_sync.forget();
    Ok(())
}
