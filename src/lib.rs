//! Offline-caching service worker compiled to wasm.
//!
//! The worker bootstrap script imports the generated bindings and calls
//! `start()` (or `startWithConfig({...})`) once at top level, before any
//! event fires.

use std::rc::Rc;

use wasm_bindgen::prelude::*;

pub mod agent;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod sync;
pub mod web;

#[cfg(test)]
mod testing;

pub use agent::{ActivationReport, Interception, OfflineCacheAgent, ResponseSource};
pub use config::{AgentConfig, AssetManifest};
pub use error::AgentError;
pub use sync::{EmptyQueue, PendingAction, PendingActionQueue, SyncOutcome};

#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
    start_with(AgentConfig::default())
}

#[wasm_bindgen(js_name = startWithConfig)]
pub fn start_with_config(config: JsValue) -> Result<(), JsValue> {
    let config: AgentConfig = serde_wasm_bindgen::from_value(config)?;
    start_with(config)
}

fn start_with(config: AgentConfig) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    logging::init(config.log_level);
    config.validate()?;

    for url in config.missing_fallbacks() {
        log::warn!("offline fallback {} is not in the asset manifest", url);
    }

    let host = web::WebHost::new()?;
    let agent = Rc::new(OfflineCacheAgent::new(config, host));
    web::listen(agent)?;

    log::info!("offline worker listening");
    Ok(())
}
