use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("js error: {0}")]
    Js(String),

    /// A manifest asset could not be stored during install.
    #[error("failed to precache assets into `{cache}`: {reason}")]
    Install { cache: String, reason: String },

    #[error("network request for {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("cache `{cache}`: {reason}")]
    Cache { cache: String, reason: String },

    /// The body was already read, so the object can't be duplicated.
    #[error("body already used: {0}")]
    BodyUsed(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised by [`crate::PendingActionQueue`] implementations when the
    /// queue can't be read or cleared.
    #[error("background sync failed: {0}")]
    Sync(String),
}

impl AgentError {
    pub fn from_js_value(value: JsValue) -> Self {
        AgentError::Js(js_value_to_string(&value))
    }

    pub fn cache(cache: &str, value: JsValue) -> Self {
        AgentError::Cache {
            cache: cache.to_string(),
            reason: js_value_to_string(&value),
        }
    }
}

impl From<AgentError> for JsValue {
    fn from(err: AgentError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub(crate) fn js_value_to_string(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
