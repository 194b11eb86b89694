//! Default User-Agent for fetch requests.

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    format!("creiq/{}", env!("CARGO_PKG_VERSION"))
}
