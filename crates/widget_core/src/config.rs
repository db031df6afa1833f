//! SDK configuration

use std::time::Duration;

/// Configuration handed to the SDK by the host application.
///
/// The timing constants are deliberately configurable; the defaults match
/// the production service's behavior.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Base URL of the widget API, without trailing slash.
    pub api_base_url: String,

    /// Public widget id.
    pub widget_id: String,

    /// Inactivity window after which a local typing-stop signal is sent.
    pub typing_debounce: Duration,

    /// Window after which a remote agent-typing indicator auto-clears,
    /// since the protocol pushes no explicit stop event.
    pub agent_typing_clear: Duration,

    /// Maximum reconnect attempts after an unsolicited disconnect.
    pub reconnect_attempts: u32,

    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl SdkConfig {
    pub fn new(api_base_url: impl Into<String>, widget_id: impl Into<String>) -> Self {
        let mut base: String = api_base_url.into();
        // Callers pass URLs with and without trailing slash
        while base.ends_with('/') {
            base.pop();
        }

        let mut config = Self {
            api_base_url: base,
            widget_id: widget_id.into(),
            typing_debounce: Duration::from_secs(3),
            agent_typing_clear: Duration::from_secs(5),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(1),
        };

        if let Ok(base) = std::env::var("MSGMORPH_API_BASE") {
            if !base.trim().is_empty() {
                config.api_base_url = base.trim_end_matches('/').to_string();
            }
        }
        config
    }

    pub fn with_typing_debounce(mut self, window: Duration) -> Self {
        self.typing_debounce = window;
        self
    }

    pub fn with_agent_typing_clear(mut self, window: Duration) -> Self {
        self.agent_typing_clear = window;
        self
    }

    pub fn with_reconnect_policy(mut self, attempts: u32, delay: Duration) -> Self {
        self.reconnect_attempts = attempts;
        self.reconnect_delay = delay;
        self
    }
}
