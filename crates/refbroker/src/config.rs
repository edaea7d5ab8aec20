//! Broker configuration

/// Property name that marks a JSON object as a reference envelope.
pub const DEFAULT_MARKER_KEY: &str = "__dotNetObject";

/// Configuration shared by both sides of an interop boundary.
///
/// Both runtimes must agree on `marker_key` out-of-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Reserved property name of the reference envelope
    pub marker_key: String,

    /// Emit a `debug` event for every handle issued or released
    pub trace: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            trace: false,
        }
    }
}

impl BrokerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different marker key.
    pub fn with_marker_key(mut self, key: impl Into<String>) -> Self {
        self.marker_key = key.into();
        self
    }

    /// Enable or disable per-handle trace events.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}
