//
// config.rs
//
// Configuration for autocomplete sessions
//

use std::time::Duration;

/// Autocomplete session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteConfig {
    /// Quiet period after the last keystroke before a lookup fires, in milliseconds
    pub debounce_ms: u64,
    /// Texts shorter than this (in chars) never reach the lookup function
    pub min_query_chars: usize,
    /// Whether a selection also clears the search text and suggestions
    pub clear_after_select: bool,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 800,
            min_query_chars: 0,
            clear_after_select: false,
        }
    }
}

impl AutocompleteConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Whether `text` is long enough to be looked up
    pub fn accepts_query(&self, text: &str) -> bool {
        text.chars().count() >= self.min_query_chars
    }
}

/// Parse autocomplete configuration from host settings.
///
/// Reads the top-level `autocomplete` section of a serde_json::Value. Only
/// fields present with the expected type are applied; everything else keeps
/// its value from `AutocompleteConfig::default()`.
///
/// Supported keys: `debounceMs`, `minQueryChars`, `clearAfterSelect`.
///
/// # Returns
///
/// `Some(AutocompleteConfig)` when the `autocomplete` section is present,
/// `None` otherwise.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tagsift::config::parse_autocomplete_config;
///
/// let settings = json!({ "autocomplete": { "debounceMs": 300, "clearAfterSelect": true } });
/// let cfg = parse_autocomplete_config(&settings).unwrap();
/// assert_eq!(cfg.debounce_ms, 300);
/// assert!(cfg.clear_after_select);
/// assert_eq!(cfg.min_query_chars, 0);
/// ```
pub fn parse_autocomplete_config(settings: &serde_json::Value) -> Option<AutocompleteConfig> {
    let section = settings.get("autocomplete")?;

    let mut config = AutocompleteConfig::default();

    if let Some(v) = section.get("debounceMs").and_then(|v| v.as_u64()) {
        config.debounce_ms = v;
    }
    if let Some(v) = section
        .get("minQueryChars")
        .and_then(|v| v.as_u64())
        .and_then(|v| usize::try_from(v).ok())
    {
        config.min_query_chars = v;
    }
    if let Some(v) = section.get("clearAfterSelect").and_then(|v| v.as_bool()) {
        config.clear_after_select = v;
    }

    log::info!("Autocomplete configuration loaded from settings:");
    log::info!("  debounce_ms: {}", config.debounce_ms);
    log::info!("  min_query_chars: {}", config.min_query_chars);
    log::info!("  clear_after_select: {}", config.clear_after_select);

    Some(config)
}
