//! Translator app: the controller that runs one translation job against the service,
//! plus the configuration and preference files the `translator` binary reads.
mod platform;

pub use platform::config::{
    AppConfig, ConfigError, ConfigOverrides, API_BASE_ENV, CONFIG_FILENAME, WS_BASE_ENV,
};
pub use platform::controller::{CancelAck, Controller, ControllerError};
pub use platform::effects::{ChannelConnector, WebSocketConnector};
pub use platform::persistence::{
    system_locale, system_locale_from, PreferenceStore, PREFERENCES_FILENAME,
};
pub use platform::render::{format_eta, phase_label, render_status};
