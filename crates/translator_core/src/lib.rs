//! Translator core: pure job state machine, view snapshot and locale preference.
mod effect;
mod error;
mod locale;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::ValidationError;
pub use locale::{Locale, LocalePreference, SUPPORTED_LOCALES};
pub use msg::Msg;
pub use state::{
    FileId, JobId, JobState, JobStatus, Phase, Progress, ProgressUpdate,
    DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE,
};
pub use update::update;
pub use view_model::JobSnapshot;
