use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use translator_core::{Locale, LocalePreference};
use translator_logging::{client_info, client_warn};
use translator_remote::{AtomicFileWriter, PersistError};

pub const PREFERENCES_FILENAME: &str = "preferences.ron";

const LOCALE_ENV_KEYS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedPreferences {
    #[serde(default)]
    locale: String,
}

/// The user's saved preferences. Read once when opened, written on every change.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    dir: PathBuf,
    locale: LocalePreference,
}

impl PreferenceStore {
    /// Missing or unreadable files yield the defaults.
    pub fn load(dir: &Path) -> Self {
        let locale = load_locale(&dir.join(PREFERENCES_FILENAME));
        Self {
            dir: dir.to_path_buf(),
            locale,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PREFERENCES_FILENAME)
    }

    pub fn locale(&self) -> LocalePreference {
        self.locale
    }

    pub fn set_locale(&mut self, preference: LocalePreference) -> Result<(), PersistError> {
        self.save(preference)?;
        self.locale = preference;
        client_info!("Locale preference set to {}", preference);
        Ok(())
    }

    /// Switches between Korean and English, starting from what `system` resolves to.
    pub fn toggle_locale(&mut self, system: Locale) -> Result<LocalePreference, PersistError> {
        let next = self.locale.toggled(system);
        self.set_locale(next)?;
        Ok(next)
    }

    fn save(&self, preference: LocalePreference) -> Result<(), PersistError> {
        let persisted = PersistedPreferences {
            locale: preference.as_str().to_string(),
        };
        let content = ron::ser::to_string_pretty(&persisted, ron::ser::PrettyConfig::new())
            .map_err(|err| PersistError::Io(std::io::Error::other(err.to_string())))?;
        AtomicFileWriter::new(self.dir.clone()).write(PREFERENCES_FILENAME, content.as_bytes())?;
        Ok(())
    }
}

fn load_locale(path: &Path) -> LocalePreference {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return LocalePreference::System;
        }
        Err(err) => {
            client_warn!("Failed to read preferences from {:?}: {}", path, err);
            return LocalePreference::System;
        }
    };

    match ron::from_str::<PersistedPreferences>(&content) {
        Ok(persisted) => LocalePreference::parse(&persisted.locale),
        Err(err) => {
            client_warn!("Failed to parse preferences from {:?}: {}", path, err);
            LocalePreference::System
        }
    }
}

/// Locale of the process environment, English when nothing usable is set.
pub fn system_locale() -> Locale {
    system_locale_from(|key| std::env::var(key).ok())
}

pub fn system_locale_from<F>(lookup: F) -> Locale
where
    F: Fn(&str) -> Option<String>,
{
    LOCALE_ENV_KEYS
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
        .map(|tag| Locale::from_system_tag(&tag))
        .unwrap_or(Locale::En)
}
