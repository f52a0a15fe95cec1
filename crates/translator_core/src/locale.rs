use std::fmt;

/// Interface languages the client ships text for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    Ko,
    En,
}

pub const SUPPORTED_LOCALES: [Locale; 2] = [Locale::Ko, Locale::En];

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::Ko => "ko",
            Locale::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        SUPPORTED_LOCALES
            .into_iter()
            .find(|locale| locale.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Maps an OS language tag such as `ko-KR` or `en_US.UTF-8` onto a supported locale,
    /// falling back to English.
    pub fn from_system_tag(tag: &str) -> Self {
        let primary = tag
            .split(|c: char| c == '-' || c == '_' || c == '.')
            .next()
            .unwrap_or_default();
        Self::from_code(primary).unwrap_or(Locale::En)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Persisted user choice: follow the system or pin a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalePreference {
    #[default]
    System,
    Explicit(Locale),
}

impl LocalePreference {
    /// Parses a stored value. Anything unrecognised means `System`.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("system") {
            return LocalePreference::System;
        }
        Locale::from_code(raw)
            .map(LocalePreference::Explicit)
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocalePreference::System => "system",
            LocalePreference::Explicit(locale) => locale.code(),
        }
    }

    pub fn resolve(self, system: Locale) -> Locale {
        match self {
            LocalePreference::System => system,
            LocalePreference::Explicit(locale) => locale,
        }
    }

    /// Flips between Korean and English, starting from what is currently shown.
    pub fn toggled(self, system: Locale) -> Self {
        let next = match self.resolve(system) {
            Locale::Ko => Locale::En,
            Locale::En => Locale::Ko,
        };
        LocalePreference::Explicit(next)
    }
}

impl fmt::Display for LocalePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
