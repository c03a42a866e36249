// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key-value translation service.
//!
//! Translation tables are data, shipped as JSON under `locales/` and loaded
//! by `rust-i18n` at build time. Each translator carries its own language,
//! so lookups pass the locale explicitly instead of touching the global one.
//! Lookups fall back to the key itself.

use rust_i18n::t;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported UI languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
}

impl Language {
    /// Parse a stored preference, defaulting to English.
    pub fn from_preference(stored: Option<&str>) -> Self {
        match stored.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("spanish") | Some("es") => Language::Spanish,
            _ => Language::English,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Spanish => "spanish",
        }
    }

    /// Locale name of the table under `locales/`.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translation service bound to a current language.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    language: Language,
}

impl Translator {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Translate `key` in the current language, returning the key if missing.
    pub fn t(&self, key: &str) -> String {
        t!(key, locale = self.language.code()).into_owned()
    }
}
