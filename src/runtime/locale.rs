//! Locale fallback chain.

use std::env;

use tracing::{debug, error};

/// Where the system language comes from. `None` means the host cannot tell.
pub trait SystemLanguageSource {
    fn system_language(&self) -> Option<String>;
}

/// Reads the POSIX locale environment: `LC_ALL`, then `LC_MESSAGES`, then `LANG`.
pub struct EnvLanguageSource;

impl SystemLanguageSource for EnvLanguageSource {
    fn system_language(&self) -> Option<String> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.is_empty())
    }
}

/// Ordered list of locale tags to try, most specific first.
///
/// A default locale, once set, always sits at the end of the list.
pub struct LocaleManager {
    source: Box<dyn SystemLanguageSource>,
    locales: Vec<String>,
    default_locale: Option<String>,
}

impl LocaleManager {
    pub fn new(source: Box<dyn SystemLanguageSource>) -> Self {
        let mut manager = LocaleManager {
            source,
            locales: vec![],
            default_locale: None,
        };
        manager.refresh_from_system();
        manager
    }

    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn default_locale(&self) -> Option<&str> {
        self.default_locale.as_deref()
    }

    pub fn set_default_locale(&mut self, locale: &str) {
        if let Some(previous) = &self.default_locale {
            if !previous.is_empty() && self.locales.last() == Some(previous) {
                self.locales.pop();
            }
        }
        self.default_locale = Some(locale.to_string());
        if !locale.is_empty() {
            self.locales.push(locale.to_string());
        }
    }

    /// Rebuilds the list from the system language, e.g. `en_US.UTF-8` gives
    /// `en-US, en-us, en`. Keeps the current list when the system has no answer.
    pub fn refresh_from_system(&mut self) {
        let language = match self.source.system_language() {
            Some(language) => language,
            None => {
                debug!("system language unavailable, keeping locale list");
                return;
            }
        };

        let tag = to_language_tag(&language);
        if tag.is_empty() {
            error!(language = %language, "system language does not name a locale");
            return;
        }

        let mut locales = vec![];
        let mut tag = tag;
        loop {
            let lower = tag.to_lowercase();
            locales.push(tag.clone());
            if lower != tag {
                locales.push(lower);
            }
            match tag.rfind('-') {
                Some(pos) => tag.truncate(pos),
                None => break,
            }
        }
        if let Some(default_locale) = &self.default_locale {
            if !default_locale.is_empty() {
                locales.push(default_locale.clone());
            }
        }
        debug!(locales = ?locales, "locale list refreshed");
        self.locales = locales;
    }
}

/// `en_US.UTF-8` -> `en-US`.
fn to_language_tag(language: &str) -> String {
    let without_codeset = match language.find('.') {
        Some(pos) => &language[..pos],
        None => language,
    };
    without_codeset.replace('_', "-")
}
