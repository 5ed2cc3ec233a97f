//! Localization support for the homework bot
//!
//! Messages live in Fluent resources under `locales/<lang>/main.ftl`.
//! Russian and English are shipped; English is the fallback for any other
//! Telegram language code.

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use unic_langid::LanguageIdentifier;

const SUPPORTED_LOCALES: &[&str] = &["en", "ru"];
const FALLBACK_LOCALE: &str = "en";

/// Localization manager holding one Fluent bundle per supported locale
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with all supported locales loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for locale_str in SUPPORTED_LOCALES {
            let locale: LanguageIdentifier = locale_str.parse()?;
            let bundle = Self::create_bundle(&locale)?;
            bundles.insert(locale_str.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: &LanguageIdentifier) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);

        // Path relative to Cargo.toml so tests find the resources too
        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        let resource_path = format!("{}/locales/{}/main.ftl", manifest_dir, locale);
        if let Ok(content) = fs::read_to_string(&resource_path) {
            if let Ok(resource) = FluentResource::try_new(content) {
                let _ = bundle.add_resource(resource);
            }
        }

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&FluentArgs>,
    ) -> String {
        let bundle = match self.bundles.get(language) {
            Some(bundle) => bundle,
            None => match self.bundles.get(FALLBACK_LOCALE) {
                Some(bundle) => bundle,
                None => return format!("Missing translation: {}", key),
            },
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut value = String::new();
        let _ = bundle.write_pattern(&mut value, pattern, args, &mut vec![]);
        value
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }
}

/// Create a shared localization manager
pub fn create_localization_manager() -> Result<Arc<LocalizationManager>> {
    Ok(Arc::new(LocalizationManager::new()?))
}

/// Get a localized message in the user's language
pub fn t_lang(manager: &Arc<LocalizationManager>, key: &str, language_code: Option<&str>) -> String {
    let language = detect_language(manager, language_code);
    manager.get_message_in_language(key, &language, None)
}

/// Get a localized message with arguments in the user's language
pub fn t_args_lang(
    manager: &Arc<LocalizationManager>,
    key: &str,
    args: &[(&str, &str)],
    language_code: Option<&str>,
) -> String {
    let language = detect_language(manager, language_code);
    let fluent_args =
        FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))));
    manager.get_message_in_language(key, &language, Some(&fluent_args))
}

/// Detect the appropriate language from the user's Telegram language code
///
/// Region subtags are stripped (e.g. "ru-RU" -> "ru"); unsupported languages
/// fall back to English.
pub fn detect_language(manager: &Arc<LocalizationManager>, language_code: Option<&str>) -> String {
    if let Some(code) = language_code {
        let lang = code.split('-').next().unwrap_or(FALLBACK_LOCALE);
        if manager.is_language_supported(lang) {
            return lang.to_string();
        }
    }
    FALLBACK_LOCALE.to_string()
}
