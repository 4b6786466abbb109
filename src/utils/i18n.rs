use tracing::warn;

const SUPPORTED_LOCALES: &[&str] = &["en"];

/// Set the locale used by `t!`, falling back to English for unknown locales
pub fn set_locale(locale: &str) {
    // "en-US" and "en" share a translation file
    let language = locale.split(['-', '_']).next().unwrap_or(locale);

    if SUPPORTED_LOCALES.contains(&language) {
        rust_i18n::set_locale(language);
    } else {
        warn!("Unsupported locale {}, falling back to en", locale);
        rust_i18n::set_locale("en");
    }
}
