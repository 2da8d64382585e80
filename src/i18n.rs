use std::collections::BTreeMap;
use std::path::Path as FsPath;

use anyhow::Context;
use axum::{
    extract::State,
    routing::get,
    Router,
};
use tracing::{debug, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    extract::Path,
    response::{ok, JsonOk},
    state::AppState,
};

pub const SUPPORTED_LANGS: [&str; 2] = ["it", "en"];

/// Flat key -> string dictionary served to the frontend.
pub type Dictionary = BTreeMap<String, String>;

pub fn router() -> Router<AppState> {
    Router::new().route("/i18n/:lang", get(get_dictionary))
}

/// Returns the canonical code, or `InvalidLang` for anything unsupported.
pub fn supported_lang(raw: &str) -> Result<&'static str, AppError> {
    let wanted = raw.trim().to_ascii_lowercase();
    SUPPORTED_LANGS
        .into_iter()
        .find(|l| *l == wanted)
        .ok_or(AppError::InvalidLang)
}

pub async fn load_dictionary(dir: &FsPath, lang: &'static str) -> anyhow::Result<Dictionary> {
    let path = dir.join(format!("{lang}.json"));
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("read locale file {}", path.display()))?;
    let dict: Dictionary = serde_json::from_str(&raw)
        .with_context(|| format!("parse locale file {}", path.display()))?;
    debug!(lang, keys = dict.len(), "locale loaded");
    Ok(dict)
}

#[instrument(skip(state))]
async fn get_dictionary(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> AppResult<JsonOk<Dictionary>> {
    let lang = supported_lang(&lang).inspect_err(|_| warn!("unsupported locale requested"))?;
    let dict = load_dictionary(&state.config.locales_dir, lang).await?;
    Ok(ok(dict))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_it_and_en() {
        assert_eq!(supported_lang("it").unwrap(), "it");
        assert_eq!(supported_lang("EN").unwrap(), "en");
        assert!(matches!(supported_lang("fr"), Err(AppError::InvalidLang)));
        assert!(matches!(supported_lang("../etc/passwd"), Err(AppError::InvalidLang)));
    }

    #[tokio::test]
    async fn shipped_dictionaries_share_keys() {
        let dir = FsPath::new(env!("CARGO_MANIFEST_DIR")).join("locales");
        let it = load_dictionary(&dir, "it").await.expect("it.json");
        let en = load_dictionary(&dir, "en").await.expect("en.json");
        assert!(!it.is_empty());
        assert_eq!(
            it.keys().collect::<Vec<_>>(),
            en.keys().collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let err = load_dictionary(FsPath::new("/nonexistent-locales"), "it").await;
        assert!(err.is_err());
    }
}
