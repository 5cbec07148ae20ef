//! Message localization for terminal-transition messages.
//!
//! The socket core only ever asks for the English key; the host decides
//! what comes back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::LocaleError;

/// Well-known message keys.
pub mod keys {
    pub const SUCCESSFUL: &str = "Completed successfully";
    pub const ERROR: &str = "Completed with error";
    pub const CANCELED: &str = "Canceled by user";
    pub const DELETED: &str = "Deleted from the system";
}

/// Key → localized string lookup.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> String;
}

/// Returns every key unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Flat JSON translation catalog (`{"Completed successfully": "..."}`).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load `{dir}/{locale}.json`.
    pub fn load(dir: &Path, locale: &str) -> Result<Self, LocaleError> {
        let path: PathBuf = dir.join(format!("{locale}.json"));
        let content = std::fs::read_to_string(&path).map_err(|source| LocaleError::Io {
            path: path.clone(),
            source,
        })?;
        let entries = serde_json::from_str(&content)
            .map_err(|source| LocaleError::Parse { path, source })?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn passthrough_returns_key() {
        assert_eq!(Passthrough.translate(keys::CANCELED), "Canceled by user");
    }

    #[test]
    fn catalog_falls_back_to_key() {
        let catalog = Catalog::new(HashMap::from([(
            keys::SUCCESSFUL.to_string(),
            "Concluído com sucesso".to_string(),
        )]));
        assert_eq!(catalog.translate(keys::SUCCESSFUL), "Concluído com sucesso");
        assert_eq!(catalog.translate(keys::ERROR), keys::ERROR);
    }

    #[test]
    fn catalog_loads_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("pt_BR.json"),
            r#"{"Deleted from the system": "Excluído do sistema"}"#,
        )
        .unwrap();

        let catalog = Catalog::load(dir.path(), "pt_BR").unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.translate(keys::DELETED), "Excluído do sistema");
    }

    #[test]
    fn catalog_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Catalog::load(dir.path(), "fr"),
            Err(LocaleError::Io { .. })
        ));
    }

    #[test]
    fn catalog_rejects_nested_values() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("de.json"), r#"{"a": {"b": "c"}}"#).unwrap();
        assert!(matches!(
            Catalog::load(dir.path(), "de"),
            Err(LocaleError::Parse { .. })
        ));
    }
}
