use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Corpus of chunks cut from JavaScript sources
pub const CODE_CORPUS: &str = "code";
/// Corpus of Markdown documentation sections
pub const DOCS_CORPUS: &str = "docs";

/// Per-corpus ranking knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Maximum hits taken from this corpus
    pub top_k: usize,
    /// Minimum cosine similarity a hit needs (inclusive)
    pub threshold: f32,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            threshold: 0.3,
        }
    }
}

impl CorpusSettings {
    #[must_use]
    pub const fn new(top_k: usize, threshold: f32) -> Self {
        Self { top_k, threshold }
    }

    pub fn validate(&self, corpus: &str) -> Result<()> {
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(SearchError::InvalidConfig(format!(
                "corpora.{corpus}.threshold must be within [-1, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Retrieval configuration, usually read from `tutor.toml`:
///
/// ```toml
/// global_cap = 6
///
/// [corpora.code]
/// top_k = 4
/// threshold = 0.35
///
/// [corpora.docs]
/// top_k = 2
/// threshold = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Cap on the merged result list; `None` keeps every per-corpus hit
    pub global_cap: Option<usize>,
    pub corpora: BTreeMap<String, CorpusSettings>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let corpora = [CODE_CORPUS, DOCS_CORPUS]
            .into_iter()
            .map(|name| (name.to_string(), CorpusSettings::default()))
            .collect();
        Self {
            global_cap: None,
            corpora,
        }
    }
}

impl RetrievalConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("Loaded retrieval config from {}", path.display());
        Ok(config)
    }

    /// Settings for `corpus`, falling back to the defaults when unconfigured
    #[must_use]
    pub fn settings_for(&self, corpus: &str) -> CorpusSettings {
        self.corpora.get(corpus).copied().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, settings) in &self.corpora {
            settings.validate(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn default_config_covers_both_corpora() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settings_for(CODE_CORPUS), CorpusSettings::new(3, 0.3));
        assert_eq!(config.settings_for(DOCS_CORPUS), CorpusSettings::new(3, 0.3));
        assert_eq!(config.global_cap, None);
    }

    #[test]
    fn parses_partial_toml() {
        let config = RetrievalConfig::from_toml_str(
            "global_cap = 5\n\n[corpora.code]\ntop_k = 4\n\n[corpora.docs]\nthreshold = 0.5\n",
        )
        .unwrap();

        assert_eq!(config.global_cap, Some(5));
        assert_eq!(config.settings_for(CODE_CORPUS), CorpusSettings::new(4, 0.3));
        assert_eq!(config.settings_for(DOCS_CORPUS), CorpusSettings::new(3, 0.5));
        assert_eq!(config.settings_for("api"), CorpusSettings::default());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = RetrievalConfig::from_toml_str("[corpora.code]\nthreshold = 1.5\n").unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(msg) if msg.contains("corpora.code")));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = RetrievalConfig::from_toml_str("global_cap = \"many\"").unwrap_err();
        assert!(matches!(err, SearchError::Toml(_)));
    }

    #[test]
    fn loads_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tutor.toml");
        std::fs::write(&path, "[corpora.docs]\ntop_k = 1\nthreshold = 0.0\n").unwrap();

        let config = RetrievalConfig::load(&path).unwrap();
        assert_eq!(config.settings_for(DOCS_CORPUS), CorpusSettings::new(1, 0.0));

        let missing = RetrievalConfig::load(tmp.path().join("missing.toml"));
        assert!(matches!(missing, Err(SearchError::Io(_))));
    }
}
