use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub corpus: Option<CorpusConfig>,
    pub lookup: Option<LookupConfig>,
    pub prompt: Option<PromptConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub dir: Option<String>,
    pub title_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    pub enabled: Option<bool>,
    pub delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub search_url: Option<String>,
    pub export_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub assume: Option<PromptMode>,
}

/// How persist prompts are answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    #[default]
    Ask,
    Yes,
    No,
}

/// Platform config directory path: `<config_dir>/bibtidy/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bibtidy").join("config.toml"))
}

/// Load config by cascading CWD `.bibtidy.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".bibtidy.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (bc, oc) = (base.corpus.unwrap_or_default(), overlay.corpus.unwrap_or_default());
    let (bl, ol) = (base.lookup.unwrap_or_default(), overlay.lookup.unwrap_or_default());
    let (bp, op) = (base.prompt.unwrap_or_default(), overlay.prompt.unwrap_or_default());

    ConfigFile {
        corpus: Some(CorpusConfig {
            dir: oc.dir.or(bc.dir),
            title_file: oc.title_file.or(bc.title_file),
        }),
        lookup: Some(LookupConfig {
            enabled: ol.enabled.or(bl.enabled),
            delay_secs: ol.delay_secs.or(bl.delay_secs),
            timeout_secs: ol.timeout_secs.or(bl.timeout_secs),
            search_url: ol.search_url.or(bl.search_url),
            export_url: ol.export_url.or(bl.export_url),
        }),
        prompt: Some(PromptConfig {
            assume: op.assume.or(bp.assume),
        }),
    }
}
