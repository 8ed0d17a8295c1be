//! Site configuration and shared sentinel values.
//!
//! Configuration is loaded from an optional `vitrina.toml` at the project
//! root. Every field has a default, so a project with no config file builds
//! with the stock layout. Unknown keys are rejected to catch typos early.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = "http://localhost:4000"
//!
//! [paths]
//! structures = "components/structures"   # CSV inputs
//! texts = "components/texts"             # markdown fragments
//! images = "images/objects"              # local object images
//! iiif = "iiif/objects"                  # tile directories + info.json
//! data = "_data"                         # JSON output
//! collections = "_collections"           # document-per-entity output
//!
//! [remote]
//! validate = true          # set false to skip IIIF manifest validation
//! head_timeout_secs = 5
//! get_timeout_secs = 10
//! ```
//!
//! This module also owns the string sentinels shared between producer and
//! consumer code (comment marker, placeholder tokens, the missing-content
//! title). Keeping them here prevents the literals drifting apart between
//! the loader, the transformers, and the materializer.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lines and column headers starting with this marker are author-facing
/// comments, not data.
pub const COMMENT_MARKER: char = '#';

/// Spreadsheet column holding per-row authoring instructions; dropped from
/// every table before transformation.
pub const INSTRUCTION_COLUMN: &str = "example";

/// Image extensions recognized for object IDs, thumbnails, and local image
/// source probing. Probe order matters: first match wins.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

/// Thumbnail values that mean "no thumbnail", matched case-insensitively.
pub const PLACEHOLDER_TOKENS: &[&str] = &["n/a", "na", "none", "null", "nil", "tbd", "-"];

/// Title substituted when a layer's markdown fragment cannot be resolved.
pub const MISSING_CONTENT_TITLE: &str = "Content missing";

/// Marker row in the project file separating settings from the story list.
pub const STORIES_MARKER: &str = "STORIES";

/// Coordinate defaults applied to blank step fields.
pub const DEFAULT_X: &str = "0.5";
pub const DEFAULT_Y: &str = "0.5";
pub const DEFAULT_ZOOM: &str = "1";

/// Inline callout substituted for a layer's text when its markdown fragment
/// is missing. Contains the literal filename so authors can find the typo.
pub fn missing_content_callout(logical_path: &str) -> String {
    format!(
        "<div class=\"callout callout-warning\">Content file not found: <code>{logical_path}</code></div>"
    )
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `vitrina.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Base URL embedded in generated IIIF manifests.
    pub base_url: String,
    /// Project directory layout, relative to the project root.
    pub paths: PathsConfig,
    /// Remote manifest validation settings.
    pub remote: RemoteConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            paths: PathsConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("base_url must not be empty".into()));
        }
        if self.remote.head_timeout_secs == 0 || self.remote.get_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Project directory layout, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub structures: String,
    pub texts: String,
    pub images: String,
    pub iiif: String,
    pub data: String,
    pub collections: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            structures: "components/structures".to_string(),
            texts: "components/texts".to_string(),
            images: "images/objects".to_string(),
            iiif: "iiif/objects".to_string(),
            data: "_data".to_string(),
            collections: "_collections".to_string(),
        }
    }
}

/// Remote manifest validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// When false, manifest references are accepted without network checks.
    pub validate: bool,
    /// Timeout for the reachability HEAD request.
    pub head_timeout_secs: u64,
    /// Timeout for the structural GET request.
    pub get_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            validate: true,
            head_timeout_secs: 5,
            get_timeout_secs: 10,
        }
    }
}

/// Load `vitrina.toml` from the project root, falling back to defaults when
/// the file does not exist.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join("vitrina.toml");
    let config = if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        SiteConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// A documented stock config, printed by `vitrina gen-config`.
pub fn stock_config_toml() -> String {
    let defaults = SiteConfig::default();
    format!(
        "\
# vitrina configuration - all options shown with their defaults.
# Delete anything you don't want to override.

# Base URL embedded in generated IIIF manifests.
base_url = \"{base_url}\"

[paths]
# All paths are relative to the project root.
structures = \"{structures}\"   # CSV inputs
texts = \"{texts}\"             # markdown fragments
images = \"{images}\"           # local object images
iiif = \"{iiif}\"               # tile directories + info.json
data = \"{data}\"               # JSON output
collections = \"{collections}\" # document-per-entity output

[remote]
# IIIF manifest validation is advisory: failures become warnings in the
# generated output, never build errors. Set validate = false to skip the
# network checks entirely (e.g. offline builds).
validate = true
head_timeout_secs = {head}
get_timeout_secs = {get}
",
        base_url = defaults.base_url,
        structures = defaults.paths.structures,
        texts = defaults.paths.texts,
        images = defaults.paths.images,
        iiif = defaults.paths.iiif,
        data = defaults.paths.data,
        collections = defaults.paths.collections,
        head = defaults.remote.head_timeout_secs,
        get = defaults.remote.get_timeout_secs,
    )
}

/// Directory layout resolved against a concrete project root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub structures_dir: PathBuf,
    pub texts_dir: PathBuf,
    pub images_dir: PathBuf,
    pub iiif_dir: PathBuf,
    pub data_dir: PathBuf,
    pub objects_collection_dir: PathBuf,
    pub glossary_collection_dir: PathBuf,
    pub stories_collection_dir: PathBuf,
}

impl Layout {
    pub fn resolve(root: &Path, config: &SiteConfig) -> Self {
        let collections = root.join(&config.paths.collections);
        Self {
            root: root.to_path_buf(),
            structures_dir: root.join(&config.paths.structures),
            texts_dir: root.join(&config.paths.texts),
            images_dir: root.join(&config.paths.images),
            iiif_dir: root.join(&config.paths.iiif),
            data_dir: root.join(&config.paths.data),
            objects_collection_dir: collections.join("_objects"),
            glossary_collection_dir: collections.join("_glossary"),
            stories_collection_dir: collections.join("_stories"),
        }
    }

    /// Markdown fragments for glossary entries live in a fixed subdirectory
    /// of the texts root.
    pub fn glossary_texts_dir(&self) -> PathBuf {
        self.texts_dir.join("glossary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.base_url, "http://localhost:4000");
        assert!(config.remote.validate);
        assert_eq!(config.remote.head_timeout_secs, 5);
        assert_eq!(config.paths.data, "_data");
    }

    #[test]
    fn partial_config_overrides_only_named_keys() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("vitrina.toml"),
            "base_url = \"https://museo.example.org/exhibits\"\n[remote]\nvalidate = false\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.base_url, "https://museo.example.org/exhibits");
        assert!(!config.remote.validate);
        assert_eq!(config.remote.get_timeout_secs, 10);
    }

    #[test]
    fn unknown_keys_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("vitrina.toml"), "base_ur = \"typo\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("vitrina.toml"),
            "[remote]\nhead_timeout_secs = 0\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_parses_back() {
        let config: SiteConfig = toml::from_str(&stock_config_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.remote.get_timeout_secs, 10);
    }

    #[test]
    fn layout_resolves_collection_subdirs() {
        let config = SiteConfig::default();
        let layout = Layout::resolve(Path::new("/proj"), &config);
        assert_eq!(
            layout.objects_collection_dir,
            Path::new("/proj/_collections/_objects")
        );
        assert_eq!(layout.glossary_texts_dir(), Path::new("/proj/components/texts/glossary"));
    }

    #[test]
    fn callout_contains_literal_filename() {
        let callout = missing_content_callout("panels/intro.md");
        assert!(callout.contains("panels/intro.md"));
    }
}
