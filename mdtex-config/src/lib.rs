//! Shared configuration loader for the mdtex toolchain.
//!
//! `defaults/mdtex.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`MdtexConfig`].
//! The conversion library never reads these files; the groups below convert
//! into its explicit option structs.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use mdtex_convert::publish::PublishSpec;
use mdtex_convert::{CodeEscape, ConvertOptions, HeadingCommands, ValidateOptions};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/mdtex.default.toml");

/// Top-level configuration consumed by mdtex applications.
#[derive(Debug, Clone, Deserialize)]
pub struct MdtexConfig {
    pub convert: ConvertConfig,
    pub output: OutputConfig,
    pub validate: ValidateConfig,
    pub compile: CompileConfig,
}

/// Mirrors the knobs exposed by the converter.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    pub section_marker_depth: usize,
    pub emit_section_heading: bool,
    pub placeholder_name: String,
    pub default_language: String,
    pub code_escape: CodeEscape,
    #[serde(default)]
    pub image_dirs: Vec<PathBuf>,
    pub headings: HeadingsConfig,
    #[serde(default)]
    pub language_aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadingsConfig {
    pub top: String,
    pub sub: String,
    pub deepest: String,
}

impl From<&ConvertConfig> for ConvertOptions {
    fn from(config: &ConvertConfig) -> Self {
        ConvertOptions {
            section_marker_depth: config.section_marker_depth,
            emit_section_heading: config.emit_section_heading,
            placeholder_name: config.placeholder_name.clone(),
            default_language: config.default_language.clone(),
            code_escape: config.code_escape,
            image_dirs: config.image_dirs.clone(),
            headings: HeadingCommands {
                top: config.headings.top.clone(),
                sub: config.headings.sub.clone(),
                deepest: config.headings.deepest.clone(),
            },
            language_aliases: config.language_aliases.clone(),
            ..ConvertOptions::default()
        }
    }
}

/// Where converted files go.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub sections_dir: String,
    pub extension: String,
    pub backup: bool,
    pub main_file: String,
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
}

impl OutputConfig {
    /// Publish spec rooted at `output_dir`. The template file is left for the caller to read.
    pub fn publish_spec(&self, output_dir: impl AsRef<Path>) -> PublishSpec {
        let spec = PublishSpec::new(output_dir)
            .with_sections_dir(self.sections_dir.clone())
            .with_extension(self.extension.clone())
            .with_backup(self.backup);
        let spec = if self.main_file.is_empty() {
            spec.without_main()
        } else {
            spec.with_main_file(self.main_file.clone())
        };
        match &self.title {
            Some(title) => spec.with_title(title.clone()),
            None => spec,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateConfig {
    pub enabled: bool,
    pub check_hierarchy: bool,
    pub force: bool,
}

impl From<&ValidateConfig> for ValidateOptions {
    fn from(config: &ValidateConfig) -> Self {
        ValidateOptions {
            enabled: config.enabled,
            check_hierarchy: config.check_hierarchy,
            force: config.force,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompileConfig {
    pub engine: String,
    pub passes: u32,
}

#[cfg(feature = "native-export")]
impl From<&CompileConfig> for mdtex_convert::compile::CompileOptions {
    fn from(config: &CompileConfig) -> Self {
        mdtex_convert::compile::CompileOptions {
            engine: config.engine.clone(),
            passes: config.passes,
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<MdtexConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<MdtexConfig, ConfigError> {
    Loader::new().build()
}
