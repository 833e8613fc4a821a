//! Project configuration from mjkit.toml

use crate::beautify::{Beautifier, DEFAULT_INDENT_SIZE};
use crate::marketo::{RewriteOptions, StructuralPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "mjkit.toml";

/// Project configuration from mjkit.toml
///
/// Every section and field is optional; missing values take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// External MJML compiler
    pub compiler: CompilerConfig,

    /// HTML re-indentation
    pub beautify: BeautifyConfig,

    /// Defaults for the build command
    pub build: BuildConfig,

    /// Marketo rewrite settings
    pub marketo: MarketoConfig,
}

/// `[compiler]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Program that compiles MJML read from stdin to HTML on stdout
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "mjml".to_string(),
            args: vec!["-i".to_string(), "-s".to_string()],
        }
    }
}

/// `[beautify]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeautifyConfig {
    /// Spaces per nesting level for plain (non-Marketo) output
    pub indent_size: usize,
}

impl Default for BeautifyConfig {
    fn default() -> Self {
        Self {
            indent_size: DEFAULT_INDENT_SIZE,
        }
    }
}

impl BeautifyConfig {
    /// The beautifier described by this section
    pub fn beautifier(&self) -> Beautifier {
        Beautifier::new(self.indent_size)
    }
}

/// `[build]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory that receives the compiled HTML
    pub output_dir: PathBuf,

    /// Rewrite every template for Marketo
    pub marketo: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("dist"),
            marketo: false,
        }
    }
}

/// `[marketo]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketoConfig {
    /// `lenient` or `strict` handling of missing structure
    pub policy: StructuralPolicy,

    /// Fixed section id prefix (two uppercase letters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_prefix: Option<String>,

    /// Fixed image/text id prefix (two uppercase letters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_prefix: Option<String>,
}

impl MarketoConfig {
    /// Rewriter options for this configuration
    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            policy: self.policy,
            section_prefix: self.section_prefix.clone(),
            tag_prefix: self.tag_prefix.clone(),
        }
    }
}

impl ProjectConfig {
    /// Load configuration from a mjkit.toml file
    ///
    /// # Parameters
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(ProjectConfig)` - Successfully loaded configuration
    /// * `Err(ConfigError)` - Error reading or parsing the configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(ConfigError::IoError)?;

        let config: ProjectConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        Ok(config)
    }

    /// Load configuration, falling back to the defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            log::info!(
                "No configuration at {}, using defaults",
                path.as_ref().display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a mjkit.toml file
    ///
    /// # Parameters
    /// * `path` - Path where the configuration file will be written
    ///
    /// # Returns
    /// * `Ok(())` - Successfully saved configuration
    /// * `Err(ConfigError)` - Error serializing or writing the configuration file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;

        fs::write(&path, content).map_err(ConfigError::IoError)?;

        Ok(())
    }
}

/// Errors that can occur when loading or saving project configuration
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
    /// IO error when reading or writing file
    IoError(std::io::Error),

    /// Error parsing TOML
    ParseError(toml::de::Error),

    /// Error serializing to TOML
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "TOML serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
