//! Directory walker for discovering MJML templates

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of MJML source files
const MJML_EXTENSION: &str = "mjml";

/// A discovered MJML template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    /// Path to the template on disk
    pub path: PathBuf,
    /// Path relative to the directory that was searched
    pub relative_path: PathBuf,
}

impl TemplateSource {
    /// Where the compiled HTML goes, relative to the output directory
    pub fn output_relative_path(&self) -> PathBuf {
        self.relative_path.with_extension("html")
    }
}

/// Errors that can occur during template discovery
#[derive(Debug)]
pub enum WalkerError {
    /// IO error
    Io(std::io::Error),
    /// Input path does not exist
    NotFound(PathBuf),
    /// Input is a file that is not an MJML template
    NotATemplate(PathBuf),
    /// Directory holds no MJML templates
    NoTemplates(PathBuf),
}

impl From<std::io::Error> for WalkerError {
    fn from(err: std::io::Error) -> Self {
        WalkerError::Io(err)
    }
}

impl std::fmt::Display for WalkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalkerError::Io(e) => write!(f, "IO error: {}", e),
            WalkerError::NotFound(path) => write!(f, "Input not found: {}", path.display()),
            WalkerError::NotATemplate(path) => {
                write!(f, "Not an .mjml template: {}", path.display())
            }
            WalkerError::NoTemplates(path) => {
                write!(f, "No .mjml templates found in {}", path.display())
            }
        }
    }
}

impl std::error::Error for WalkerError {}

/// Find the MJML templates to build
///
/// # Parameters
/// * `root` - A directory to search recursively, or a single `.mjml` file
///
/// # Returns
/// * `Ok(Vec<TemplateSource>)` - Templates sorted by path; files starting with
///   `_` are treated as `mj-include` partials and skipped
/// * `Err(WalkerError)` - The input is missing, not a template, or holds no templates
pub fn discover_templates(root: &Path) -> Result<Vec<TemplateSource>, WalkerError> {
    if !root.exists() {
        return Err(WalkerError::NotFound(root.to_path_buf()));
    }

    if root.is_file() {
        if !is_mjml(root) {
            return Err(WalkerError::NotATemplate(root.to_path_buf()));
        }
        let file_name = root
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| WalkerError::NotATemplate(root.to_path_buf()))?;
        return Ok(vec![TemplateSource {
            path: root.to_path_buf(),
            relative_path: file_name,
        }]);
    }

    let mut templates = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        let path = entry.path();

        if !path.is_file() || !is_mjml(path) || is_partial(path) {
            continue;
        }

        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        templates.push(TemplateSource {
            path: path.to_path_buf(),
            relative_path,
        });
    }

    if templates.is_empty() {
        return Err(WalkerError::NoTemplates(root.to_path_buf()));
    }

    log::info!("Found {} templates in {}", templates.len(), root.display());
    Ok(templates)
}

fn is_mjml(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(MJML_EXTENSION)
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with('_'))
}
