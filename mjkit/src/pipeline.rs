//! Three-stage template build pipeline
//!
//! This module orchestrates the three stages of a build:
//! 1. **Discovery**: find the MJML templates under the input path
//! 2. **Rendering**: compile each template, re-indent it and, when requested,
//!    rewrite it for Marketo
//! 3. **Output**: write the HTML files into the output directory

use crate::beautify::Beautifier;
use crate::compiler::{CompileError, MjmlCompiler};
use crate::marketo::{RewriteError, RewriteOptions, RewriteReport, Rewriter};
use crate::walker::{discover_templates, TemplateSource, WalkerError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Settings for one build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory to search, or a single `.mjml` file
    pub input: PathBuf,
    /// Directory that receives the HTML
    pub output_dir: PathBuf,
    /// Re-indenter for plain output
    pub beautifier: Beautifier,
    /// Rewrite for Marketo with these options when set
    pub marketo: Option<RewriteOptions>,
}

/// HTML produced from one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Final HTML
    pub html: String,
    /// Marketo rewrite summary, when the template was rewritten
    pub report: Option<RewriteReport>,
}

/// One written output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTemplate {
    /// Template the output came from
    pub source: PathBuf,
    /// Written HTML file
    pub output: PathBuf,
    /// Marketo rewrite summary, when the template was rewritten
    pub report: Option<RewriteReport>,
}

/// Summary of a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Written files, in template order
    pub templates: Vec<BuiltTemplate>,
}

/// Run a full build
///
/// # Parameters
/// * `options` - Input, output and rendering settings
/// * `compiler` - MJML compiler used for every template
///
/// # Returns
/// * `Ok(BuildReport)` - Every template was rendered and written
/// * `Err(BuildError)` - Discovery, compilation, rewriting or writing failed;
///   nothing is written unless every template rendered
pub fn build(options: &BuildOptions, compiler: &dyn MjmlCompiler) -> Result<BuildReport, BuildError> {
    // Stage 1: discovery
    let templates = discover_templates(&options.input)?;

    // Stage 2: rendering (optionally in parallel)
    #[cfg(feature = "parallel")]
    let rendered: Result<Vec<_>, _> = templates
        .par_iter()
        .map(|template| render_template(template, options, compiler))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let rendered: Result<Vec<_>, _> = templates
        .iter()
        .map(|template| render_template(template, options, compiler))
        .collect();

    let rendered = rendered?;

    // Stage 3: output
    let mut report = BuildReport::default();
    for (template, rendered) in templates.iter().zip(rendered) {
        let output = options.output_dir.join(template.output_relative_path());
        write_output(&output, &rendered.html)?;
        log::info!("Wrote {}", output.display());

        report.templates.push(BuiltTemplate {
            source: template.path.clone(),
            output,
            report: rendered.report,
        });
    }

    Ok(report)
}

/// Read and render a single template
fn render_template(
    template: &TemplateSource,
    options: &BuildOptions,
    compiler: &dyn MjmlCompiler,
) -> Result<Rendered, BuildError> {
    log::info!("Rendering {}", template.path.display());

    let mjml = fs::read_to_string(&template.path)
        .map_err(|e| BuildError::ReadError(template.path.clone(), e))?;

    render(&mjml, compiler, &options.beautifier, options.marketo.as_ref()).map_err(|e| match e {
        RenderError::Compile(e) => BuildError::CompileError(template.path.clone(), e),
        RenderError::Rewrite(e) => BuildError::RewriteError(template.path.clone(), e),
    })
}

/// Compile, re-indent and optionally rewrite one MJML document
///
/// Marketo output is always indented with the default beautifier because the
/// rewriter's patterns depend on it; `beautifier` applies to plain output.
pub fn render(
    mjml: &str,
    compiler: &dyn MjmlCompiler,
    beautifier: &Beautifier,
    marketo: Option<&RewriteOptions>,
) -> Result<Rendered, RenderError> {
    let html = compiler.compile(mjml)?;

    match marketo {
        Some(options) => {
            let html = Beautifier::default().beautify(&html);
            let rewritten = Rewriter::new(options.clone()).rewrite(&html)?;
            log::debug!("Marketo rewrite: {:?}", rewritten.report);
            Ok(Rendered {
                html: rewritten.html,
                report: Some(rewritten.report),
            })
        }
        None => Ok(Rendered {
            html: beautifier.beautify(&html),
            report: None,
        }),
    }
}

/// Write a file, creating parent directories as needed
fn write_output(path: &Path, html: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(path.to_path_buf(), e))?;
    }
    fs::write(path, html).map_err(|e| BuildError::WriteError(path.to_path_buf(), e))
}

/// Errors from rendering a single document
#[derive(Error, Debug)]
pub enum RenderError {
    /// The MJML compiler failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The compiled HTML could not be rewritten for Marketo
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

/// Build errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Finding the templates failed
    #[error("Template discovery failed: {0}")]
    DiscoveryError(#[from] WalkerError),

    /// A template could not be read
    #[error("IO error reading {path}: {source}", path = .0.display(), source = .1)]
    ReadError(PathBuf, #[source] std::io::Error),

    /// A template failed to compile
    #[error("Failed to compile {path}: {source}", path = .0.display(), source = .1)]
    CompileError(PathBuf, #[source] CompileError),

    /// A compiled template failed the Marketo rewrite
    #[error("Failed to rewrite {path} for Marketo: {source}", path = .0.display(), source = .1)]
    RewriteError(PathBuf, #[source] RewriteError),

    /// An output file could not be written
    #[error("IO error writing {path}: {source}", path = .0.display(), source = .1)]
    WriteError(PathBuf, #[source] std::io::Error),
}
