//! mjkit - MJML email template tool
//!
//! A CLI tool for building MJML email templates and converting the
//! compiled HTML into Marketo email templates.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]

use anyhow::{Context, Result};
use clap::Parser;
use mjkit::beautify::Beautifier;
use mjkit::cli::{Cli, Commands};
use mjkit::compiler::CommandCompiler;
use mjkit::marketo::{self, RewriteOptions, Rewriter, StructuralPolicy, VariableKind};
use mjkit::pipeline::{self, BuildOptions};
use mjkit::project_config::{ProjectConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Main entry point for the mjkit CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { path, force } => {
            handle_init_command(path, force)?;
        }

        Commands::Build {
            input,
            output,
            marketo,
            strict,
        } => {
            let config = load_config(&cli.config)?;
            handle_build_command(&config, input, output, marketo, strict)?;
        }

        Commands::Marketo {
            input,
            output,
            strict,
            section_prefix,
            tag_prefix,
        } => {
            let config = load_config(&cli.config)?;
            let mut options = config.marketo.rewrite_options();
            if strict {
                options.policy = StructuralPolicy::Strict;
            }
            if section_prefix.is_some() {
                options.section_prefix = section_prefix;
            }
            if tag_prefix.is_some() {
                options.tag_prefix = tag_prefix;
            }
            handle_marketo_command(&input, output.as_deref(), options)?;
        }

        Commands::Beautify {
            input,
            output,
            indent,
        } => {
            let config = load_config(&cli.config)?;
            let beautifier = indent.map_or_else(|| config.beautify.beautifier(), Beautifier::new);
            handle_beautify_command(&input, output.as_deref(), beautifier)?;
        }

        Commands::Variables { input } => {
            handle_variables_command(&input)?;
        }
    }

    Ok(())
}

/// Initialize logging; `--verbose` raises the level to info, otherwise RUST_LOG applies
fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();
}

/// Load the project configuration, falling back to defaults when the file is absent
fn load_config(path: &Path) -> Result<ProjectConfig> {
    ProjectConfig::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Handle the init command
fn handle_init_command(path: Option<PathBuf>, force: bool) -> Result<()> {
    let target_path = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_path.exists() {
        std::fs::create_dir_all(&target_path)
            .with_context(|| format!("Failed to create directory {}", target_path.display()))?;
    }

    let config_path = target_path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it",
            config_path.display()
        );
    }

    ProjectConfig::default()
        .save(&config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("✓ Wrote {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set [compiler] program/args if the mjml CLI is not on your PATH");
    println!("  2. Run 'mjkit build' to compile your templates");

    Ok(())
}

/// Handle the build command
fn handle_build_command(
    config: &ProjectConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    marketo: bool,
    strict: bool,
) -> Result<()> {
    let output_dir = output.unwrap_or_else(|| config.build.output_dir.clone());

    let marketo_options = (marketo || config.build.marketo).then(|| {
        let mut options = config.marketo.rewrite_options();
        if strict {
            options.policy = StructuralPolicy::Strict;
        }
        options
    });

    println!("Building templates...");
    println!("Input: {}", input.display());
    println!("Output: {}", output_dir.display());
    if marketo_options.is_some() {
        println!("Marketo rewrite: enabled");
    }

    let options = BuildOptions {
        input,
        output_dir,
        beautifier: config.beautify.beautifier(),
        marketo: marketo_options,
    };
    let compiler = CommandCompiler::from_config(&config.compiler);

    let report = pipeline::build(&options, &compiler)
        .with_context(|| format!("Failed to build templates from {}", options.input.display()))?;

    for built in &report.templates {
        println!("✓ {} -> {}", built.source.display(), built.output.display());
        if let Some(ref rewrite) = built.report {
            println!(
                "    {} modules, {} images, {} text blocks, {} variables",
                rewrite.sections, rewrite.images, rewrite.text_blocks, rewrite.variables
            );
        }
    }

    println!(
        "\n✓ Build completed successfully! ({} templates)",
        report.templates.len()
    );

    Ok(())
}

/// Handle the marketo command
fn handle_marketo_command(
    input: &Path,
    output: Option<&Path>,
    options: RewriteOptions,
) -> Result<()> {
    let html = read_input(input)?;

    let html = Beautifier::default().beautify(&html);
    let rewritten = Rewriter::new(options)
        .rewrite(&html)
        .with_context(|| format!("Failed to rewrite {} for Marketo", input.display()))?;

    if !rewritten.report.empty_passes.is_empty() {
        log::info!(
            "Passes without matches: {}",
            rewritten.report.empty_passes.join(", ")
        );
    }

    write_result(output, &rewritten.html)
}

/// Handle the beautify command
fn handle_beautify_command(input: &Path, output: Option<&Path>, beautifier: Beautifier) -> Result<()> {
    let html = read_input(input)?;
    write_result(output, &beautifier.beautify(&html))
}

/// Handle the variables command
fn handle_variables_command(input: &Path) -> Result<()> {
    let source = read_input(input)?;

    let mut found = 0;
    for kind in VariableKind::ALL {
        let variables = marketo::extract(&source, kind);
        if variables.is_empty() {
            continue;
        }
        println!("{} variables:", kind);
        for variable in &variables {
            println!("  {} (default: {})", variable.name, variable.default);
        }
        found += variables.len();
    }

    if found == 0 {
        println!("No variables declared in {}", input.display());
    }

    Ok(())
}

/// Read an input file as UTF-8
fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write to a file when given, otherwise to stdout
fn write_result(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Successfully wrote: {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
