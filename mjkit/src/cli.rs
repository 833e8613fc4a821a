//! Command-line interface definitions for mjkit

use crate::project_config::CONFIG_FILE_NAME;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI structure for the mjkit application
#[derive(Parser)]
#[command(name = "mjkit")]
#[command(version)]
#[command(about = "Build MJML email templates and convert them for Marketo", long_about = None)]
pub struct Cli {
    /// Project configuration file (built-in defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for mjkit
#[derive(Subcommand)]
pub enum Commands {
    /// Compile MJML templates to HTML
    Build {
        /// Template directory or single .mjml file (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        input: PathBuf,

        /// Output directory (overrides build.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rewrite the HTML for Marketo (overrides build.marketo)
        #[arg(long)]
        marketo: bool,

        /// Fail when the compiled HTML lacks the expected structure
        #[arg(long)]
        strict: bool,
    },

    /// Rewrite already compiled HTML for Marketo
    Marketo {
        /// Compiled HTML file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail when the HTML lacks the expected structure
        #[arg(long)]
        strict: bool,

        /// Two uppercase letters prefixing section ids
        #[arg(long, value_name = "XX")]
        section_prefix: Option<String>,

        /// Two uppercase letters prefixing image and text ids
        #[arg(long, value_name = "XX")]
        tag_prefix: Option<String>,
    },

    /// Re-indent an HTML file
    Beautify {
        /// HTML file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Spaces per level (overrides beautify.indent_size)
        #[arg(long)]
        indent: Option<usize>,
    },

    /// List the typed variables a template declares
    Variables {
        /// MJML or HTML file
        input: PathBuf,
    },

    /// Write a default mjkit.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        path: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_with_global_flags() {
        let cli = Cli::parse_from(["mjkit", "build", "templates", "--marketo", "-v", "-o", "out"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("mjkit.toml"));
        match cli.command {
            Commands::Build {
                input,
                output,
                marketo,
                strict,
            } => {
                assert_eq!(input, PathBuf::from("templates"));
                assert_eq!(output, Some(PathBuf::from("out")));
                assert!(marketo);
                assert!(!strict);
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_parse_marketo_prefixes() {
        let cli = Cli::parse_from([
            "mjkit",
            "marketo",
            "mail.html",
            "--section-prefix",
            "SC",
            "--tag-prefix",
            "TG",
        ]);
        match cli.command {
            Commands::Marketo {
                section_prefix,
                tag_prefix,
                ..
            } => {
                assert_eq!(section_prefix.as_deref(), Some("SC"));
                assert_eq!(tag_prefix.as_deref(), Some("TG"));
            }
            _ => panic!("expected marketo command"),
        }
    }
}
