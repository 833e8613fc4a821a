//! Error types for the Marketo rewriter

use thiserror::Error;

/// Errors raised while rewriting compiled HTML into the Marketo dialect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// A structural pattern found nothing and the strict policy is active
    #[error("no match for the {pattern} pattern; the HTML does not have the expected MJML layout")]
    MissingAnchor {
        /// Name of the pattern that found nothing
        pattern: &'static str,
    },

    /// The number of captured values differs from the number of replacement sites
    #[error("{pattern}: captured {captured} values but found {found} replacement sites")]
    CaptureMismatch {
        /// Name of the pattern being replaced
        pattern: &'static str,
        /// Values captured from the original document
        captured: usize,
        /// Sites found in the document being rewritten
        found: usize,
    },

    /// A replacement site does not hold the value captured for it
    #[error("{pattern}: replacement site {index} does not match the value captured for it")]
    CaptureOrder {
        /// Name of the pattern being replaced
        pattern: &'static str,
        /// Zero-based index of the offending site
        index: usize,
    },

    /// A section div has no class to name its module, and the strict policy is active
    #[error("section at line {line} has no class; add a css-class to its mj-section to name the module")]
    UnnamedSection {
        /// 1-based line of the section div in the input
        line: usize,
    },

    /// A typed placeholder could not be parsed, and the strict policy is active
    #[error("placeholder {placeholder} could not be parsed as a variable")]
    UnparsedVariable {
        /// The placeholder as written
        placeholder: String,
    },

    /// An id prefix is not two uppercase ASCII letters
    #[error("invalid id prefix '{0}': expected two uppercase ASCII letters")]
    InvalidPrefix(String),

    /// Section and tag generators were given the same prefix
    #[error("section and tag id prefixes must differ, both are '{0}'")]
    DuplicatePrefix(String),
}
