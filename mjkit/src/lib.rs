//! mjkit - MJML email template tool
//!
//! Compiles MJML templates to HTML through an external compiler, re-indents
//! the result and optionally rewrites it into a Marketo email template.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::enum_variant_names)]

pub mod beautify;
pub mod cli;
pub mod compiler;
pub mod marketo;
pub mod pipeline;
pub mod project_config;
pub mod walker;
