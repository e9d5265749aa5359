//! Report rendering.
//!
//! # Submodules
//!
//! - `text` - human readable report with a summary table
//! - `json` - pretty printed JSON array of outcomes

pub mod json;
pub mod text;

use crate::outcome::CheckOutcome;
use clap::ValueEnum;

/// Output format of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Renders `outcomes` in the requested format.
pub fn render(outcomes: &[CheckOutcome], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(text::render(outcomes)),
        OutputFormat::Json => json::render(outcomes),
    }
}
