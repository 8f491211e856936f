//! Report domain: turning model text into what the user reads.
//!
//! `parse.rs` reads the model's structured text into an [`AnalysisResult`],
//! `format.rs` renders that into the fixed report layout. Both are pure.

mod format;
mod parse;
mod types;

pub use format::{format_report, group_thousands, SEPARATOR};
pub use parse::parse_analysis;
pub use types::{AnalysisResult, HeroStat, PlayerRow, StatEntry, TeamSide};

pub const NOTIFICATION_TITLE: &str = "OverwatchLooker";

/// Short summary shown in the toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    pub body: String,
}

/// A fully rendered report, handed to every delivery sink unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub headline: Headline,
}

impl Report {
    pub fn render(result: &AnalysisResult) -> Self {
        Self {
            text: format_report(result),
            headline: headline(result),
        }
    }
}

/// `"King's Row: VICTORY - copied to clipboard."`, with placeholders for
/// fields the model could not read.
pub fn headline(result: &AnalysisResult) -> Headline {
    let map = if result.map.is_empty() { "Unknown map" } else { &result.map };
    let outcome = if result.result.is_empty() { "UNKNOWN" } else { &result.result };
    Headline {
        title: NOTIFICATION_TITLE.to_string(),
        body: format!("{map}: {outcome} - copied to clipboard."),
    }
}
