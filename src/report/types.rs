//! Extracted match data.

use chrono::{DateTime, Local};

/// Which scoreboard table a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSide {
    Ally,
    Enemy,
}

/// One scoreboard row. Numeric cells are `None` when the model reported
/// them as not visible (`-`) or sent something that is not a count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub side: TeamSide,
    pub role: String,
    pub player_name: String,
    pub eliminations: Option<u64>,
    pub assists: Option<u64>,
    pub deaths: Option<u64>,
    pub damage: Option<u64>,
    pub healing: Option<u64>,
    pub mitigated: Option<u64>,
}

/// A single hero-specific stat. Values stay display text: the vocabulary is
/// open-ended and mixes counts, percentages and ratios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroStat {
    pub hero_name: String,
    pub stats: Vec<StatEntry>,
}

/// Everything read off one scoreboard capture. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub timestamp: DateTime<Local>,
    pub map: String,
    pub mode: String,
    pub time: String,
    pub result: String,
    pub team_rows: Vec<PlayerRow>,
    pub hero_stats: Vec<HeroStat>,
}

impl AnalysisResult {
    /// A result with no extracted fields.
    pub fn empty(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            map: String::new(),
            mode: String::new(),
            time: String::new(),
            result: String::new(),
            team_rows: Vec::new(),
            hero_stats: Vec::new(),
        }
    }

    pub fn rows_for(&self, side: TeamSide) -> impl Iterator<Item = &PlayerRow> {
        self.team_rows.iter().filter(move |r| r.side == side)
    }
}
