//! Parser for the model's scoreboard text.
//!
//! Tolerant by construction: unknown lines are skipped, missing sections
//! leave their fields empty, and nothing here can fail. Markdown that
//! models add despite instructions (code fences, table borders, bullets,
//! bold labels) is accepted.

use chrono::{DateTime, Local};
use regex::Regex;
use std::sync::LazyLock;

use super::types::{AnalysisResult, HeroStat, PlayerRow, StatEntry, TeamSide};

static FIELD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\**(MAP|TIME|MATCH TIME|MODE|GAME MODE|RESULT|MATCH RESULT)\**\s*:\s*\**\s*(.*)$").unwrap());

static TEAM_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^=+\s*(YOUR|ENEMY)\s+TEAM\s*=+$").unwrap());

static HERO_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\**HERO STATS\**\s*:?\s*\**\s*$").unwrap());

static TABLE_RULE_CELL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:?-{3,}:?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Team(TeamSide),
    Heroes,
}

/// Parses model output into an [`AnalysisResult`] stamped with `timestamp`.
pub fn parse_analysis(text: &str, timestamp: DateTime<Local>) -> AnalysisResult {
    let mut result = AnalysisResult::empty(timestamp);
    let mut section = Section::Preamble;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }

        if let Some(caps) = TEAM_HEADER.captures(line) {
            section = if caps[1].eq_ignore_ascii_case("YOUR") {
                Section::Team(TeamSide::Ally)
            } else {
                Section::Team(TeamSide::Enemy)
            };
            continue;
        }
        if HERO_HEADER.is_match(line) {
            section = Section::Heroes;
            continue;
        }
        if let Some(caps) = FIELD_LINE.captures(line) {
            let value = caps[2].trim_matches(|c: char| c == '*' || c.is_whitespace()).to_string();
            match caps[1].to_uppercase().as_str() {
                "MAP" => result.map = value,
                "TIME" | "MATCH TIME" => result.time = value,
                "MODE" | "GAME MODE" => result.mode = value,
                _ => result.result = value,
            }
            continue;
        }

        match section {
            Section::Team(side) => {
                if let Some(row) = parse_player_row(line, side) {
                    result.team_rows.push(row);
                }
            }
            Section::Heroes => {
                if let Some(hero) = parse_hero_line(line) {
                    result.hero_stats.push(hero);
                }
            }
            Section::Preamble => log::debug!("[REPORT] Ignoring line outside any section: {line}"),
        }
    }

    result
}

/// Parses `Role | Player | E | A | D | DMG | H | MIT`. Header and rule rows
/// and rows with too few cells yield `None`.
fn parse_player_row(line: &str, side: TeamSide) -> Option<PlayerRow> {
    if !line.contains('|') {
        return None;
    }
    let cells: Vec<&str> = line.trim_matches('|').split('|').map(str::trim).collect();
    if cells.len() < 8 {
        log::debug!("[REPORT] Skipping short table row ({} cells): {line}", cells.len());
        return None;
    }
    if cells[0].eq_ignore_ascii_case("role") || cells.iter().all(|c| TABLE_RULE_CELL.is_match(c)) {
        return None;
    }

    Some(PlayerRow {
        side,
        role: cells[0].to_string(),
        player_name: cells[1].to_string(),
        eliminations: parse_count(cells[2]),
        assists: parse_count(cells[3]),
        deaths: parse_count(cells[4]),
        damage: parse_count(cells[5]),
        healing: parse_count(cells[6]),
        mitigated: parse_count(cells[7]),
    })
}

/// Parses `Hero - Label: Value; Label: Value`.
fn parse_hero_line(line: &str) -> Option<HeroStat> {
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line)
        .trim();
    if line.is_empty() || line.starts_with('=') {
        return None;
    }

    let (name, rest) = match line.split_once(" - ") {
        Some((name, rest)) => (name.trim(), rest),
        None => (line, ""),
    };

    let stats = rest
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((label, value)) => StatEntry {
                label: label.trim().to_string(),
                value: value.trim().to_string(),
            },
            None => StatEntry {
                label: entry.to_string(),
                value: String::new(),
            },
        })
        .collect();

    Some(HeroStat {
        hero_name: name.to_string(),
        stats,
    })
}

/// `12,345`, `12 345` and `12345` are counts; `-` and anything else is not.
pub(crate) fn parse_count(cell: &str) -> Option<u64> {
    let digits: String = cell
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
