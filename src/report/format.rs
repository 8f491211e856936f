//! Report rendering: pure functions.
//!
//! Every section is always present; empty ones say so instead of
//! disappearing, so the layout is identical from one match to the next.

use std::fmt::Write as _;

use super::types::{AnalysisResult, HeroStat, PlayerRow, TeamSide};

pub const SEPARATOR: &str = "============================================================";

const TABLE_HEADER: &str = "Role | Player | Eliminations | Assists | Deaths | Damage | Healing | Mitigated";
const NO_PLAYERS: &str = "(no players)";
const NO_HERO_STATS: &str = "(none)";

/// Renders the full human-readable report.
pub fn format_report(result: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{SEPARATOR}");
    let _ = writeln!(
        out,
        "  OVERWATCH LOOKER -- Analysis at {}",
        result.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "{SEPARATOR}");

    out.push_str(&field_line("MAP", &result.map));
    out.push_str(&field_line("TIME", &result.time));
    out.push_str(&field_line("MODE", &result.mode));
    out.push_str(&field_line("RESULT", &result.result));

    for (title, side) in [("YOUR TEAM", TeamSide::Ally), ("ENEMY TEAM", TeamSide::Enemy)] {
        let _ = writeln!(out, "\n=== {title} ===");
        let _ = writeln!(out, "{TABLE_HEADER}");
        let mut any = false;
        for row in result.rows_for(side) {
            let _ = writeln!(out, "{}", format_row(row));
            any = true;
        }
        if !any {
            let _ = writeln!(out, "{NO_PLAYERS}");
        }
    }

    let _ = writeln!(out, "\nHERO STATS:");
    if result.hero_stats.is_empty() {
        let _ = writeln!(out, "{NO_HERO_STATS}");
    }
    for hero in &result.hero_stats {
        let _ = writeln!(out, "{}", format_hero(hero));
    }

    out.push_str(SEPARATOR);
    out
}

fn field_line(label: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{label}:\n")
    } else {
        format!("{label}: {value}\n")
    }
}

fn format_row(row: &PlayerRow) -> String {
    let counts = [
        row.eliminations,
        row.assists,
        row.deaths,
        row.damage,
        row.healing,
        row.mitigated,
    ]
    .map(format_count);
    format!("{} | {} | {}", row.role, row.player_name, counts.join(" | "))
}

fn format_hero(hero: &HeroStat) -> String {
    if hero.stats.is_empty() {
        return hero.hero_name.clone();
    }
    let stats: Vec<String> = hero
        .stats
        .iter()
        .map(|s| {
            if s.value.is_empty() {
                s.label.clone()
            } else {
                format!("{}: {}", s.label, s.value)
            }
        })
        .collect();
    format!("{} - {}", hero.hero_name, stats.join("; "))
}

fn format_count(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), group_thousands)
}

/// `1234567` → `"1,234,567"`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
