//! Projection of a record into the gallery submission payload.

use serde::{Deserialize, Serialize};

use crate::biome::Biome;
use crate::config::Season;
use crate::diagnosis::ScoreBreakdown;
use crate::evolution::{GenerationRecord, SimulationOutput};
use crate::genome::Genome;

/// Season keys the gallery accepts, in cycle order.
pub const PUBLISH_SEASONS: [&str; 4] = ["spring", "summer", "autumn", "winter"];
pub const PREVIEW_MAX_LINES: usize = 3;
pub const PREVIEW_MAX_CHARS: usize = 220;

/// Wire shape of a gallery submission (snake_case on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    #[serde(rename = "poem_text")]
    pub text: String,
    pub biome: Biome,
    pub season: String,
    pub score_total: f64,
    pub score_breakdown: ScoreBreakdown,
    pub genome: Genome,
    pub parent_ids: Vec<String>,
    pub run_hash: String,
}

impl PublishPayload {
    /// Projects `record`, taken from `run`, into a submission.
    #[must_use]
    pub fn from_record(record: &GenerationRecord, biome: Biome, run: &SimulationOutput) -> Self {
        Self {
            text: record.text.clone(),
            biome,
            season: publish_season(
                &record.environment.season_key,
                record.generation,
                &run.environment_config.seasons,
            ),
            score_total: record.score,
            score_breakdown: record.score_breakdown,
            genome: record.genome,
            parent_ids: record.parent_ids.clone(),
            run_hash: run.run_id.clone(),
        }
    }

    #[must_use]
    pub fn preview(&self) -> String {
        poem_preview(&self.text, PREVIEW_MAX_LINES, PREVIEW_MAX_CHARS)
    }
}

/// Gallery season for a record of `generation`.
///
/// The record's own `season_key` wins when the gallery knows it. Otherwise the
/// configured season at the generation's cycle slot is tried, then the
/// default cycle slot.
#[must_use]
pub fn publish_season(season_key: &str, generation: usize, seasons: &[Season]) -> String {
    if PUBLISH_SEASONS.contains(&season_key) {
        return season_key.to_string();
    }
    let slot = generation.saturating_sub(1);
    if !seasons.is_empty() {
        let configured = seasons[slot % seasons.len()].key.as_str();
        if PUBLISH_SEASONS.contains(&configured) {
            return configured.to_string();
        }
    }
    PUBLISH_SEASONS[slot % PUBLISH_SEASONS.len()].to_string()
}

/// First `max_lines` non-blank trimmed lines, cut to `max_chars` with a trailing ellipsis.
#[must_use]
pub fn poem_preview(text: &str, max_lines: usize, max_chars: usize) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n");
    if joined.chars().count() <= max_chars {
        return joined;
    }
    let mut cut: String = joined.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
