//! Rule-based fitness diagnostic.
//!
//! A poem earns metabolism and structure points, loses toxicity and repetition
//! points, and accumulates reason tags in a fixed order as each rule fires.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::genome::Genome;
use crate::numeric::round3;
use crate::poem::{PoemUsage, UsageStats};

pub const MAX_METABOLISM_SCORE: f64 = 45.0;
pub const MAX_SCORE: f64 = 100.0;
const TOXIN_PENALTY_PER_HIT: f64 = 35.0;
const TOXIN_IMMUNITY_FACTOR: f64 = 0.7;
const LETHAL_TOXIN_FLOOR: f64 = 80.0;

/// Diagnostic tag, serialized in kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosisReason {
    NutrientStarved,
    UnevenNutrition,
    SeasonalTailwind,
    SeasonalHeadwind,
    StructureCollapse,
    LineLengthDrift,
    OverlongLine,
    ToxinDetected,
    Dead,
    RepetitionSeizure,
    OverRepetition,
    SameWordSpam,
    Stable,
    /// Appended by the energy economy, never by [`diagnose`].
    EnergyDepletion,
}

impl DiagnosisReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NutrientStarved => "nutrient-starved",
            Self::UnevenNutrition => "uneven-nutrition",
            Self::SeasonalTailwind => "seasonal-tailwind",
            Self::SeasonalHeadwind => "seasonal-headwind",
            Self::StructureCollapse => "structure-collapse",
            Self::LineLengthDrift => "line-length-drift",
            Self::OverlongLine => "overlong-line",
            Self::ToxinDetected => "toxin-detected",
            Self::Dead => "dead",
            Self::RepetitionSeizure => "repetition-seizure",
            Self::OverRepetition => "over-repetition",
            Self::SameWordSpam => "same-word-spam",
            Self::Stable => "stable",
            Self::EnergyDepletion => "energy-depletion",
        }
    }
}

impl fmt::Display for DiagnosisReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub metabolism_score: f64,
    pub structure_score: f64,
    pub toxin_penalty: f64,
    pub repetition_penalty: f64,
}

/// Subset of the usage statistics the diagnostic looked at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisMetrics {
    pub line_count: usize,
    pub average_line_length: f64,
    pub unique_token_ratio: f64,
    pub longest_repeat_run: usize,
}

impl From<&UsageStats> for DiagnosisMetrics {
    fn from(stats: &UsageStats) -> Self {
        Self {
            line_count: stats.line_count,
            average_line_length: stats.average_line_length,
            unique_token_ratio: stats.unique_token_ratio,
            longest_repeat_run: stats.longest_repeat_run,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub reasons: Vec<DiagnosisReason>,
    pub is_dead: bool,
    pub toxic_hits: Vec<String>,
    pub nutrients_expected: usize,
    pub metrics: DiagnosisMetrics,
}

impl Diagnosis {
    #[must_use]
    pub fn has_reason(&self, reason: DiagnosisReason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// Everything the diagnostic needs to judge one poem.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosisInput<'a> {
    pub text: &'a str,
    pub genome: &'a Genome,
    pub usage: &'a PoemUsage,
    /// Number of nutrients that were offered to the generator.
    pub nutrients_expected: usize,
    pub toxic_words: &'a [String],
    pub metabolism_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub diagnosis: Diagnosis,
}

/// Scores one poem. Pure: the same input always yields the same evaluation.
#[must_use]
pub fn diagnose(input: &DiagnosisInput<'_>) -> Evaluation {
    let stats = &input.usage.stats;
    let mut reasons = Vec::new();

    let metabolism_score = metabolism_score(
        input.usage.used_nutrients.len(),
        input.nutrients_expected,
        input.metabolism_multiplier,
        &mut reasons,
    );
    let structure_score = structure_score(stats, input.genome, &mut reasons);

    let toxic_hits = find_toxic_hits(input.text, input.toxic_words);
    let is_dead = !toxic_hits.is_empty();
    let mut toxin_penalty = round3(
        toxic_hits.len() as f64
            * TOXIN_PENALTY_PER_HIT
            * (1.0 - input.genome.immunity * TOXIN_IMMUNITY_FACTOR),
    );
    if is_dead {
        toxin_penalty = toxin_penalty.max(LETHAL_TOXIN_FLOOR);
        reasons.push(DiagnosisReason::ToxinDetected);
        reasons.push(DiagnosisReason::Dead);
    }

    let repetition_penalty = repetition_penalty(stats, &mut reasons);

    let score = if is_dead {
        0.0
    } else {
        round3(metabolism_score + structure_score - toxin_penalty - repetition_penalty)
            .clamp(0.0, MAX_SCORE)
    };

    if reasons.is_empty() {
        reasons.push(DiagnosisReason::Stable);
    }

    Evaluation {
        score,
        score_breakdown: ScoreBreakdown {
            metabolism_score,
            structure_score,
            toxin_penalty,
            repetition_penalty,
        },
        diagnosis: Diagnosis {
            reasons,
            is_dead,
            toxic_hits,
            nutrients_expected: input.nutrients_expected,
            metrics: DiagnosisMetrics::from(stats),
        },
    }
}

fn metabolism_score(
    used: usize,
    expected: usize,
    multiplier: f64,
    reasons: &mut Vec<DiagnosisReason>,
) -> f64 {
    if used == 0 {
        reasons.push(DiagnosisReason::NutrientStarved);
        return 0.0;
    }

    let coverage = used as f64 / expected.max(1) as f64;
    let base = if coverage >= 0.75 || used >= 3 {
        38.0
    } else if coverage >= 0.4 || used >= 2 {
        32.0
    } else {
        reasons.push(DiagnosisReason::UnevenNutrition);
        24.0
    };

    let multiplier = if multiplier.is_finite() { multiplier } else { 1.0 };
    if multiplier >= 1.06 {
        reasons.push(DiagnosisReason::SeasonalTailwind);
    } else if multiplier <= 0.94 {
        reasons.push(DiagnosisReason::SeasonalHeadwind);
    }

    round3(base * multiplier).clamp(0.0, MAX_METABOLISM_SCORE)
}

fn structure_score(stats: &UsageStats, genome: &Genome, reasons: &mut Vec<DiagnosisReason>) -> f64 {
    let mut score = 0.0;
    let target_len = f64::from(genome.line_len);

    if (4..=16).contains(&stats.line_count) {
        score += 12.0;
    } else {
        reasons.push(DiagnosisReason::StructureCollapse);
    }

    if (stats.line_count as i64 - i64::from(genome.lines)).abs() <= 2 {
        score += 8.0;
    }

    let min_average = (target_len * 0.4).max(4.0);
    let max_average = target_len * 1.8;
    if (min_average..=max_average).contains(&stats.average_line_length) {
        score += 14.0;
    } else {
        reasons.push(DiagnosisReason::LineLengthDrift);
    }

    // Overshoot only tags; it never subtracts.
    if stats.max_line_length as f64 > target_len * 2.4 {
        reasons.push(DiagnosisReason::OverlongLine);
    } else {
        score += 8.0;
    }

    score
}

fn repetition_penalty(stats: &UsageStats, reasons: &mut Vec<DiagnosisReason>) -> f64 {
    let mut penalty = 0.0;
    if stats.unique_token_ratio < 0.32 {
        penalty += 25.0;
        reasons.push(DiagnosisReason::RepetitionSeizure);
    } else if stats.unique_token_ratio < 0.45 {
        penalty += 12.0;
        reasons.push(DiagnosisReason::OverRepetition);
    }
    if stats.longest_repeat_run >= 4 {
        penalty += 10.0;
        reasons.push(DiagnosisReason::SameWordSpam);
    }
    penalty
}

/// Trimmed toxic words occurring case-insensitively anywhere in `text`.
#[must_use]
pub fn find_toxic_hits(text: &str, toxic_words: &[String]) -> Vec<String> {
    let lowered = text.to_lowercase();
    toxic_words
        .iter()
        .map(|word| word.trim())
        .filter(|word| !word.is_empty() && lowered.contains(&word.to_lowercase()))
        .map(str::to_string)
        .collect()
}
