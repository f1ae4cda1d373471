//! Run configuration: raw caller input and the validated structs the engine reads.
//!
//! Each `Raw*` struct mirrors its validated counterpart with every field
//! optional. Values of the wrong JSON type deserialize as absent, and
//! `normalize` never fails: missing or non-finite values take the documented
//! default and numbers are clamped into range.

use serde::{Deserialize, Serialize};

use crate::genome::MutationSettings;
use crate::lenient;
use crate::numeric::{clamp_int_or, clamp_or};

/// Identifier reported for the seasonal environment model.
pub const ENVIRONMENT_MODE: &str = "seasonal-v1";

/// Selection and mutation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionConfig {
    /// Share of the parent source kept as elite, `[0, 1]`.
    pub elite_ratio: f64,
    /// Share of the parent source sampled for diversity, `[0, 1]`.
    pub diversity_ratio: f64,
    /// Minimum elite count, `[1, 1000]`.
    pub min_elite: u32,
    /// Minimum diversity count when any non-elite remains, `[0, 1000]`.
    pub min_diversity: u32,
    /// Per-gene mutation probability, `[0, 1]`.
    pub mutation_rate: f64,
    /// Mutation perturbation span, `[0, 1]`.
    pub mutation_strength: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEvolutionConfig {
    #[serde(deserialize_with = "lenient::option")]
    pub elite_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub diversity_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub min_elite: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub min_diversity: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub mutation_rate: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub mutation_strength: Option<f64>,
}

impl EvolutionConfig {
    pub const DEFAULT_ELITE_RATIO: f64 = 0.2;
    pub const DEFAULT_DIVERSITY_RATIO: f64 = 0.07;
    pub const DEFAULT_MIN_ELITE: u32 = 2;
    pub const DEFAULT_MIN_DIVERSITY: u32 = 1;
    pub const DEFAULT_MUTATION_RATE: f64 = 0.12;
    pub const DEFAULT_MUTATION_STRENGTH: f64 = 0.18;

    #[must_use]
    pub fn normalize(raw: &RawEvolutionConfig) -> Self {
        Self {
            elite_ratio: clamp_or(raw.elite_ratio, 0.0, 1.0, Self::DEFAULT_ELITE_RATIO),
            diversity_ratio: clamp_or(
                raw.diversity_ratio,
                0.0,
                1.0,
                Self::DEFAULT_DIVERSITY_RATIO,
            ),
            min_elite: clamp_int_or(
                raw.min_elite,
                1,
                1_000,
                i64::from(Self::DEFAULT_MIN_ELITE),
            ) as u32,
            min_diversity: clamp_int_or(
                raw.min_diversity,
                0,
                1_000,
                i64::from(Self::DEFAULT_MIN_DIVERSITY),
            ) as u32,
            mutation_rate: clamp_or(raw.mutation_rate, 0.0, 1.0, Self::DEFAULT_MUTATION_RATE),
            mutation_strength: clamp_or(
                raw.mutation_strength,
                0.0,
                1.0,
                Self::DEFAULT_MUTATION_STRENGTH,
            ),
        }
    }

    /// Mutation knobs handed to the genome model.
    #[must_use]
    pub const fn mutation(&self) -> MutationSettings {
        MutationSettings {
            rate: self.mutation_rate,
            strength: self.mutation_strength,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self::normalize(&RawEvolutionConfig::default())
    }
}

/// Decoration rates for the poem generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemStyleConfig {
    pub particle_rate: f64,
    pub conjunction_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPoemStyleConfig {
    #[serde(deserialize_with = "lenient::option")]
    pub particle_rate: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub conjunction_rate: Option<f64>,
}

impl PoemStyleConfig {
    pub const DEFAULT_PARTICLE_RATE: f64 = 0.1;
    pub const DEFAULT_CONJUNCTION_RATE: f64 = 0.03;

    #[must_use]
    pub fn normalize(raw: &RawPoemStyleConfig) -> Self {
        Self {
            particle_rate: clamp_or(raw.particle_rate, 0.0, 1.0, Self::DEFAULT_PARTICLE_RATE),
            conjunction_rate: clamp_or(
                raw.conjunction_rate,
                0.0,
                1.0,
                Self::DEFAULT_CONJUNCTION_RATE,
            ),
        }
    }
}

impl Default for PoemStyleConfig {
    fn default() -> Self {
        Self::normalize(&RawPoemStyleConfig::default())
    }
}

/// One entry of the seasonal cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub key: String,
    pub label: String,
    /// Share of nutrients in focus, `[0.3, 1]`.
    pub focus_ratio: f64,
    /// Base metabolism multiplier, `[0.7, 1.3]`.
    pub metabolism_multiplier: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSeason {
    #[serde(deserialize_with = "lenient::option")]
    pub key: Option<String>,
    #[serde(deserialize_with = "lenient::option")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient::option")]
    pub focus_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub metabolism_multiplier: Option<f64>,
}

impl Season {
    fn preset(key: &str, label: &str, focus_ratio: f64, metabolism_multiplier: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            focus_ratio,
            metabolism_multiplier,
        }
    }

    /// Spring, summer, autumn, winter.
    #[must_use]
    pub fn default_cycle() -> Vec<Self> {
        vec![
            Self::preset("spring", "Spring", 0.9, 1.06),
            Self::preset("summer", "Summer", 0.75, 1.02),
            Self::preset("autumn", "Autumn", 0.65, 0.97),
            Self::preset("winter", "Winter", 0.55, 0.92),
        ]
    }

    /// Normalizes `raw`, filling gaps field-by-field from `fallback`.
    #[must_use]
    pub fn normalize(raw: &RawSeason, fallback: &Season) -> Self {
        let key = non_blank(raw.key.as_deref())
            .unwrap_or(fallback.key.as_str())
            .trim()
            .to_string();
        let label = non_blank(raw.label.as_deref())
            .or_else(|| non_blank(Some(fallback.label.as_str())))
            .unwrap_or(key.as_str())
            .trim()
            .to_string();
        Self {
            focus_ratio: clamp_or(raw.focus_ratio, 0.3, 1.0, fallback.focus_ratio),
            metabolism_multiplier: clamp_or(
                raw.metabolism_multiplier,
                0.7,
                1.3,
                fallback.metabolism_multiplier,
            ),
            key,
            label,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

/// Nutrient stress accumulation and recovery parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDynamicsConfig {
    pub enabled: bool,
    /// Usage ratio above which a nutrient accumulates stress, `[0.2, 0.95]`.
    pub depletion_threshold: f64,
    /// Stress gained at full over-use, `[0, 1]`.
    pub depletion_gain: f64,
    /// Share of stress shed every generation, `[0, 0.8]`.
    pub recovery_rate: f64,
    /// Extra recovery for nutrients that were not active, `[0, 0.4]`.
    pub inactive_recovery_bonus: f64,
    /// Stress at which a nutrient is reported as depleted, `[0.25, 1]`.
    pub depletion_level: f64,
    /// How strongly mean active stress lowers the metabolism multiplier, `[0, 0.5]`.
    pub metabolism_impact: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawResourceDynamicsConfig {
    #[serde(deserialize_with = "lenient::option")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient::option")]
    pub depletion_threshold: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub depletion_gain: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub recovery_rate: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub inactive_recovery_bonus: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub depletion_level: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub metabolism_impact: Option<f64>,
}

impl ResourceDynamicsConfig {
    #[must_use]
    pub fn normalize(raw: &RawResourceDynamicsConfig) -> Self {
        Self {
            enabled: raw.enabled != Some(false),
            depletion_threshold: clamp_or(raw.depletion_threshold, 0.2, 0.95, 0.55),
            depletion_gain: clamp_or(raw.depletion_gain, 0.0, 1.0, 0.42),
            recovery_rate: clamp_or(raw.recovery_rate, 0.0, 0.8, 0.18),
            inactive_recovery_bonus: clamp_or(raw.inactive_recovery_bonus, 0.0, 0.4, 0.12),
            depletion_level: clamp_or(raw.depletion_level, 0.25, 1.0, 0.58),
            metabolism_impact: clamp_or(raw.metabolism_impact, 0.0, 0.5, 0.22),
        }
    }
}

impl Default for ResourceDynamicsConfig {
    fn default() -> Self {
        Self::normalize(&RawResourceDynamicsConfig::default())
    }
}

/// Seasonal ecology configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub mode: String,
    pub enabled: bool,
    pub seasons: Vec<Season>,
    pub resource_dynamics: ResourceDynamicsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEnvironmentConfig {
    #[serde(deserialize_with = "lenient::option")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient::option_vec")]
    pub seasons: Option<Vec<RawSeason>>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub resource_dynamics: RawResourceDynamicsConfig,
}

impl EnvironmentConfig {
    #[must_use]
    pub fn normalize(raw: &RawEnvironmentConfig) -> Self {
        let defaults = Season::default_cycle();
        let seasons = match raw.seasons.as_deref() {
            Some(seasons) if !seasons.is_empty() => seasons
                .iter()
                .enumerate()
                .map(|(index, season)| Season::normalize(season, &defaults[index % defaults.len()]))
                .collect(),
            _ => defaults,
        };
        Self {
            mode: ENVIRONMENT_MODE.to_string(),
            enabled: raw.enabled != Some(false),
            seasons,
            resource_dynamics: ResourceDynamicsConfig::normalize(&raw.resource_dynamics),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self::normalize(&RawEnvironmentConfig::default())
    }
}

/// Energy economy and population sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeConfig {
    pub variable_population_enabled: bool,
    pub min_population_ratio: f64,
    pub max_population_ratio: f64,
    pub initial_energy: f64,
    pub max_energy: f64,
    pub min_birth_energy: f64,
    pub energy_death_threshold: f64,
    pub base_metabolism_cost: f64,
    pub score_to_energy_scale: f64,
    pub season_energy_scale: f64,
    pub energy_inheritance: f64,
    pub birth_energy_jitter: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawLifeConfig {
    #[serde(deserialize_with = "lenient::option")]
    pub variable_population_enabled: Option<bool>,
    #[serde(deserialize_with = "lenient::option")]
    pub min_population_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub max_population_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub initial_energy: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub max_energy: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub min_birth_energy: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub energy_death_threshold: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub base_metabolism_cost: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub score_to_energy_scale: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub season_energy_scale: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub energy_inheritance: Option<f64>,
    #[serde(deserialize_with = "lenient::option")]
    pub birth_energy_jitter: Option<f64>,
}

impl LifeConfig {
    pub const DEFAULT_INITIAL_ENERGY: f64 = 100.0;
    pub const DEFAULT_MAX_ENERGY: f64 = 150.0;
    pub const DEFAULT_MIN_BIRTH_ENERGY: f64 = 28.0;
    pub const DEFAULT_ENERGY_DEATH_THRESHOLD: f64 = 1.0;

    /// Normalizes in dependency order: later ranges are bounded by earlier results.
    #[must_use]
    pub fn normalize(raw: &RawLifeConfig) -> Self {
        let min_population_ratio = clamp_or(raw.min_population_ratio, 0.3, 1.2, 0.55);
        let max_population_ratio =
            clamp_or(raw.max_population_ratio, min_population_ratio, 2.5, 1.6);
        let initial_energy =
            clamp_or(raw.initial_energy, 20.0, 250.0, Self::DEFAULT_INITIAL_ENERGY);
        let max_energy = clamp_or(raw.max_energy, initial_energy, 320.0, Self::DEFAULT_MAX_ENERGY);
        let min_birth_energy = clamp_or(
            raw.min_birth_energy,
            0.0,
            max_energy,
            Self::DEFAULT_MIN_BIRTH_ENERGY.min(max_energy),
        );
        let energy_death_threshold = clamp_or(
            raw.energy_death_threshold,
            0.0,
            min_birth_energy,
            Self::DEFAULT_ENERGY_DEATH_THRESHOLD.min(min_birth_energy),
        );

        Self {
            variable_population_enabled: raw.variable_population_enabled != Some(false),
            min_population_ratio,
            max_population_ratio,
            initial_energy,
            max_energy,
            min_birth_energy,
            energy_death_threshold,
            base_metabolism_cost: clamp_or(raw.base_metabolism_cost, 0.0, 80.0, 16.0),
            score_to_energy_scale: clamp_or(raw.score_to_energy_scale, 0.0, 1.2, 0.34),
            season_energy_scale: clamp_or(raw.season_energy_scale, 0.0, 30.0, 12.0),
            energy_inheritance: clamp_or(raw.energy_inheritance, 0.0, 1.0, 0.72),
            birth_energy_jitter: clamp_or(raw.birth_energy_jitter, 0.0, 30.0, 6.0),
        }
    }
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self::normalize(&RawLifeConfig::default())
    }
}
