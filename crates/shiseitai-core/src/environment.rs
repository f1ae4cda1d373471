//! Seasonal nutrient focus and resource stress.
//!
//! Each generation rotates the nutrient list, picks a season, and favours
//! nutrients that are both in season and not stressed. After the generation is
//! ranked, [`ResourceState::evolve`] turns aggregate usage into the next stress map.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use crate::config::{EnvironmentConfig, ResourceDynamicsConfig};
use crate::numeric::{mean, round3};

pub const STATIC_SEASON_KEY: &str = "static";
pub const STATIC_SEASON_LABEL: &str = "Static";
const OFF_SEASON_WEIGHT: f64 = 0.35;
const MAX_DECAY: f64 = 0.95;

/// Nutrient word → stress in `[0, 1]`, rounded to three decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceState(BTreeMap<String, f64>);

impl ResourceState {
    /// Zero stress for every nutrient.
    #[must_use]
    pub fn new(nutrients: &[String]) -> Self {
        Self(nutrients.iter().map(|word| (word.clone(), 0.0)).collect())
    }

    /// Clamped stress for `word`; zero when unknown or non-finite.
    #[must_use]
    pub fn stress(&self, word: &str) -> f64 {
        match self.0.get(word) {
            Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn set(&mut self, word: impl Into<String>, stress: f64) {
        self.0.insert(word.into(), stress);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rounded stress levels for `nutrients`, in the given order.
    #[must_use]
    pub fn levels(&self, nutrients: &[String]) -> Vec<ResourceLevel> {
        nutrients
            .iter()
            .map(|word| ResourceLevel {
                nutrient: word.clone(),
                stress: round3(self.stress(word)),
            })
            .collect()
    }

    /// Next stress map after a generation whose records used the given nutrient sets.
    ///
    /// `usages` holds one used-nutrient list per record. With dynamics disabled
    /// the levels are frozen.
    #[must_use]
    pub fn evolve<'a, I>(
        &self,
        nutrients: &[String],
        usages: I,
        active: &[String],
        dynamics: &ResourceDynamicsConfig,
    ) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        if !dynamics.enabled {
            return Self(
                nutrients
                    .iter()
                    .map(|word| (word.clone(), round3(self.stress(word))))
                    .collect(),
            );
        }

        let mut counts: BTreeMap<&str, usize> =
            nutrients.iter().map(|word| (word.as_str(), 0)).collect();
        let mut records = 0_usize;
        for used in usages {
            records += 1;
            for word in used {
                if let Some(count) = counts.get_mut(word.as_str()) {
                    *count += 1;
                }
            }
        }
        let population = records.max(1) as f64;
        let active: HashSet<&str> = active.iter().map(String::as_str).collect();
        let threshold = dynamics.depletion_threshold;

        let next = nutrients
            .iter()
            .map(|word| {
                let previous = self.stress(word);
                let usage_ratio =
                    counts.get(word.as_str()).copied().unwrap_or(0) as f64 / population;
                let pressure = if usage_ratio <= threshold {
                    0.0
                } else {
                    (usage_ratio - threshold) / (1.0 - threshold)
                };
                let bonus = if active.contains(word.as_str()) {
                    0.0
                } else {
                    dynamics.inactive_recovery_bonus
                };
                let decay = (dynamics.recovery_rate + bonus).clamp(0.0, MAX_DECAY);
                let stress = previous * (1.0 - decay) + pressure * dynamics.depletion_gain;
                (word.clone(), round3(stress.clamp(0.0, 1.0)))
            })
            .collect();
        Self(next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLevel {
    pub nutrient: String,
    pub stress: f64,
}

/// Environment in force for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub mode: String,
    pub season_key: String,
    pub season_label: String,
    pub season_index: usize,
    pub focus_ratio: f64,
    pub metabolism_multiplier: f64,
    pub base_nutrients: Vec<String>,
    pub active_nutrients: Vec<String>,
    pub dormant_nutrients: Vec<String>,
    pub depleted_nutrients: Vec<String>,
    /// Stress per nutrient in base order.
    pub resource_levels: Vec<ResourceLevel>,
    pub resource_pressure: f64,
}

impl EnvironmentSnapshot {
    fn fixed(mode: &str, nutrients: &[String]) -> Self {
        Self {
            mode: mode.to_string(),
            season_key: STATIC_SEASON_KEY.to_string(),
            season_label: STATIC_SEASON_LABEL.to_string(),
            season_index: 0,
            focus_ratio: 1.0,
            metabolism_multiplier: 1.0,
            base_nutrients: nutrients.to_vec(),
            active_nutrients: nutrients.to_vec(),
            dormant_nutrients: Vec::new(),
            depleted_nutrients: Vec::new(),
            resource_levels: ResourceState::new(nutrients).levels(nutrients),
            resource_pressure: 0.0,
        }
    }

    /// Active nutrients, or the base list when none are active.
    #[must_use]
    pub fn feeding_nutrients(&self) -> &[String] {
        if self.active_nutrients.is_empty() {
            &self.base_nutrients
        } else {
            &self.active_nutrients
        }
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.season_key == STATIC_SEASON_KEY
    }
}

/// Resolves the environment for 1-based `generation`.
#[must_use]
pub fn resolve_environment(
    generation: usize,
    nutrients: &[String],
    config: &EnvironmentConfig,
    state: &ResourceState,
) -> EnvironmentSnapshot {
    if !config.enabled || config.seasons.is_empty() || nutrients.is_empty() {
        return EnvironmentSnapshot::fixed(&config.mode, nutrients);
    }

    let step = generation.saturating_sub(1);
    let season_index = step % config.seasons.len();
    let season = &config.seasons[season_index];
    let dynamics = &config.resource_dynamics;

    let count = nutrients.len();
    let mut rotated = nutrients.to_vec();
    rotated.rotate_left(step % count);

    let active_count = ((count as f64 * season.focus_ratio).round() as usize).clamp(1, count);

    let stresses: Vec<f64> = rotated
        .iter()
        .map(|word| if dynamics.enabled { state.stress(word) } else { 0.0 })
        .collect();

    let mut ranked: Vec<usize> = (0..count).collect();
    ranked.sort_by_key(|&index| {
        let seasonal = if index < active_count { 1.0 } else { OFF_SEASON_WEIGHT };
        (Reverse(OrderedFloat(seasonal * (1.0 - stresses[index]))), index)
    });
    let mut selected = ranked[..active_count].to_vec();
    selected.sort_unstable();

    let active: Vec<String> = selected.iter().map(|&index| rotated[index].clone()).collect();
    let chosen: HashSet<usize> = selected.into_iter().collect();
    let dormant: Vec<String> = rotated
        .iter()
        .enumerate()
        .filter(|(index, _)| !chosen.contains(index))
        .map(|(_, word)| word.clone())
        .collect();
    let depleted: Vec<String> = rotated
        .iter()
        .zip(&stresses)
        .filter(|(_, stress)| round3(**stress) >= dynamics.depletion_level)
        .map(|(word, _)| word.clone())
        .collect();

    let active_stress: Vec<f64> = active.iter().map(|word| state.stress(word)).collect();
    let resource_pressure = round3(mean(&active_stress));
    let pressure_factor = if dynamics.enabled {
        1.0 - resource_pressure * dynamics.metabolism_impact
    } else {
        1.0
    };
    let metabolism_multiplier =
        round3((season.metabolism_multiplier * pressure_factor).clamp(0.7, 1.3));

    EnvironmentSnapshot {
        mode: config.mode.clone(),
        season_key: season.key.clone(),
        season_label: season.label.clone(),
        season_index,
        focus_ratio: season.focus_ratio,
        metabolism_multiplier,
        base_nutrients: nutrients.to_vec(),
        active_nutrients: active,
        dormant_nutrients: dormant,
        depleted_nutrients: depleted,
        resource_levels: state.levels(nutrients),
        resource_pressure,
    }
}
