//! Parent selection and population sizing between generations.

use std::collections::HashSet;

use crate::config::{EvolutionConfig, LifeConfig};
use crate::numeric::round_half_up;
use crate::rng::SeededRng;

/// Hard ceiling on any computed population.
pub const MAX_POPULATION: usize = 10_000;
const FLOAT_SLACK: f64 = 1e-9;

/// Anything that can stand in the parent pool.
pub trait Candidate {
    fn candidate_id(&self) -> &str;
}

impl<T: Candidate + ?Sized> Candidate for &T {
    fn candidate_id(&self) -> &str {
        (**self).candidate_id()
    }
}

/// Elite and diversity sizes for a ranked source of `len` candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSizes {
    pub elite: usize,
    pub diversity: usize,
}

impl SelectionSizes {
    #[must_use]
    pub fn for_source(len: usize, config: &EvolutionConfig) -> Self {
        if len == 0 {
            return Self {
                elite: 0,
                diversity: 0,
            };
        }
        let n = len as f64;
        let elite_floor = (config.min_elite as usize).min(len);
        let elite = (round_half_up(n * config.elite_ratio) as usize).clamp(elite_floor, len);

        let remainder = len - elite;
        let diversity_floor = if remainder > 0 {
            config.min_diversity as usize
        } else {
            0
        };
        // The upper bound wins when the floor exceeds what is left.
        let diversity = (round_half_up(n * config.diversity_ratio) as usize)
            .max(diversity_floor)
            .min(remainder);
        Self { elite, diversity }
    }
}

/// Builds the parent pool from a source ranked best-first.
///
/// Keeps the top `elite` candidates, samples `diversity` more without
/// replacement from the rest, and tops the pool up with random distinct picks
/// until it holds two parents or the whole source.
pub fn select_parents<T>(source: &[T], config: &EvolutionConfig, rng: &mut SeededRng) -> Vec<T>
where
    T: Candidate + Clone,
{
    if source.is_empty() {
        return Vec::new();
    }

    let sizes = SelectionSizes::for_source(source.len(), config);
    let (elite, remainder) = source.split_at(sizes.elite);
    let candidates = if remainder.is_empty() { source } else { remainder };
    let diversity = sample_without_replacement(candidates, sizes.diversity, rng);

    let mut seen = HashSet::new();
    let mut pool: Vec<T> = elite
        .iter()
        .cloned()
        .chain(diversity)
        .filter(|candidate| seen.insert(candidate.candidate_id().to_string()))
        .collect();

    if pool.len() >= 2 || source.len() <= 1 {
        return pool;
    }

    while pool.len() < 2 && pool.len() < source.len() {
        let Some(candidate) = rng.pick(source) else {
            break;
        };
        if seen.insert(candidate.candidate_id().to_string()) {
            pool.push(candidate.clone());
        }
    }
    pool
}

/// Uniform sample of `count` items without replacement, in draw order.
pub fn sample_without_replacement<T: Clone>(
    items: &[T],
    count: usize,
    rng: &mut SeededRng,
) -> Vec<T> {
    if count == 0 || items.is_empty() {
        return Vec::new();
    }
    let mut bucket = items.to_vec();
    let total = count.min(bucket.len());
    let mut picks = Vec::with_capacity(total);
    for _ in 0..total {
        let index = rng.index(bucket.len());
        picks.push(bucket.remove(index));
    }
    picks
}

/// Aggregate outcome of a generation that drives the next population size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationSignal {
    pub total: usize,
    pub living: usize,
    /// Mean post-settlement energy of the living.
    pub mean_energy: f64,
    /// Mean score of the living.
    pub mean_score: f64,
}

/// Smallest and largest population the life config allows for `initial`.
#[must_use]
pub fn population_bounds(initial: usize, life: &LifeConfig) -> (usize, usize) {
    let n = initial as f64;
    let minimum = ((n * life.min_population_ratio - FLOAT_SLACK).ceil().max(1.0) as usize)
        .min(MAX_POPULATION);
    let maximum = ((n * life.max_population_ratio + FLOAT_SLACK).floor() as usize)
        .max(minimum)
        .min(MAX_POPULATION);
    (minimum, maximum)
}

/// Size of the next generation.
#[must_use]
pub fn estimate_next_population(
    initial: usize,
    signal: &PopulationSignal,
    life: &LifeConfig,
) -> usize {
    if !life.variable_population_enabled {
        return initial;
    }
    let (minimum, maximum) = population_bounds(initial, life);
    if signal.living == 0 {
        return minimum;
    }

    let survival = signal.living as f64 / signal.total.max(1) as f64;
    let growth = 0.45 * (signal.mean_energy / life.max_energy)
        + 0.35 * (signal.mean_score / 100.0)
        + 0.2 * survival;
    let target = round_half_up(initial as f64 * (0.65 + growth));
    if target.is_finite() {
        (target.max(0.0) as usize).clamp(minimum, maximum)
    } else {
        initial.clamp(minimum, maximum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(String);

    impl Candidate for Entry {
        fn candidate_id(&self) -> &str {
            &self.0
        }
    }

    fn entries(count: usize) -> Vec<Entry> {
        (1..=count).map(|index| Entry(format!("g1-i{index}"))).collect()
    }

    #[test]
    fn pool_of_ten_keeps_two_elite_and_one_diverse() {
        let sizes = SelectionSizes::for_source(10, &EvolutionConfig::default());
        assert_eq!(sizes, SelectionSizes { elite: 2, diversity: 1 });

        let source = entries(10);
        let mut rng = SeededRng::new(4);
        let pool = select_parents(&source, &EvolutionConfig::default(), &mut rng);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool[0], source[0]);
        assert_eq!(pool[1], source[1]);
        assert!(source[2..].contains(&pool[2]));
    }

    #[test]
    fn small_sources_clamp_sizes() {
        let config = EvolutionConfig::default();
        assert_eq!(
            SelectionSizes::for_source(1, &config),
            SelectionSizes { elite: 1, diversity: 0 }
        );
        assert_eq!(
            SelectionSizes::for_source(2, &config),
            SelectionSizes { elite: 2, diversity: 0 }
        );
        assert_eq!(
            SelectionSizes::for_source(0, &config),
            SelectionSizes { elite: 0, diversity: 0 }
        );
    }

    #[test]
    fn diversity_floor_loses_to_remainder() {
        let config = EvolutionConfig {
            min_elite: 3,
            min_diversity: 5,
            ..EvolutionConfig::default()
        };
        assert_eq!(
            SelectionSizes::for_source(4, &config),
            SelectionSizes { elite: 3, diversity: 1 }
        );
    }

    #[test]
    fn single_elite_is_topped_up_to_two() {
        let config = EvolutionConfig {
            elite_ratio: 0.0,
            diversity_ratio: 0.0,
            min_elite: 1,
            min_diversity: 0,
            ..EvolutionConfig::default()
        };
        let source = entries(5);
        let mut rng = SeededRng::new(99);
        let pool = select_parents(&source, &config, &mut rng);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0], source[0]);
        assert_ne!(pool[1], source[0]);
    }

    #[test]
    fn lone_source_returns_itself() {
        let source = entries(1);
        let mut rng = SeededRng::new(1);
        let pool = select_parents(&source, &EvolutionConfig::default(), &mut rng);
        assert_eq!(pool, source);
        assert!(select_parents::<Entry>(&[], &EvolutionConfig::default(), &mut rng).is_empty());
    }

    #[test]
    fn sampling_never_repeats() {
        let items: Vec<u32> = (0..20).collect();
        let mut rng = SeededRng::new(12);
        let mut picks = sample_without_replacement(&items, 50, &mut rng);
        assert_eq!(picks.len(), 20);
        picks.sort_unstable();
        assert_eq!(picks, items);
    }

    #[test]
    fn bounds_follow_ratios() {
        let life = LifeConfig::default();
        assert_eq!(population_bounds(10, &life), (6, 16));
        assert_eq!(population_bounds(20, &life), (11, 32));
        assert_eq!(population_bounds(1, &life), (1, 1));
        assert_eq!(population_bounds(100_000, &life).1, MAX_POPULATION);
    }

    #[test]
    fn extinction_shrinks_to_minimum() {
        let life = LifeConfig::default();
        let signal = PopulationSignal {
            total: 10,
            living: 0,
            mean_energy: 0.0,
            mean_score: 0.0,
        };
        assert_eq!(estimate_next_population(10, &signal, &life), 6);
    }

    #[test]
    fn thriving_generation_grows() {
        let life = LifeConfig::default();
        let signal = PopulationSignal {
            total: 10,
            living: 10,
            mean_energy: 150.0,
            mean_score: 100.0,
        };
        // 10 * (0.65 + 1.0) = 16.5 rounds to 17, capped at 16.
        assert_eq!(estimate_next_population(10, &signal, &life), 16);

        let fixed = LifeConfig {
            variable_population_enabled: false,
            ..life
        };
        assert_eq!(estimate_next_population(10, &signal, &fixed), 10);
    }

    #[test]
    fn middling_generation_holds_steady() {
        let life = LifeConfig::default();
        let signal = PopulationSignal {
            total: 20,
            living: 10,
            mean_energy: 75.0,
            mean_score: 40.0,
        };
        // growth = 0.225 + 0.14 + 0.1 → 20 * 1.115 = 22.3
        assert_eq!(estimate_next_population(20, &signal, &life), 22);
    }
}
