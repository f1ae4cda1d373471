//! Generation loop: environment, evaluation, ranking, resource update, breeding.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::{
    EnvironmentConfig, EvolutionConfig, LifeConfig, PoemStyleConfig, RawEnvironmentConfig,
    RawEvolutionConfig, RawLifeConfig, RawPoemStyleConfig,
};
use crate::diagnosis::{Diagnosis, DiagnosisInput, DiagnosisReason, ScoreBreakdown, diagnose};
use crate::energy::{EnergyBalance, birth_energy, settle_energy};
use crate::environment::{EnvironmentSnapshot, ResourceState, resolve_environment};
use crate::genome::Genome;
use crate::lenient;
use crate::numeric::{mean, round3};
use crate::poem::{PoemUsage, generate_poem};
use crate::rng::{SeedInput, SeededRng};
use crate::selection::{Candidate, PopulationSignal, estimate_next_population, select_parents};

/// Number of top-ranked records reported as winners per generation.
pub const WINNERS_PER_GENERATION: usize = 3;

/// A living member of the current population, not yet evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Individual {
    pub id: String,
    pub parent_ids: Vec<String>,
    pub age: u32,
    pub energy: f64,
    pub genome: Genome,
}

/// Immutable outcome of evaluating one individual in one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub run_id: String,
    pub generation: usize,
    pub individual_id: String,
    pub parent_ids: Vec<String>,
    pub age: u32,
    pub genome: Genome,
    /// Nutrients offered to the generator this generation.
    pub nutrients: Vec<String>,
    pub toxic_words: Vec<String>,
    pub environment: EnvironmentSnapshot,
    pub text: String,
    pub usage: PoemUsage,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub diagnosis: Diagnosis,
    pub energy: EnergyBalance,
}

impl GenerationRecord {
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.diagnosis.is_dead
    }
}

impl Candidate for GenerationRecord {
    fn candidate_id(&self) -> &str {
        &self.individual_id
    }
}

/// One generation's ranked records plus aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub generation: usize,
    /// Sorted by score, best first; ties keep population order.
    pub records: Vec<GenerationRecord>,
    pub winners: Vec<GenerationRecord>,
    pub living_count: usize,
    pub dead_count: usize,
    pub environment: EnvironmentSnapshot,
}

impl GenerationSummary {
    #[must_use]
    pub fn best_score(&self) -> Option<f64> {
        self.records.first().map(|record| record.score)
    }

    #[must_use]
    pub fn mean_score(&self) -> f64 {
        let scores: Vec<f64> = self.records.iter().map(|record| record.score).collect();
        round3(mean(&scores))
    }
}

/// A top-ranked poem, kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specimen {
    pub id: String,
    pub generation: usize,
    pub rank: usize,
    pub title: String,
    pub individual_id: String,
    pub score: f64,
    pub text: String,
}

/// Precondition failures reported by [`SimulationRequest::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("at least one non-blank nutrient word is required")]
    EmptyNutrients,
    #[error("population size must be at least 1")]
    ZeroPopulation,
    #[error("generation count must be at least 1")]
    ZeroGenerations,
}

/// Everything needed to run one simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationRequest {
    pub run_id: String,
    pub population_size: usize,
    pub generation_count: usize,
    pub nutrients: Vec<String>,
    pub toxic_words: Vec<String>,
    pub seed: Option<SeedInput>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub evolution: RawEvolutionConfig,
    #[serde(deserialize_with = "lenient::or_default")]
    pub poem_style: RawPoemStyleConfig,
    #[serde(deserialize_with = "lenient::or_default")]
    pub environment: RawEnvironmentConfig,
    #[serde(deserialize_with = "lenient::or_default")]
    pub life: RawLifeConfig,
}

impl SimulationRequest {
    /// Request with default configs.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        population_size: usize,
        generation_count: usize,
        nutrients: Vec<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            population_size,
            generation_count,
            nutrients,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<SeedInput>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    #[must_use]
    pub fn with_toxic_words(mut self, toxic_words: Vec<String>) -> Self {
        self.toxic_words = toxic_words;
        self
    }

    /// Checks the caller-side preconditions. [`run_simulation`] itself never fails.
    pub fn validate(&self) -> Result<(), RequestError> {
        if unique_words(&self.nutrients).is_empty() {
            return Err(RequestError::EmptyNutrients);
        }
        if self.population_size == 0 {
            return Err(RequestError::ZeroPopulation);
        }
        if self.generation_count == 0 {
            return Err(RequestError::ZeroGenerations);
        }
        Ok(())
    }
}

/// Full result of a run, serializable without loss.
///
/// Serialized output also carries the derived `records` (flat, generation by
/// generation) and `finalGeneration` views; both are ignored when reading back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutput {
    pub run_id: String,
    pub seed: u32,
    pub generations: Vec<GenerationSummary>,
    pub specimens: Vec<Specimen>,
    pub evolution_config: EvolutionConfig,
    pub poem_style_config: PoemStyleConfig,
    pub environment_config: EnvironmentConfig,
    pub life_config: LifeConfig,
}

impl SimulationOutput {
    /// Every record of every generation, generation by generation in ranked order.
    pub fn records(&self) -> impl Iterator<Item = &GenerationRecord> {
        self.generations
            .iter()
            .flat_map(|generation| generation.records.iter())
    }

    #[must_use]
    pub fn final_generation(&self) -> Option<&GenerationSummary> {
        self.generations.last()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputView<'a> {
    run_id: &'a str,
    seed: u32,
    generations: &'a [GenerationSummary],
    records: Vec<&'a GenerationRecord>,
    final_generation: Option<&'a GenerationSummary>,
    specimens: &'a [Specimen],
    evolution_config: &'a EvolutionConfig,
    poem_style_config: &'a PoemStyleConfig,
    environment_config: &'a EnvironmentConfig,
    life_config: &'a LifeConfig,
}

impl Serialize for SimulationOutput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        OutputView {
            run_id: &self.run_id,
            seed: self.seed,
            generations: &self.generations,
            records: self.records().collect(),
            final_generation: self.final_generation(),
            specimens: &self.specimens,
            evolution_config: &self.evolution_config,
            poem_style_config: &self.poem_style_config,
            environment_config: &self.environment_config,
            life_config: &self.life_config,
        }
        .serialize(serializer)
    }
}

/// Trimmed, non-empty, de-duplicated words in first-seen order.
#[must_use]
pub fn unique_words(words: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    words
        .iter()
        .map(|word| word.trim())
        .filter(|word| !word.is_empty() && seen.insert(*word))
        .map(str::to_string)
        .collect()
}

/// Step-wise simulation owning the run's random stream and resource state.
pub struct Simulation {
    run_id: String,
    nutrients: Vec<String>,
    toxic_words: Vec<String>,
    initial_population: usize,
    generation_count: usize,
    rng: SeededRng,
    evolution: EvolutionConfig,
    style: PoemStyleConfig,
    environment: EnvironmentConfig,
    life: LifeConfig,
    population: Vec<Individual>,
    resources: ResourceState,
    generations: Vec<GenerationSummary>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("run_id", &self.run_id)
            .field("seed", &self.rng.seed())
            .field("generation", &self.generations.len())
            .field("generation_count", &self.generation_count)
            .field("population", &self.population.len())
            .finish()
    }
}

impl Simulation {
    /// Normalizes the request and seeds generation 1.
    #[must_use]
    pub fn new(request: &SimulationRequest) -> Self {
        let initial_population = coerce_positive(request.population_size, "population size");
        let generation_count = coerce_positive(request.generation_count, "generation count");
        let nutrients = unique_words(&request.nutrients);
        if nutrients.is_empty() {
            warn!(run_id = %request.run_id, "no usable nutrients; every poem will starve");
        }

        let mut rng = SeededRng::from_input(request.seed.as_ref());
        let life = LifeConfig::normalize(&request.life);
        let energy = round3(life.initial_energy);
        let population = (1..=initial_population)
            .map(|index| Individual {
                id: format!("g1-i{index}"),
                parent_ids: Vec::new(),
                age: 0,
                energy,
                genome: Genome::random(&mut rng),
            })
            .collect();

        Self {
            run_id: request.run_id.clone(),
            resources: ResourceState::new(&nutrients),
            nutrients,
            toxic_words: request.toxic_words.clone(),
            initial_population,
            generation_count,
            rng,
            evolution: EvolutionConfig::normalize(&request.evolution),
            style: PoemStyleConfig::normalize(&request.poem_style),
            environment: EnvironmentConfig::normalize(&request.environment),
            life,
            population,
            generations: Vec::with_capacity(generation_count),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u32 {
        self.rng.seed()
    }

    /// Number of generations evaluated so far.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generations.len()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.generations.len() >= self.generation_count
    }

    /// Individuals awaiting the next evaluation.
    #[must_use]
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    #[must_use]
    pub const fn resources(&self) -> &ResourceState {
        &self.resources
    }

    #[must_use]
    pub fn generations(&self) -> &[GenerationSummary] {
        &self.generations
    }

    /// Evaluates the next generation. Returns `None` once every generation has run.
    pub fn step(&mut self) -> Option<&GenerationSummary> {
        if self.is_finished() {
            return None;
        }
        let generation = self.generations.len() + 1;

        let environment =
            resolve_environment(generation, &self.nutrients, &self.environment, &self.resources);
        let records = self.stage_evaluate(generation, &environment);
        let summary = stage_rank(generation, records, environment);
        self.stage_resources(&summary);

        debug!(
            run_id = %self.run_id,
            generation,
            season = %summary.environment.season_key,
            population = summary.records.len(),
            living = summary.living_count,
            dead = summary.dead_count,
            best = summary.best_score().unwrap_or(0.0),
            pressure = summary.environment.resource_pressure,
            "generation evaluated"
        );

        if generation < self.generation_count {
            self.population = self.stage_breed(&summary, generation + 1);
        } else {
            self.population.clear();
        }
        self.generations.push(summary);
        self.generations.last()
    }

    /// Runs every remaining generation and assembles the output.
    #[must_use]
    pub fn finish(mut self) -> SimulationOutput {
        while self.step().is_some() {}
        let specimens = build_specimens(&self.generations);
        SimulationOutput {
            run_id: self.run_id,
            seed: self.rng.seed(),
            generations: self.generations,
            specimens,
            evolution_config: self.evolution,
            poem_style_config: self.style,
            environment_config: self.environment,
            life_config: self.life,
        }
    }

    fn stage_evaluate(
        &mut self,
        generation: usize,
        environment: &EnvironmentSnapshot,
    ) -> Vec<GenerationRecord> {
        let feeding = environment.feeding_nutrients().to_vec();
        let multiplier = environment.metabolism_multiplier;
        let population = std::mem::take(&mut self.population);

        population
            .into_iter()
            .map(|individual| {
                let poem = generate_poem(&individual.genome, &feeding, &self.style, &mut self.rng);
                let evaluation = diagnose(&DiagnosisInput {
                    text: &poem.text,
                    genome: &individual.genome,
                    usage: &poem.usage,
                    nutrients_expected: feeding.len(),
                    toxic_words: &self.toxic_words,
                    metabolism_multiplier: multiplier,
                });
                let settlement = settle_energy(
                    individual.energy,
                    evaluation.score,
                    evaluation.diagnosis.is_dead,
                    multiplier,
                    &self.life,
                );

                let mut diagnosis = evaluation.diagnosis;
                if settlement.starved {
                    diagnosis.is_dead = true;
                    diagnosis.reasons.push(DiagnosisReason::EnergyDepletion);
                }
                let score = if diagnosis.is_dead { 0.0 } else { evaluation.score };

                trace!(
                    generation,
                    individual = %individual.id,
                    score,
                    dead = diagnosis.is_dead,
                    energy = settlement.balance.after,
                    "record evaluated"
                );

                GenerationRecord {
                    run_id: self.run_id.clone(),
                    generation,
                    individual_id: individual.id,
                    parent_ids: individual.parent_ids,
                    age: individual.age,
                    genome: individual.genome,
                    nutrients: feeding.clone(),
                    toxic_words: self.toxic_words.clone(),
                    environment: environment.clone(),
                    text: poem.text,
                    usage: poem.usage,
                    score,
                    score_breakdown: evaluation.score_breakdown,
                    diagnosis,
                    energy: settlement.balance,
                }
            })
            .collect()
    }

    fn stage_resources(&mut self, summary: &GenerationSummary) {
        self.resources = self.resources.evolve(
            &self.nutrients,
            summary
                .records
                .iter()
                .map(|record| record.usage.used_nutrients.as_slice()),
            &summary.environment.active_nutrients,
            &self.environment.resource_dynamics,
        );
    }

    fn stage_breed(
        &mut self,
        summary: &GenerationSummary,
        next_generation: usize,
    ) -> Vec<Individual> {
        let records = &summary.records;
        let living: Vec<&GenerationRecord> =
            records.iter().filter(|record| !record.is_dead()).collect();
        let source: Vec<&GenerationRecord> = if living.is_empty() {
            records.iter().collect()
        } else {
            living.clone()
        };

        let selected = select_parents(&source, &self.evolution, &mut self.rng);
        let pool = if selected.is_empty() { source } else { selected };

        let energies: Vec<f64> = living.iter().map(|record| record.energy.after).collect();
        let scores: Vec<f64> = living.iter().map(|record| record.score).collect();
        let signal = PopulationSignal {
            total: records.len(),
            living: living.len(),
            mean_energy: mean(&energies),
            mean_score: mean(&scores),
        };
        let target = estimate_next_population(self.initial_population, &signal, &self.life);
        debug!(
            generation = next_generation,
            parents = pool.len(),
            target,
            "breeding next generation"
        );

        let settings = self.evolution.mutation();
        let mut children = Vec::with_capacity(target);
        for slot in 1..=target {
            let (Some(a), Some(b)) = (
                self.rng.pick(&pool).copied(),
                self.rng.pick(&pool).copied(),
            ) else {
                break;
            };
            let genome = a
                .genome
                .crossover(&b.genome, &mut self.rng)
                .mutate(settings, &mut self.rng);
            let energy = birth_energy(a.energy.after, b.energy.after, &self.life, &mut self.rng);
            children.push(Individual {
                id: format!("g{next_generation}-i{slot}"),
                parent_ids: vec![a.individual_id.clone(), b.individual_id.clone()],
                age: a.age.max(b.age) + 1,
                energy,
                genome,
            });
        }
        children
    }
}

fn stage_rank(
    generation: usize,
    mut records: Vec<GenerationRecord>,
    environment: EnvironmentSnapshot,
) -> GenerationSummary {
    // Stable: equal scores keep population order.
    records.sort_by_key(|record| Reverse(OrderedFloat(record.score)));
    let winners = records.iter().take(WINNERS_PER_GENERATION).cloned().collect();
    let living_count = records.iter().filter(|record| !record.is_dead()).count();
    GenerationSummary {
        generation,
        dead_count: records.len() - living_count,
        living_count,
        winners,
        records,
        environment,
    }
}

fn coerce_positive(value: usize, what: &'static str) -> usize {
    if value == 0 {
        warn!(field = what, "value must be at least 1; using 1");
        1
    } else {
        value
    }
}

/// Top three of every generation, ranked from 1.
#[must_use]
pub fn build_specimens(generations: &[GenerationSummary]) -> Vec<Specimen> {
    generations
        .iter()
        .flat_map(|summary| {
            summary.winners.iter().enumerate().map(move |(index, winner)| {
                let rank = index + 1;
                Specimen {
                    id: format!("specimen-g{}-w{rank}", summary.generation),
                    generation: summary.generation,
                    rank,
                    title: format!("Generation {} / Winner {rank}", summary.generation),
                    individual_id: winner.individual_id.clone(),
                    score: winner.score,
                    text: winner.text.clone(),
                }
            })
        })
        .collect()
}

/// Runs a whole simulation. Total: sizes below 1 are raised to 1.
#[must_use]
pub fn run_simulation(request: &SimulationRequest) -> SimulationOutput {
    Simulation::new(request).finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    fn request(seed: u32) -> SimulationRequest {
        SimulationRequest::new("run-test", 8, 3, words(&["雨", "灯", "石", "風"]))
            .with_seed(seed)
    }

    #[test]
    fn validate_reports_missing_inputs() {
        assert_eq!(request(1).validate(), Ok(()));
        let blank = SimulationRequest::new("r", 4, 2, words(&["  ", ""]));
        assert_eq!(blank.validate(), Err(RequestError::EmptyNutrients));
        let empty_population = SimulationRequest::new("r", 0, 2, words(&["雨"]));
        assert_eq!(empty_population.validate(), Err(RequestError::ZeroPopulation));
        let empty_run = SimulationRequest::new("r", 2, 0, words(&["雨"]));
        assert_eq!(empty_run.validate(), Err(RequestError::ZeroGenerations));
    }

    #[test]
    fn unique_words_trims_and_dedupes() {
        assert_eq!(
            unique_words(&words(&[" 雨 ", "灯", "雨", "", "灯 "])),
            words(&["雨", "灯"])
        );
    }

    #[test]
    fn stepping_advances_one_generation_at_a_time() {
        let mut simulation = Simulation::new(&request(21));
        assert_eq!(simulation.population().len(), 8);
        assert_eq!(simulation.population()[0].id, "g1-i1");

        let first = simulation.step().expect("generation 1");
        assert_eq!(first.generation, 1);
        assert_eq!(first.records.len(), 8);
        assert_eq!(first.winners.len(), 3);
        assert_eq!(first.living_count + first.dead_count, 8);
        assert!(
            first
                .records
                .windows(2)
                .all(|pair| pair[0].score >= pair[1].score)
        );

        assert_eq!(simulation.generation(), 1);
        assert!(!simulation.population().is_empty());
        assert!(simulation.population()[0].id.starts_with("g2-i"));
        assert_eq!(simulation.population()[0].parent_ids.len(), 2);

        simulation.step();
        simulation.step();
        assert!(simulation.is_finished());
        assert!(simulation.step().is_none());
        assert!(simulation.population().is_empty());
    }

    #[test]
    fn zero_sizes_are_coerced() {
        let output =
            run_simulation(&SimulationRequest::new("r", 0, 0, words(&["雨"])).with_seed(5u32));
        assert_eq!(output.generations.len(), 1);
        assert_eq!(output.generations[0].records.len(), 1);
        assert_eq!(output.records().count(), 1);
    }

    #[test]
    fn specimens_follow_winners() {
        let output = run_simulation(&request(77));
        assert_eq!(output.specimens.len(), 9);
        let first = &output.specimens[0];
        assert_eq!(first.id, "specimen-g1-w1");
        assert_eq!(first.rank, 1);
        assert_eq!(first.individual_id, output.generations[0].winners[0].individual_id);
        assert_eq!(output.specimens[8].id, "specimen-g3-w3");
        assert_eq!(
            output.final_generation().map(|summary| summary.generation),
            Some(3)
        );
    }

    #[test]
    fn bred_individuals_age_from_their_parents() {
        let output = run_simulation(&request(8));
        for record in output.generations[1].records.iter() {
            assert_eq!(record.age, 1);
            assert_eq!(record.parent_ids.len(), 2);
            assert!(record.parent_ids.iter().all(|id| id.starts_with("g1-i")));
        }
        for record in output.generations[0].records.iter() {
            assert_eq!(record.age, 0);
            assert!(record.parent_ids.is_empty());
        }
    }
}
