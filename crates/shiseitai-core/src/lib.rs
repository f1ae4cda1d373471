//! Core engine for Shiseitai, an evolving poem ecology.
//!
//! Genomes drive a procedural poem generator; a rule-based diagnostic scores
//! each poem; survivors are selected, crossed over and mutated into the next
//! generation under seasonal nutrient focus, resource stress and an energy
//! economy. A run is fully reproducible from its seed and performs no I/O.

pub mod biome;
pub mod config;
pub mod diagnosis;
pub mod energy;
pub mod environment;
pub mod evolution;
pub mod genome;
pub mod lenient;
pub mod numeric;
pub mod poem;
pub mod publish;
pub mod rng;
pub mod selection;

pub use biome::{
    Biome, DEFAULT_TOXIC_WORD_COUNT, TOXIC_WORD_POOL, draw_toxic_words, parse_word_list,
};
pub use config::{
    EnvironmentConfig, EvolutionConfig, LifeConfig, PoemStyleConfig, RawEnvironmentConfig,
    RawEvolutionConfig, RawLifeConfig, RawPoemStyleConfig, RawResourceDynamicsConfig, RawSeason,
    ResourceDynamicsConfig, Season,
};
pub use diagnosis::{Diagnosis, DiagnosisReason, ScoreBreakdown};
pub use energy::EnergyBalance;
pub use environment::{EnvironmentSnapshot, ResourceLevel, ResourceState};
pub use evolution::{
    GenerationRecord, GenerationSummary, Individual, RequestError, Simulation, SimulationOutput,
    SimulationRequest, Specimen, run_simulation,
};
pub use genome::{Genome, GenomeDraft, MutationSettings};
pub use poem::{Poem, PoemUsage, UsageStats};
pub use publish::PublishPayload;
pub use rng::{SeedInput, SeededRng};
