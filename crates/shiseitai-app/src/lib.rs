//! Support code for the `shiseitai` binary: config files, run ids, the
//! persisted run file and terminal summaries.

use chrono::{DateTime, SecondsFormat, Utc};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use shiseitai_core::lenient;
use shiseitai_core::{
    Biome, RawEnvironmentConfig, RawEvolutionConfig, RawLifeConfig, RawPoemStyleConfig,
    RequestError, SeedInput, SimulationOutput, SimulationRequest,
};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Version tag written into every run file.
pub const RUN_FILE_SCHEMA: &str = "v1";

/// Errors surfaced by the app layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode run output")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
}

/// Optional JSON file holding the four raw config sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfigFile {
    #[serde(deserialize_with = "lenient::or_default")]
    pub evolution: RawEvolutionConfig,
    #[serde(deserialize_with = "lenient::or_default")]
    pub poem_style: RawPoemStyleConfig,
    #[serde(deserialize_with = "lenient::or_default")]
    pub environment: RawEnvironmentConfig,
    #[serde(deserialize_with = "lenient::or_default")]
    pub life: RawLifeConfig,
}

impl RunConfigFile {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AppError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved inputs for one run, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub run_id: String,
    pub population: usize,
    pub generations: usize,
    pub nutrients: Vec<String>,
    pub toxic_words: Vec<String>,
    pub seed: Option<SeedInput>,
    pub config: RunConfigFile,
}

impl RunPlan {
    /// Validates and converts into an engine request.
    pub fn into_request(self) -> Result<SimulationRequest, AppError> {
        let request = SimulationRequest {
            run_id: self.run_id,
            population_size: self.population,
            generation_count: self.generations,
            nutrients: self.nutrients,
            toxic_words: self.toxic_words,
            seed: self.seed,
            evolution: self.config.evolution,
            poem_style: self.config.poem_style,
            environment: self.config.environment,
            life: self.config.life,
        };
        request.validate()?;
        Ok(request)
    }
}

/// `run-<timestamp>-<suffix>` with `:` and `.` in the timestamp replaced by `-`.
#[must_use]
pub fn build_run_id(now: DateTime<Utc>, suffix: usize) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("run-{stamp}-{suffix:03}")
}

/// A finished run as persisted to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFile {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    pub population: usize,
    pub generation_count: usize,
    pub nutrients: Vec<String>,
    pub toxic_words: Vec<String>,
    pub biome: Biome,
    #[serde(flatten)]
    pub output: SimulationOutput,
}

impl RunFile {
    #[must_use]
    pub fn new(
        request: &SimulationRequest,
        output: SimulationOutput,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: RUN_FILE_SCHEMA.to_string(),
            created_at,
            population: request.population_size,
            generation_count: request.generation_count,
            biome: Biome::infer(&request.nutrients),
            nutrients: request.nutrients.clone(),
            toxic_words: request.toxic_words.clone(),
            output,
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| AppError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), run_id = %self.output.run_id, "run file written");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AppError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-generation report with the final winners' poems.
#[must_use]
pub fn render_summary(output: &SimulationOutput) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}  {} {}",
        "run".green().bold(),
        output.run_id,
        "seed".green().bold(),
        output.seed
    );
    let _ = writeln!(
        out,
        "{:>4}  {:<8} {:>5} {:>6} {:>6} {:>8}  {}",
        "GEN".bold().cyan(),
        "SEASON".bold().cyan(),
        "SIZE".bold().cyan(),
        "ALIVE".bold().cyan(),
        "BEST".bold().cyan(),
        "MEAN".bold().cyan(),
        "ACTIVE".bold().cyan()
    );
    let _ = writeln!(out, "{}", "-".repeat(72).dimmed());
    for summary in &output.generations {
        let env = &summary.environment;
        let _ = writeln!(
            out,
            "{:>4}  {:<8} {:>5} {:>6} {:>6.1} {:>8.2}  {}",
            summary.generation,
            env.season_key,
            summary.records.len(),
            summary.living_count,
            summary.best_score().unwrap_or(0.0),
            summary.mean_score(),
            env.active_nutrients.join("、")
        );
        if !env.depleted_nutrients.is_empty() {
            let _ = writeln!(
                out,
                "      {} {}",
                "depleted".yellow(),
                env.depleted_nutrients.join("、")
            );
        }
    }

    if let Some(last) = output.final_generation() {
        for (rank, winner) in last.winners.iter().enumerate() {
            let reasons: Vec<&str> = winner
                .diagnosis
                .reasons
                .iter()
                .map(|reason| reason.as_str())
                .collect();
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{} {} ({:.1}) [{}]",
                format!("#{}", rank + 1).bold(),
                winner.individual_id,
                winner.score,
                reasons.join(", ").dimmed()
            );
            for line in winner.text.lines() {
                let _ = writeln!(out, "  {line}");
            }
        }
    }
    out
}

/// One line per preset: key and words.
#[must_use]
pub fn render_presets() -> String {
    Biome::ALL
        .iter()
        .map(|biome| format!("{:<8} {}", biome.key().bold(), biome.nutrients().join("、")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shiseitai_core::run_simulation;

    fn plan() -> RunPlan {
        RunPlan {
            run_id: "run-test".to_string(),
            population: 6,
            generations: 2,
            nutrients: Biome::Garden.nutrient_list(),
            toxic_words: vec!["腐食".to_string()],
            seed: Some(SeedInput::from(9_u32)),
            config: RunConfigFile::default(),
        }
    }

    #[test]
    fn run_ids_replace_separators() {
        let now = Utc
            .with_ymd_and_hms(2026, 10, 19, 8, 5, 3)
            .single()
            .expect("valid timestamp");
        assert_eq!(build_run_id(now, 1), "run-2026-10-19T08-05-03-000Z-001");
        assert_eq!(build_run_id(now, 42), "run-2026-10-19T08-05-03-000Z-042");
    }

    #[test]
    fn plans_validate_before_running() {
        assert!(plan().into_request().is_ok());
        let empty = RunPlan {
            nutrients: Vec::new(),
            ..plan()
        };
        assert!(matches!(
            empty.into_request(),
            Err(AppError::InvalidRequest(RequestError::EmptyNutrients))
        ));
    }

    #[test]
    fn config_file_sections_are_optional() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"poemStyle": {"particleRate": 0.4}}"#).expect("write");
        let config = RunConfigFile::load(&path).expect("load");
        assert_eq!(config.poem_style.particle_rate, Some(0.4));
        assert_eq!(config.life, RawLifeConfig::default());

        fs::write(&path, r#"{"life": "long", "evolution": {"eliteRatio": "high"}}"#)
            .expect("write");
        let config = RunConfigFile::load(&path).expect("wrong types are tolerated");
        assert_eq!(config, RunConfigFile::default());

        fs::write(&path, "{not json").expect("write");
        assert!(matches!(RunConfigFile::load(&path), Err(AppError::Parse { .. })));
        let missing = dir.path().join("missing.json");
        assert!(matches!(RunConfigFile::load(&missing), Err(AppError::Read { .. })));
    }

    #[test]
    fn run_files_round_trip() {
        let request = plan().into_request().expect("request");
        let output = run_simulation(&request);
        let created_at = Utc
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("valid timestamp");
        let file = RunFile::new(&request, output, created_at);
        assert_eq!(file.biome, Biome::Garden);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        file.write(&path).expect("write run file");
        let restored = RunFile::read(&path).expect("read run file");
        assert_eq!(restored, file);
    }

    #[test]
    fn summary_lists_every_generation() {
        let request = plan().into_request().expect("request");
        let output = run_simulation(&request);
        let summary = render_summary(&output);
        assert!(summary.contains("run-test"));
        let winner = &output.generations[1].winners[0];
        assert!(summary.contains(&winner.individual_id));
        assert!(render_presets().contains("防波堤"));
    }
}
