use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use shiseitai_app::{RunConfigFile, RunFile, RunPlan, build_run_id, render_presets, render_summary};
use shiseitai_core::{
    Biome, DEFAULT_TOXIC_WORD_COUNT, SeedInput, SeededRng, draw_toxic_words, parse_word_list,
    run_simulation,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "shiseitai",
    version,
    about = "Evolve a population of poems under seasons, nutrients and toxins"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation and print a per-generation summary.
    Run(RunArgs),
    /// List the built-in nutrient presets.
    Presets,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Initial population size.
    #[arg(
        long,
        env = "SHISEITAI_POPULATION",
        default_value_t = 30,
        value_parser = clap::value_parser!(u16).range(1..=300)
    )]
    population: u16,

    /// Number of generations to evolve.
    #[arg(
        long,
        env = "SHISEITAI_GENERATIONS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(1..=20)
    )]
    generations: u8,

    /// Nutrient words separated by commas, `、` or `，`.
    #[arg(long, env = "SHISEITAI_NUTRIENTS", conflicts_with = "preset")]
    nutrients: Option<String>,

    /// Nutrient preset (garden, work, cosmic, body, harbor, ritual).
    #[arg(long, env = "SHISEITAI_PRESET")]
    preset: Option<Biome>,

    /// Toxic words separated by commas, `、` or `，`.
    #[arg(long, env = "SHISEITAI_TOXIC", conflicts_with = "random_toxic")]
    toxic: Option<String>,

    /// Draw this many toxic words from the built-in pool when `--toxic` is absent.
    #[arg(long, default_value_t = DEFAULT_TOXIC_WORD_COUNT)]
    random_toxic: usize,

    /// Seed; leading digits are used and anything else falls back to the clock.
    #[arg(long, env = "SHISEITAI_SEED")]
    seed: Option<String>,

    /// JSON file with optional evolution, poemStyle, environment and life sections.
    #[arg(long, env = "SHISEITAI_CONFIG")]
    config: Option<PathBuf>,

    /// Write the full run as JSON to this path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the full output as JSON instead of the summary.
    #[arg(long)]
    json: bool,

    /// Override the generated run id.
    #[arg(long)]
    run_id: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::Presets => {
            println!("{}", render_presets());
            Ok(())
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: RunArgs) -> Result<()> {
    let now = Utc::now();
    let seed = args.seed.map(SeedInput::from);
    let nutrients = match (&args.nutrients, args.preset) {
        (Some(raw), _) => parse_word_list(raw),
        (None, preset) => preset.unwrap_or(Biome::Garden).nutrient_list(),
    };
    let toxic_words = match &args.toxic {
        Some(raw) => parse_word_list(raw),
        None => {
            let mut rng = SeededRng::from_input(seed.as_ref());
            draw_toxic_words(args.random_toxic, &mut rng)
        }
    };
    let config = match &args.config {
        Some(path) => RunConfigFile::load(path)
            .with_context(|| format!("loading config file {}", path.display()))?,
        None => RunConfigFile::default(),
    };

    let plan = RunPlan {
        run_id: args.run_id.unwrap_or_else(|| build_run_id(now, 1)),
        population: usize::from(args.population),
        generations: usize::from(args.generations),
        nutrients,
        toxic_words,
        seed,
        config,
    };
    let request = plan.into_request().context("invalid run request")?;
    info!(
        run_id = %request.run_id,
        population = request.population_size,
        generations = request.generation_count,
        "starting simulation"
    );

    let output = run_simulation(&request);
    let file = RunFile::new(&request, output, now);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&file).context("encoding run output")?
        );
    } else {
        println!(
            "{} {}  {} {}",
            "nutrients".green().bold(),
            request.nutrients.join("、"),
            "toxic".red().bold(),
            request.toxic_words.join("、")
        );
        print!("{}", render_summary(&file.output));
    }

    if let Some(path) = &args.output {
        file.write(path)
            .with_context(|| format!("writing run file {}", path.display()))?;
    }
    Ok(())
}
