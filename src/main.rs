use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tagbench::dataset::{
    self, DEFAULT_MIN_TAGS, DEFAULT_SEED, DatasetError, load_dataset, write_curated,
};
use tagbench::engine::{CommandRunnerBuilder, EngineRunner, ModelKind};
use tagbench::eval::{KeyNormalizer, ScoreAccumulator, extract};
use tagbench::models::IgnoredKeys;

/// tagbench - evaluation harness for tag-recommendation engines
#[derive(Parser)]
#[command(name = "tagbench")]
#[command(about = "Evaluate tag-recommendation engines against OSM ground truth")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Filter a raw dataset by tag richness and assign seeded hint tags
    Curate(CurateCommand),
    /// Run the engine over a curated dataset and report precision/recall/F1
    Score(ScoreCommand),
    /// Print ground-truth tag-count statistics for a dataset
    Stats(StatsCommand),
}

/// Curate a raw ground-truth dataset
#[derive(Parser)]
struct CurateCommand {
    /// Path to the raw input CSV
    #[arg(long, value_name = "PATH", default_value = "restaurants_antwerp.csv")]
    csv: PathBuf,

    /// Path the curated CSV is written to
    #[arg(long, value_name = "PATH", default_value = "restaurants_with_hints.csv")]
    out: PathBuf,

    /// Minimum number of ground-truth tags a record needs to be kept
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MIN_TAGS)]
    min_tags: usize,

    /// Seed for the hint-selection random stream
    #[arg(long, value_name = "SEED", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Tag keys treated as metadata and never counted, hinted, or scored
    #[arg(long, value_name = "KEY", num_args = 0..,
          default_values_t = ["name", "amenity", "osm_id", "osm_type"].map(String::from))]
    ignore_tags: Vec<String>,
}

/// Score an engine variant against a dataset
#[derive(Parser)]
struct ScoreCommand {
    /// Path to the input CSV (curated, when scoring with hints)
    #[arg(long, value_name = "PATH", default_value = "restaurants_with_hints.csv")]
    csv: PathBuf,

    /// Engine variant to evaluate (A or C)
    #[arg(long, value_name = "MODEL")]
    model: ModelKind,

    /// Maximum number of rows to evaluate (default: all)
    #[arg(long, value_name = "N")]
    max: Option<usize>,

    /// Category every record in the dataset belongs to
    #[arg(long, value_name = "CATEGORY", default_value = "restaurant")]
    category: String,

    /// Reveal each record's hint tag to the engine and exclude it from truth
    #[arg(long)]
    with_hints: bool,

    /// Engine command line, program plus fixed arguments
    /// (default: "go run run_models.go", or $TAGBENCH_ENGINE_CMD)
    #[arg(long, value_name = "CMD")]
    engine_cmd: Option<String>,

    /// Working directory the engine is launched in
    #[arg(long, value_name = "DIR")]
    engine_dir: Option<PathBuf>,

    /// Per-invocation timeout in seconds (default: 20 for A, 30 for C)
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Tag keys treated as metadata and excluded from scoring
    #[arg(long, value_name = "KEY", num_args = 0..,
          default_values_t = ["name", "amenity", "osm_id", "osm_type"].map(String::from))]
    ignore_tags: Vec<String>,
}

/// Print dataset statistics
#[derive(Parser)]
struct StatsCommand {
    /// Path to the input CSV
    #[arg(long, value_name = "PATH", default_value = "restaurants_antwerp.csv")]
    csv: PathBuf,

    /// Tag keys treated as metadata and not counted as ground truth
    #[arg(long, value_name = "KEY", num_args = 0..,
          default_values_t = ["name", "amenity", "osm_id", "osm_type"].map(String::from))]
    ignore_tags: Vec<String>,
}

fn main() {
    // Pick up TAGBENCH_ENGINE_CMD and friends from a local .env if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Curate(cmd) => handle_curate(cmd),
        Commands::Score(cmd) => handle_score(cmd),
        Commands::Stats(cmd) => handle_stats(cmd),
    };

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are problems with the supplied data or an evaluation run that
/// produced nothing to score; internal errors are everything else.
fn is_user_error(error: &anyhow::Error) -> bool {
    if error.downcast_ref::<DatasetError>().is_some() {
        return true;
    }
    error.to_string().contains("no records were scored")
}

/// Handles the curate command: richness filter, then seeded hint selection,
/// then write.
fn handle_curate(cmd: &CurateCommand) -> Result<()> {
    let ignored = IgnoredKeys::new(cmd.ignore_tags.iter().cloned());

    println!("Loading {}...", cmd.csv.display());
    let dataset = load_dataset(&cmd.csv)
        .with_context(|| format!("Failed to load dataset from {}", cmd.csv.display()))?;
    println!("  -> {} rows loaded.", dataset.len());

    println!("Keeping rows with at least {} ground-truth tags...", cmd.min_tags);
    let mut curated = dataset::filter_by_min_tags(dataset, cmd.min_tags, &ignored);

    println!("Selecting random hint tags (seed {})...", cmd.seed);
    dataset::assign_hints(&mut curated, cmd.seed, &ignored);

    println!("Writing {} rows to {}", curated.len(), cmd.out.display());
    write_curated(&cmd.out, &curated)
        .with_context(|| format!("Failed to write curated dataset to {}", cmd.out.display()))?;
    println!("Done.");

    Ok(())
}

/// Handles the score command by configuring the engine runner and running
/// the evaluation loop.
fn handle_score(cmd: &ScoreCommand) -> Result<()> {
    let mut builder = CommandRunnerBuilder::new();
    if let Some(line) = &cmd.engine_cmd {
        builder = builder.command_line(line);
    }
    if let Some(dir) = &cmd.engine_dir {
        builder = builder.current_dir(dir);
    }
    if let Some(secs) = cmd.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let runner = builder.build().context("Failed to configure engine command")?;

    execute_score(cmd, &runner)
}

/// Runs the evaluation loop with a provided engine runner.
///
/// This function is separated from `handle_score` to allow testing with
/// mock engines.
fn execute_score(cmd: &ScoreCommand, runner: &dyn EngineRunner) -> Result<()> {
    println!("Loading data from {}...", cmd.csv.display());
    let dataset = load_dataset(&cmd.csv)
        .with_context(|| format!("Failed to load dataset from {}", cmd.csv.display()))?;
    println!("  -> {} rows loaded.", dataset.len());

    let mut ignored = IgnoredKeys::new(cmd.ignore_tags.iter().cloned());
    if cmd.model == ModelKind::C {
        // the C input leads with the bare category token, which the engine
        // tends to echo back as a recommendation
        ignored.insert(cmd.category.clone());
    }

    let total = dataset.len();
    let mut acc = ScoreAccumulator::new();

    for (idx, row) in dataset.rows().iter().enumerate() {
        if let Some(max) = cmd.max
            && idx >= max
        {
            break;
        }

        let record = row.record();
        let Some(name) = record.trimmed_name() else {
            eprintln!("[{}/{}] skipped: missing name", idx + 1, total);
            continue;
        };

        let hint = if cmd.with_hints {
            match row.hint() {
                Some(hint) => Some(hint),
                None => {
                    eprintln!("[{}/{}] {} skipped: no hint tag", idx + 1, total, name);
                    continue;
                }
            }
        } else {
            None
        };

        match hint {
            Some(hint) => println!("\n[{}/{}] {} | hint: {}", idx + 1, total, name, hint),
            None => println!("\n[{}/{}] {}", idx + 1, total, name),
        }

        let input = format_engine_input(cmd.model, &cmd.category, name, hint);
        let output = match runner.run(&input, cmd.model) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("  engine failure: {e}");
                continue;
            }
        };

        let predicted: HashSet<String> =
            extract(cmd.model, &output, &ignored).into_iter().collect();
        let truth: HashSet<String> = record
            .ground_truth_keys(&ignored, hint)
            .map(KeyNormalizer::normalize)
            .filter(|k| !k.is_empty() && !ignored.contains(k))
            .collect();

        println!("  Predicted: {:?}", sorted(&predicted));
        println!("  Truth:     {:?}", sorted(&truth));

        if !acc.record(&truth, &predicted) {
            eprintln!("  skipped: no ground truth after exclusions");
        }
    }

    println!(
        "\n=== Model {} Evaluation ({}) ===",
        cmd.model,
        cmd.csv.display()
    );
    match acc.finish() {
        Some(metrics) => {
            println!("{metrics}");
            Ok(())
        }
        None => anyhow::bail!("no records were scored"),
    }
}

/// Handles the stats command.
fn handle_stats(cmd: &StatsCommand) -> Result<()> {
    let ignored = IgnoredKeys::new(cmd.ignore_tags.iter().cloned());

    let dataset = load_dataset(&cmd.csv)
        .with_context(|| format!("Failed to load dataset from {}", cmd.csv.display()))?;
    println!("Loaded {} rows from {}", dataset.len(), cmd.csv.display());

    match dataset::tag_count_stats(&dataset, &ignored) {
        Some(stats) => {
            println!(
                "Average number of ground-truth tags per row: {:.2}",
                stats.mean
            );
            println!("Minimum tags: {}, Maximum tags: {}", stats.min, stats.max);
            Ok(())
        }
        None => anyhow::bail!("dataset is empty"),
    }
}

/// Formats the engine input string for one record.
///
/// Model A takes a comma-joined list of `amenity=<category>` plus free
/// tokens; model C takes a bare comma-joined list starting with the
/// category name.
fn format_engine_input(model: ModelKind, category: &str, name: &str, hint: Option<&str>) -> String {
    let mut parts = match model {
        ModelKind::A => vec![format!("amenity={category}")],
        ModelKind::C => vec![category.to_string()],
    };
    if !name.is_empty() {
        parts.push(name.to_string());
    }
    if let Some(hint) = hint {
        parts.push(hint.to_string());
    }
    parts.join(",")
}

fn sorted(set: &HashSet<String>) -> Vec<&String> {
    let mut keys: Vec<&String> = set.iter().collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tagbench::engine::EngineError;

    #[test]
    fn model_a_input_includes_category_pair_name_and_hint() {
        let input = format_engine_input(ModelKind::A, "restaurant", "Cafe X", Some("cuisine"));
        assert_eq!(input, "amenity=restaurant,Cafe X,cuisine");
    }

    #[test]
    fn model_a_input_without_hint() {
        let input = format_engine_input(ModelKind::A, "restaurant", "Cafe X", None);
        assert_eq!(input, "amenity=restaurant,Cafe X");
    }

    #[test]
    fn model_c_input_starts_with_bare_category() {
        let input = format_engine_input(ModelKind::C, "restaurant", "Cafe X", Some("cuisine"));
        assert_eq!(input, "restaurant,Cafe X,cuisine");
    }

    struct CannedEngine {
        output: String,
    }

    impl EngineRunner for CannedEngine {
        fn run(&self, _input: &str, _model: ModelKind) -> Result<String, EngineError> {
            Ok(self.output.clone())
        }
    }

    struct FailingEngine;

    impl EngineRunner for FailingEngine {
        fn run(&self, _input: &str, _model: ModelKind) -> Result<String, EngineError> {
            Err(EngineError::Timeout(Duration::from_secs(20)))
        }
    }

    fn score_command(csv: PathBuf, with_hints: bool) -> ScoreCommand {
        ScoreCommand {
            csv,
            model: ModelKind::A,
            max: None,
            category: "restaurant".to_string(),
            with_hints,
            engine_cmd: None,
            engine_dir: None,
            timeout_secs: None,
            ignore_tags: ["name", "amenity", "osm_id", "osm_type"]
                .map(String::from)
                .to_vec(),
        }
    }

    fn write_temp_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    #[test]
    fn execute_score_succeeds_with_a_canned_engine() {
        let file = write_temp_csv(
            "osm_type,osm_id,name,cuisine,phone,hint_tag\n\
             node,1,Cafe X,belgian,123,cuisine\n",
        );
        let engine = CannedEngine {
            output: "[0] phone\n".to_string(),
        };

        let cmd = score_command(file.path().to_path_buf(), true);
        assert!(execute_score(&cmd, &engine).is_ok());
    }

    #[test]
    fn execute_score_fails_when_every_record_is_skipped() {
        // no names at all: nothing can be scored
        let file = write_temp_csv(
            "osm_type,osm_id,name,cuisine,hint_tag\n\
             node,1,,belgian,cuisine\n",
        );
        let engine = CannedEngine {
            output: "[0] cuisine\n".to_string(),
        };

        let cmd = score_command(file.path().to_path_buf(), true);
        let err = execute_score(&cmd, &engine).unwrap_err();
        assert!(err.to_string().contains("no records were scored"));
        assert!(is_user_error(&err));
    }

    #[test]
    fn execute_score_survives_engine_failures() {
        // both rows fail to invoke; the batch itself must not abort
        let file = write_temp_csv(
            "osm_type,osm_id,name,cuisine,phone,hint_tag\n\
             node,1,Cafe X,belgian,123,cuisine\n\
             node,2,Cafe Y,french,456,phone\n",
        );

        let cmd = score_command(file.path().to_path_buf(), true);
        let err = execute_score(&cmd, &FailingEngine).unwrap_err();
        assert!(err.to_string().contains("no records were scored"));
    }

    #[test]
    fn dataset_errors_are_user_errors() {
        let err = anyhow::Error::new(DatasetError::MissingColumn("osm_type"));
        assert!(is_user_error(&err));
    }
}
