#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use claimsev::ServingContext;
use claimsev::batch::{create_progress_bar, read_record_lines, score_lines};
use claimsev::config::ServiceConfig;
use claimsev::encode::{EncodingKind, RawRecord};
use claimsev::stream::serve_lines;

#[derive(Parser)]
#[command(
    name = "claimsev",
    about = "Claim severity prediction with per-feature explanations",
    long_about = "Serves a trained tree-ensemble claim severity model: aligns raw records \
                 to the model's feature schema, predicts, and explains each prediction \
                 with TreeSHAP attributions."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ArtifactArgs {
    /// Directory holding the exported model, encodings, schema, metrics and reference curve
    #[arg(long, value_name = "DIR", default_value = ".")]
    artifacts: PathBuf,
}

#[derive(Args)]
struct BatchArgs {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    /// JSON-lines file with one record object per line
    #[arg(value_name = "RECORDS_JSONL")]
    records: PathBuf,

    /// Write replies here instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Worker threads (defaults to all cores)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and cross-check every artifact
    #[command(about = "Validate the artifacts directory and print a summary")]
    Check(ArtifactArgs),

    /// Score a single record
    #[command(about = "Predict and explain one record (JSON object file, or - for stdin)")]
    Predict {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        #[arg(value_name = "RECORD_JSON")]
        record: String,
    },

    /// Score a file of records in parallel
    #[command(about = "Predict and explain every record of a JSON-lines file")]
    Batch(BatchArgs),

    /// Answer requests on stdin, one JSON request per line
    #[command(about = "Serve GET / and POST /predict requests over stdin/stdout")]
    Serve(ArtifactArgs),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Check(args)) => run_check(&args.artifacts),
        Some(Commands::Predict { artifacts, record }) => run_predict(&artifacts.artifacts, &record),
        Some(Commands::Batch(args)) => run_batch(args),
        Some(Commands::Serve(args)) => run_serve(&args.artifacts),
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_context(artifact_dir: &Path) -> Result<ServingContext, Box<dyn Error>> {
    let config = ServiceConfig::load(artifact_dir)?;
    Ok(ServingContext::load(&config)?)
}

fn run_check(artifact_dir: &Path) -> Result<(), Box<dyn Error>> {
    let ctx = load_context(artifact_dir)?;
    let encodings = ctx.aligner().encodings();

    println!("Artifacts OK: {}", artifact_dir.display());
    println!("  features:          {}", ctx.schema().len());
    for kind in [EncodingKind::Binary, EncodingKind::Ordinal] {
        let label = format!("{} tables:", kind.describe());
        println!("  {label:<19}{}", encodings.table_count(kind));
    }
    println!(
        "  trees:             {} ({:?})",
        ctx.model().num_trees(),
        ctx.model().aggregation()
    );
    println!("  baseline:          {:.4}", ctx.explainer().expected_value());
    println!("  mae:               {:.4}", ctx.quality().mae);
    println!("  adjusted_r2:       {:.4}", ctx.quality().adjusted_r2);
    println!("  reference points:  {}", ctx.curve().len());
    Ok(())
}

fn run_predict(artifact_dir: &Path, source: &str) -> Result<(), Box<dyn Error>> {
    let text = if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(source)
            .map_err(|e| format!("Failed to read record file '{source}': {e}"))?
    };

    let record = match serde_json::from_str::<Value>(&text)? {
        Value::Object(object) => RawRecord::from(object),
        _ => return Err("The record must be a JSON object.".into()),
    };

    let ctx = load_context(artifact_dir)?;
    let response = ctx.predict(&record)?;
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &response)?;
    writeln!(stdout)?;
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<(), Box<dyn Error>> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let ctx = load_context(&args.artifacts.artifacts)?;

    let file = fs::File::open(&args.records).map_err(|e| {
        format!("Failed to open records file '{}': {e}", args.records.display())
    })?;
    let lines = read_record_lines(io::BufReader::new(file))?;
    log::info!("Scoring {} records from {}", lines.len(), args.records.display());

    let progress = create_progress_bar(lines.len() as u64, "Scoring records");
    let replies = score_lines(&ctx, &lines, &progress);

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(sink);
    for reply in &replies {
        serde_json::to_writer(&mut writer, reply)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    if let Some(path) = &args.output {
        log::info!("Replies written to {}", path.display());
    }
    Ok(())
}

fn run_serve(artifact_dir: &Path) -> Result<(), Box<dyn Error>> {
    let ctx = load_context(artifact_dir)?;
    log::info!("Serving requests on stdin");
    serve_lines(&ctx, io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}
