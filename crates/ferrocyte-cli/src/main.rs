//! Ferrocyte: reference-based cell classification.
//! Entry point for the command-line binary.

mod config;
mod io;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferrocyte_engine::Classifier;

#[derive(Parser, Debug)]
#[command(name = "ferrocyte", version, about = "Label query cells by rank correlation against a labelled reference")]
struct Cli {
    /// Configuration file (defaults to $FERROCYTE_CONFIG or ./ferrocyte.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every sample of a query matrix
    Classify(ClassifyArgs),
    /// Resolve pairwise markers for a reference and print them as JSON
    Markers(MarkersArgs),
}

#[derive(Args, Debug)]
struct ReferenceArgs {
    /// Reference matrix CSV (features × samples)
    #[arg(long)]
    reference: PathBuf,

    /// Reference labels CSV (sample,label)
    #[arg(long)]
    labels: PathBuf,

    /// Marker specification JSON; derived from the reference when omitted
    #[arg(long)]
    markers: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    #[command(flatten)]
    reference: ReferenceArgs,

    /// Query matrix CSV (features × samples)
    #[arg(long)]
    query: PathBuf,

    /// Output JSON file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip the pruning pass
    #[arg(long)]
    no_prune: bool,
}

#[derive(Args, Debug)]
struct MarkersArgs {
    #[command(flatten)]
    reference: ReferenceArgs,

    /// Output JSON file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ferrocyte=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    let classifier = Classifier::new(config).context("Invalid classifier configuration")?;

    match cli.command {
        Command::Classify(args) => run_classify(&classifier, args),
        Command::Markers(args) => run_markers(&classifier, args),
    }
}

struct LoadedReference {
    matrix: ferrocyte_common::ExpressionMatrix,
    labels: Vec<String>,
    markers: Option<ferrocyte_markers::MarkerSpec>,
}

fn load_reference(args: &ReferenceArgs) -> anyhow::Result<LoadedReference> {
    let matrix = io::read_matrix(&args.reference)?;
    let labels = io::read_labels(&args.labels, matrix.samples())?;
    let markers = args.markers.as_deref().map(io::read_markers).transpose()?;
    info!(
        "Reference loaded: {} features × {} samples from {}",
        matrix.n_features(),
        matrix.n_samples(),
        args.reference.display()
    );
    Ok(LoadedReference { matrix, labels, markers })
}

fn run_classify(classifier: &Classifier, args: ClassifyArgs) -> anyhow::Result<()> {
    let reference = load_reference(&args.reference)?;
    let query = io::read_matrix(&args.query)?;

    let artifact = classifier
        .train(&reference.matrix, &reference.labels, reference.markers.as_ref())
        .context("Training failed")?;
    let mut records = classifier.classify(&query, &artifact).context("Classification failed")?;

    if !args.no_prune {
        classifier.prune(&mut records).context("Pruning failed")?;
    }

    io::write_json(&records, args.output.as_deref())?;
    if let Some(path) = &args.output {
        info!("Wrote {} records to {}", records.len(), path.display());
    }
    Ok(())
}

fn run_markers(classifier: &Classifier, args: MarkersArgs) -> anyhow::Result<()> {
    let reference = load_reference(&args.reference)?;
    let table = classifier
        .resolve_markers(&reference.matrix, &reference.labels, reference.markers.as_ref())
        .context("Marker resolution failed")?;
    let spec = table.to_spec(reference.matrix.features());
    io::write_json(&spec, args.output.as_deref())
}
