//! Aggregate Loss CLI
//!
//! Computes the aggregate loss distribution described by a JSON request.
//!
//! Usage:
//!   aggregate_loss <REQUEST> [--output dist.csv] [--layers layers.csv]
//!
//! With `--layers`, every layer of the CSV file is evaluated against the
//! request's ground-up model and one summary row per layer is written.

use aggregate_loss::loader::load_layers;
use aggregate_loss::{AggregateDistribution, LogSink, LossModelRequest, PolicyLayer};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "aggregate_loss")]
#[command(version, about = "Aggregate loss distribution of a collective risk model")]
struct Cli {
    /// JSON loss model request
    request: PathBuf,

    /// Output CSV: `node,pmf,cdf`, or one summary row per layer with --layers
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// CSV of `deductible,cover` layers to evaluate instead of the request's layer
    #[arg(long)]
    layers: Option<PathBuf>,

    /// Quantile levels to report
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![0.5, 0.9, 0.99, 0.995])]
    quantiles: Vec<f64>,
}

/// One row of the distribution output
#[derive(Serialize)]
struct NodeRow {
    node: f64,
    pmf: f64,
    cdf: f64,
}

/// One row of the layer summary output
#[derive(Serialize)]
struct LayerSummary {
    deductible: f64,
    cover: f64,
    expected_loss: f64,
    mean: f64,
    std: f64,
    skewness: f64,
    total_mass: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Aggregate Loss v{}", env!("CARGO_PKG_VERSION"));
    println!("====================\n");

    let request = LossModelRequest::from_json_path(&cli.request)
        .with_context(|| format!("Failed to load request {}", cli.request.display()))?;
    println!("Frequency: {:?}", request.frequency);
    println!("Severity:  {:?} (loc {})", request.severity.kind, request.severity.loc);
    println!("Method:    {}", request.model.aggr_method.name());
    println!();

    match &cli.layers {
        Some(path) => run_layers(&request, path, &cli),
        None => run_single(&request, &cli),
    }
}

fn run_single(request: &LossModelRequest, cli: &Cli) -> Result<()> {
    let model = request.build().context("Failed to build loss model")?;

    let start = Instant::now();
    let dist = model.aggregate(&LogSink).context("Aggregation failed")?;
    println!("Aggregated {} nodes in {:?}\n", dist.len(), start.elapsed());

    print_summary(model.layer(), &dist, model.expected_loss(), &cli.quantiles);

    if let Some(output) = &cli.output {
        write_distribution(&dist, output)?;
        println!("\nWrote {}", output.display());
    }
    Ok(())
}

fn run_layers(request: &LossModelRequest, path: &Path, cli: &Cli) -> Result<()> {
    let layers = load_layers(path)
        .with_context(|| format!("Failed to load layers {}", path.display()))?;
    println!("Loaded {} layers from {}", layers.len(), path.display());

    let start = Instant::now();
    let results = request
        .aggregate_layers(&layers, &LogSink)
        .context("Aggregation failed")?;
    println!("Aggregated {} layers in {:?}\n", results.len(), start.elapsed());

    let mut summaries = Vec::with_capacity(layers.len());
    for (layer, dist) in layers.iter().zip(&results) {
        let expected_loss = request.build_for_layer(*layer)?.expected_loss();
        print_summary(layer, dist, expected_loss, &cli.quantiles);
        println!();
        summaries.push(LayerSummary {
            deductible: layer.deductible,
            cover: layer.cover,
            expected_loss,
            mean: dist.mean(),
            std: dist.std(),
            skewness: dist.skewness(),
            total_mass: dist.total_mass(),
        });
    }

    if let Some(output) = &cli.output {
        let mut wtr = csv::Writer::from_path(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        for summary in &summaries {
            wtr.serialize(summary)?;
        }
        wtr.flush()?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}

fn print_summary(layer: &PolicyLayer, dist: &AggregateDistribution, expected_loss: f64, quantiles: &[f64]) {
    println!("Layer: {} xs {}", layer.cover, layer.deductible);
    println!("  Expected loss:  {:.6}", expected_loss);
    println!("  Mean:           {:.6}", dist.mean());
    println!("  Std deviation:  {:.6}", dist.std());
    println!("  Coeff. of var.: {:.6}", dist.coeff_variation());
    println!("  Skewness:       {:.6}", dist.skewness());
    println!("  Total mass:     {:.8}", dist.total_mass());
    for q in quantiles {
        println!("  Quantile {:>6}: {:.6}", q, dist.ppf(*q));
    }
}

fn write_distribution(dist: &AggregateDistribution, output: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    for ((node, pmf), cdf) in dist.nodes.iter().zip(dist.pmf()).zip(&dist.cdf) {
        wtr.serialize(NodeRow {
            node: *node,
            pmf,
            cdf: *cdf,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
