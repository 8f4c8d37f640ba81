use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use hepneat_fitness::{
    class_sample::ClassSample,
    config::{FitnessConfig, MetricKind},
    metric::zscore::BinWeighting,
    population::Population,
};
use hepneat_sample::{
    event::Sample,
    normalizer::{NormalizationParams, StreamingNormalizer},
};

use crate::{schema::score_report::ScoreReport, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ScoreArg {
    /// Signal sample file
    #[arg(long)]
    signal: PathBuf,
    /// Background sample file
    #[arg(long)]
    background: PathBuf,
    /// JSON array of networks to score
    #[arg(long)]
    networks: PathBuf,
    /// Normalization parameters; accumulated from signal then background when absent
    #[arg(long)]
    params: Option<PathBuf>,
    /// Fitness configuration file; the options below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    metric: Option<MetricKind>,
    /// Exponent of the euclidean metric
    #[arg(long)]
    norm: Option<f64>,
    /// Histogram bins of the separation and zscore metrics
    #[arg(long)]
    nbins: Option<usize>,
    /// Monte-Carlo relative convergence tolerance
    #[arg(long)]
    error: Option<f64>,
    /// Monte-Carlo draws per bin
    #[arg(long)]
    mpoints: Option<usize>,
    /// Z-value floor
    #[arg(long, allow_negative_numbers = true)]
    minz: Option<f64>,
    /// Per-bin weighting (constant or linear)
    #[arg(long)]
    weight: Option<BinWeighting>,
    /// Monte-Carlo seed
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl ScoreArg {
    fn fitness_config(&self) -> anyhow::Result<FitnessConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file("fitness configuration", path)?,
            None => FitnessConfig::default(),
        };
        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        if let Some(norm) = self.norm {
            config.norm = norm;
        }
        if let Some(nbins) = self.nbins {
            config.nbins = nbins;
        }
        if let Some(error) = self.error {
            config.error = error;
        }
        if let Some(mpoints) = self.mpoints {
            config.mpoints = mpoints;
        }
        if let Some(minz) = self.minz {
            config.minz = minz;
        }
        if let Some(weight) = self.weight {
            config.weight = weight;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

pub(crate) fn run(arg: &ScoreArg) -> anyhow::Result<()> {
    let config = arg.fitness_config()?;
    let metric = config
        .build_metric()
        .context("Invalid fitness configuration")?;

    let mut signal = util::read_sample_file(&arg.signal)?;
    let mut background = util::read_sample_file(&arg.background)?;
    let normalizer = match &arg.params {
        Some(path) => {
            let params: NormalizationParams =
                util::read_json_file("normalization parameters", path)?;
            StreamingNormalizer::from_params(&params)
        }
        None => accumulate(&signal, &background)?,
    };
    normalizer.report();
    normalizer
        .normalize_sample(&mut signal)
        .with_context(|| format!("Failed to normalize sample: {}", arg.signal.display()))?;
    normalizer
        .normalize_sample(&mut background)
        .with_context(|| format!("Failed to normalize sample: {}", arg.background.display()))?;

    let signal = ClassSample::from_sample(&signal);
    let background = ClassSample::from_sample(&background);
    eprintln!(
        "Signal:     {} events, total weight {:.6}",
        signal.len(),
        signal.total_weight()
    );
    eprintln!(
        "Background: {} events, total weight {:.6}",
        background.len(),
        background.total_weight()
    );

    let networks = util::read_networks_file(&arg.networks)?;
    anyhow::ensure!(
        !networks.is_empty(),
        "Networks file contains no networks: {}",
        arg.networks.display()
    );
    let mut population = Population::new(networks);
    population
        .evaluate_fitness(metric.as_ref(), &signal, &background)
        .context("Fitness evaluation aborted")?;

    eprintln!("Candidates ({} metric):", metric.name());
    for (i, candidate) in population.candidates().iter().enumerate() {
        eprintln!(
            "  {i:2}: {:.3?} (bias {:.3}) => {:.6}",
            candidate.network().weights,
            candidate.network().bias,
            candidate.fitness().unwrap_or(f64::NAN)
        );
    }
    if let Some(stats) = population.compute_fitness_stats() {
        eprintln!("Fitness Stats:");
        eprintln!("  Min:    {:.6}", stats.min);
        eprintln!("  Max:    {:.6}", stats.max);
        eprintln!("  Mean:   {:.6}", stats.mean);
        eprintln!("  Median: {:.6}", stats.median);
        eprintln!("  Stddev: {:.6}", stats.std_dev);
    }

    let winner = population
        .best()
        .context("No candidate received a fitness")?;
    let report = ScoreReport {
        scored_at: Utc::now(),
        metric: metric.name().to_owned(),
        winner: winner.network().clone(),
        winner_fitness: winner.fitness().unwrap_or(f64::NAN),
        fitness: population
            .candidates()
            .iter()
            .filter_map(|candidate| candidate.fitness())
            .collect(),
        config,
    };
    util::save_json(&report, arg.output.as_deref())?;

    eprintln!();
    eprintln!("Score report saved successfully");
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Scored at: {}", report.scored_at);
    eprintln!("  Winner fitness: {:.6}", report.winner_fitness);

    Ok(())
}

fn accumulate(signal: &Sample, background: &Sample) -> anyhow::Result<StreamingNormalizer> {
    let mut normalizer = StreamingNormalizer::new(signal.variables().to_vec());
    normalizer
        .add(signal)
        .context("Failed to accumulate signal sample")?;
    normalizer
        .add(background)
        .context("Failed to accumulate background sample")?;
    Ok(normalizer)
}
