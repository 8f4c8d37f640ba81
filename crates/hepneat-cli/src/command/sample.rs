use std::path::PathBuf;

use anyhow::Context as _;
use hepneat_sample::sampler::WeightedSubsample;
use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct SampleArg {
    /// Sample file to draw from
    #[arg(long)]
    input: PathBuf,
    /// Number of events to draw
    #[arg(long)]
    count: usize,
    /// Random seed; drawn from entropy when absent
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SampleArg) -> anyhow::Result<()> {
    let SampleArg {
        input,
        count,
        seed,
        output,
    } = arg;

    let sample = util::read_sample_file(input)?;
    let mut rng = match seed {
        Some(seed) => Pcg64::seed_from_u64(*seed),
        None => Pcg64::from_rng(&mut rand::rng()),
    };
    let subsample = WeightedSubsample::draw(&sample, *count, &mut rng)
        .with_context(|| format!("Failed to draw from sample: {}", input.display()))?;
    util::save_json(&subsample, output.as_deref())?;

    eprintln!(
        "Drew {} of {} events (total weight {:.6})",
        subsample.rows.len(),
        sample.len(),
        sample.total_weight()
    );
    Ok(())
}
