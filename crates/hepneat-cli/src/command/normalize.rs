use std::path::PathBuf;

use anyhow::Context as _;
use hepneat_sample::normalizer::StreamingNormalizer;

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct NormalizeArg {
    /// Sample files, accumulated in the given order
    #[arg(long = "input", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &NormalizeArg) -> anyhow::Result<()> {
    let NormalizeArg { inputs, output } = arg;

    let mut normalizer: Option<StreamingNormalizer> = None;
    for path in inputs {
        let sample = util::read_sample_file(path)?;
        eprintln!("Read {} events from {}", sample.len(), path.display());
        normalizer
            .get_or_insert_with(|| StreamingNormalizer::new(sample.variables().to_vec()))
            .add(&sample)
            .with_context(|| format!("Failed to accumulate sample: {}", path.display()))?;
    }
    let normalizer = normalizer.context("No input samples given")?;

    normalizer.report();
    let params = normalizer
        .params()
        .context("Failed to compute normalization constants")?;
    util::save_json(&params, output.as_deref())?;

    eprintln!();
    eprintln!("Normalization parameters saved successfully");
    if let Some(path) = output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Variables: {}", params.variables.len());
    eprintln!("  Total weight: {:.6}", params.total_weight);

    Ok(())
}
