use anyhow::Context as _;
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use self::{normalize::NormalizeArg, sample::SampleArg, score::ScoreArg};

mod normalize;
mod sample;
mod score;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log per-candidate details
    #[arg(short, long, global = true)]
    verbose: bool,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Compute normalization constants over one or more samples
    Normalize(#[clap(flatten)] NormalizeArg),
    /// Draw a weight-proportional random subsample
    Sample(#[clap(flatten)] SampleArg),
    /// Score candidate networks against a signal and a background sample
    Score(#[clap(flatten)] ScoreArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;

    match args.mode {
        Mode::Normalize(arg) => normalize::run(&arg)?,
        Mode::Sample(arg) => sample::run(&arg)?,
        Mode::Score(arg) => score::run(&arg)?,
    }
    Ok(())
}
