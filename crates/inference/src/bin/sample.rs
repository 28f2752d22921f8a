use clap::Parser;
use inference::{run_sample, SampleArgs};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = SampleArgs::parse();
    cli_support::init_tracing(args.run.verbose)?;
    let written = run_sample(args)?;
    if let Some(first) = written.first() {
        info!("first sample: {}", first.display());
    }
    Ok(())
}
