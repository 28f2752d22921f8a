use clap::Parser;
use tracing::info;
use training::util::{run_prep, PrepArgs};

fn main() -> anyhow::Result<()> {
    let args = PrepArgs::parse();
    cli_support::init_tracing(args.run.verbose)?;
    let report = run_prep(args)?;
    info!(
        "wrote {} ({} images, values {:.3}..{:.3})",
        report.path.display(),
        report.summary.count,
        report.summary.min,
        report.summary.max
    );
    Ok(())
}
