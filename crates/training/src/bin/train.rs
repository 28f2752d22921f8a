use clap::Parser;
use training::util::{run_train, TrainArgs};

fn main() -> anyhow::Result<()> {
    let args = TrainArgs::parse();
    cli_support::init_tracing(args.run.verbose)?;
    run_train(args)?;
    Ok(())
}
