use clap::Parser;
use training::util::{run_train, TrainArgs};

fn main() -> anyhow::Result<()> {
    cli_support::logging::init();
    let args = TrainArgs::parse();
    run_train(args)?;
    Ok(())
}
