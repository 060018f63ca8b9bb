use burn::tensor::backend::Backend;
use clap::Parser;
use cli_support::{validate_backend_choice, BackendArgs, CheckpointArgs, ConfigArgs};
use inference::prelude::{
    load_classifier, random_input, resolve_checkpoint, sanity_report, InferenceBackend,
};

#[derive(Parser, Debug)]
#[command(
    name = "check_model",
    about = "Reload a saved checkpoint and run a prediction on random input"
)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    checkpoint: CheckpointArgs,
    #[command(flatten)]
    backend: BackendArgs,
    /// Seed for the random input image.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    cli_support::logging::init();
    let args = Args::parse();
    validate_backend_choice(args.backend.backend)?;
    let path = resolve_checkpoint(&args.config, &args.checkpoint)?;

    println!("Loading model: {}", path.display());
    let device = <InferenceBackend as Backend>::Device::default();
    let classifier = load_classifier::<InferenceBackend>(&path, &device)?;
    println!("{}", classifier.summary());

    let input = random_input(classifier.image_size(), args.seed);
    let pred = classifier.predict(&input)?;
    let [rows, cols] = pred.dims();
    let values = pred
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("reading predictions: {e:?}"))?;
    println!("{}", sanity_report([rows, cols], &values));
    Ok(())
}
