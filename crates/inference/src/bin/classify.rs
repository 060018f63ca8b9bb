use burn::tensor::backend::Backend;
use clap::Parser;
use cli_support::{validate_backend_choice, BackendArgs, CheckpointArgs, ConfigArgs};
use data_contracts::BinTally;
use inference::prelude::{load_classifier, resolve_checkpoint, InferenceBackend};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "classify", about = "Classify image files with a saved checkpoint")]
struct Args {
    /// Image files (any format supported by the `image` crate).
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Also print every class probability.
    #[arg(long, default_value_t = false)]
    all: bool,
    #[command(flatten)]
    config: ConfigArgs,
    #[command(flatten)]
    checkpoint: CheckpointArgs,
    #[command(flatten)]
    backend: BackendArgs,
}

fn main() -> anyhow::Result<()> {
    cli_support::logging::init();
    let args = Args::parse();
    validate_backend_choice(args.backend.backend)?;
    let path = resolve_checkpoint(&args.config, &args.checkpoint)?;

    let device = <InferenceBackend as Backend>::Device::default();
    let classifier = load_classifier::<InferenceBackend>(&path, &device)?;

    let mut tally = BinTally::default();
    let mut failures = 0usize;
    for image in &args.images {
        match classifier.classify_image(image) {
            Ok(pred) => {
                println!(
                    "{}: {} ({:.1}%) -> {} bin: {}",
                    image.display(),
                    pred.label,
                    pred.confidence * 100.0,
                    pred.guidance.bin,
                    pred.guidance.advice
                );
                tally.add(pred.guidance.bin);
                if args.all {
                    for (i, p) in pred.probabilities.iter().enumerate() {
                        let name =
                            data_contracts::class_name(&classifier.metadata().class_names, i);
                        println!("  {name:<12} {p:.4}");
                    }
                }
            }
            Err(err) => {
                log::error!("{}: {err:#}", image.display());
                failures += 1;
            }
        }
    }
    if tally.total > 1 {
        println!(
            "Total: {}  Recyclable: {}%  (recyclable {}, organic {}, hazardous {}, residual {})",
            tally.total,
            tally.recyclable_percent(),
            tally.recyclable,
            tally.organic,
            tally.hazardous,
            tally.residual
        );
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} images failed", args.images.len());
    }
    Ok(())
}
