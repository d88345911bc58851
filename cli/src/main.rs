mod handlers;
mod output;

use std::path::PathBuf;

use clap::Parser;
use verdikt::{
    ComputeBackend, DetectorConfig, DetectorSession, RunSettings,
    config::{
        DEFAULT_BATCH_SIZE, DEFAULT_IMAGE_SIZE, DEFAULT_TTA_AUGMENTS,
        DEFAULT_WORKERS,
    },
    discover::find_checkpoint_beside_executable,
};

use crate::output::{print_error, print_info};

/// Classify images as machine-generated or authentic.
#[derive(Parser)]
#[command(name = "verdikt", version)]
struct Args {
    /// Image files or directories to classify.
    inputs: Vec<PathBuf>,

    /// Classification threshold; omitted means the saved model
    /// threshold (or its default) applies.
    #[arg(long)]
    threshold: Option<f32>,

    /// Single checkpoint file to use.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Directory with multiple checkpoints for ensemble voting.
    #[arg(long)]
    models: Option<PathBuf>,

    /// Test directory with 'real' and 'fake' sub-directories.
    #[arg(long)]
    test: Option<PathBuf>,

    /// Enable test-time augmentation.
    #[arg(long)]
    tta: bool,

    /// Number of test-time augmentations.
    #[arg(long, default_value_t = DEFAULT_TTA_AUGMENTS)]
    tta_augments: usize,

    /// Inference image size.
    #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE)]
    img_size: u32,

    /// Batch size for inference.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Number of data loading workers.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Compute device: cpu, cuda[:N] or metal.
    #[arg(long)]
    device: Option<String>,

    /// Keep models loaded and read commands interactively.
    #[arg(long)]
    live: bool,
}

fn parse_backend(device: Option<&str>) -> Result<ComputeBackend, String> {
    let Some(device) = device else {
        return Ok(ComputeBackend::Auto);
    };
    match device {
        "cpu" => Ok(ComputeBackend::Cpu),
        "metal" => Ok(ComputeBackend::Metal),
        "cuda" => Ok(ComputeBackend::Cuda(0)),
        other => {
            if let Some(ordinal) = other.strip_prefix("cuda:") {
                ordinal
                    .parse()
                    .map(ComputeBackend::Cuda)
                    .map_err(|_| format!("invalid cuda ordinal: {other}"))
            } else {
                Err(format!("unknown device: {other}"))
            }
        },
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .without_time()
        .init();

    let args = Args::parse();

    let backend = match parse_backend(args.device.as_deref()) {
        Ok(backend) => backend,
        Err(message) => {
            print_error(&message);
            std::process::exit(2);
        },
    };
    let config = DetectorConfig {
        image_size: args.img_size,
        tta_augments: args.tta_augments,
        backend,
        ..DetectorConfig::default()
    };
    let settings = RunSettings {
        use_tta: args.tta,
        batch_size: args.batch_size.max(1),
        workers: args.workers,
    };

    let session = if let Some(models_dir) = &args.models {
        print_info("loading models...");
        match DetectorSession::with_ensemble(
            models_dir,
            config,
            settings,
            args.threshold,
        ) {
            Ok(session) => {
                let info = session.info();
                print_info(&format!(
                    "using ensemble with {} models from {}",
                    info.models.len(),
                    models_dir.display()
                ));
                session
            },
            Err(error) => {
                print_error(&format!("could not load ensemble: {error}"));
                std::process::exit(1);
            },
        }
    } else {
        let checkpoint = args.model.clone().or_else(|| {
            let found = find_checkpoint_beside_executable();
            if let Some(found) = &found {
                print_info(&format!(
                    "using auto-detected model {}",
                    found.display()
                ));
            }
            found
        });
        let Some(checkpoint) = checkpoint else {
            print_error(
                "no model specified and no checkpoint found next to \
                 the executable",
            );
            std::process::exit(1);
        };
        print_info("loading model...");
        match DetectorSession::with_single_model(
            &checkpoint,
            config,
            settings,
            args.threshold,
        ) {
            Ok(session) => session,
            Err(error) => {
                print_error(&format!("could not load model: {error}"));
                std::process::exit(1);
            },
        }
    };

    if args.live {
        handlers::live::handle_live(session);
        return;
    }

    if let Some(test_dir) = &args.test {
        if let Err(error) =
            handlers::classify::handle_evaluate(&session, test_dir)
        {
            print_error(&format!("evaluation failed: {error}"));
            std::process::exit(1);
        }
        return;
    }

    if args.inputs.is_empty() {
        print_error(
            "please specify input images, directories, or use --test",
        );
        std::process::exit(2);
    }
    if let Err(error) =
        handlers::classify::handle_classify(&session, &args.inputs)
    {
        print_error(&format!("prediction failed: {error}"));
        std::process::exit(1);
    }
}
