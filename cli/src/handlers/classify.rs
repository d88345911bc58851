use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use verdikt::{
    DetectorSession, discover::find_images,
    session::SessionError,
};

use crate::output::{
    format_record, print_info, print_report, print_summary,
    print_threshold_info, print_warning,
};

/// Expands raw user inputs into image paths, warning about anything that
/// yields nothing instead of failing the run.
pub fn gather_images(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for input in inputs {
        if !input.exists() {
            print_warning(&format!("{} does not exist", input.display()));
            continue;
        }
        let found = find_images(input);
        if found.is_empty() {
            print_warning(&format!(
                "no images found in {}",
                input.display()
            ));
        }
        images.extend(found);
    }
    images
}

fn run_progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:30.green} {pos}/{len} {msg}")
            .unwrap(),
    );
    bar
}

pub fn handle_classify(
    session: &DetectorSession,
    inputs: &[PathBuf],
) -> Result<(), SessionError> {
    let images = gather_images(inputs);
    if images.is_empty() {
        print_info("no images found to process");
        return Ok(());
    }
    print_info(&format!("processing {} images...", images.len()));
    print_threshold_info(session.threshold_override());

    let bar = run_progress_bar(images.len());
    let outcome = {
        let on_record = |record: &verdikt::PredictionRecord| {
            bar.println(format_record(record));
            bar.inc(1);
        };
        session.classify(&images, Some(&on_record), None)?
    };
    bar.finish_and_clear();

    if images.len() > 1 {
        print_summary(&outcome.summary);
    }
    Ok(())
}

pub fn handle_evaluate(
    session: &DetectorSession,
    test_dir: &Path,
) -> Result<(), SessionError> {
    print_info("running predictions...");
    print_threshold_info(session.threshold_override());

    let on_record = |record: &verdikt::PredictionRecord| {
        println!("{}", format_record(record));
    };
    let (outcome, report) =
        session.evaluate(test_dir, Some(&on_record), None)?;

    print_summary(&outcome.summary);
    print_report(&report);
    Ok(())
}
