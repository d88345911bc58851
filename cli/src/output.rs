use console::Style;
use verdikt::{PredictionRecord, RunSummary, eval::EvalReport};

pub fn print_info(message: &str) {
    println!("INFO: {message}");
}

pub fn print_error(message: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {message}", style.apply_to("ERROR:"));
}

pub fn print_warning(message: &str) {
    let style = Style::new().yellow();
    eprintln!("{} {message}", style.apply_to("WARNING:"));
}

/// One result line per image; misclassifications against known ground
/// truth are flagged up front.
pub fn format_record(record: &PredictionRecord) -> String {
    let name = record
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image");
    let verdict_style = match record.verdict {
        verdikt::Verdict::Fake => Style::new().red(),
        verdikt::Verdict::Real => Style::new().green(),
    };
    let core = format!(
        "img: {name} pred: {} prob: {:.3} conf: {:.3}",
        verdict_style.apply_to(record.verdict.as_str()),
        record.probability,
        record.confidence,
    );
    match record.truth {
        Some(truth) if record.is_misclassified() => {
            let marker = Style::new().red().bold();
            format!(
                "{} img: {name} true: {} pred: {} prob: {:.3} conf: {:.3}",
                marker.apply_to("MISCLASSIFIED:"),
                truth.as_str(),
                record.verdict.as_str(),
                record.probability,
                record.confidence,
            )
        },
        Some(truth) => format!(
            "img: {name} true: {} pred: {} prob: {:.3} conf: {:.3}",
            truth.as_str(),
            record.verdict.as_str(),
            record.probability,
            record.confidence,
        ),
        None => core,
    }
}

pub fn print_summary(summary: &RunSummary) {
    let style = Style::new().bold();
    println!(
        "\n{} {} REAL, {} FAKE",
        style.apply_to("SUMMARY:"),
        summary.real_count,
        summary.fake_count
    );
}

pub fn print_threshold_info(threshold_override: Option<f32>) {
    match threshold_override {
        Some(threshold) => {
            print_info(&format!("USED_THRESHOLD: {threshold:.3}"))
        },
        None => print_info("USED_THRESHOLD: per-model"),
    }
}

pub fn print_report(report: &EvalReport) {
    let rule = "=".repeat(80);
    let style = Style::new().bold();
    println!("\n{rule}");
    println!("{}", style.apply_to("FINAL TEST STATISTICS:"));
    println!("{rule}");
    println!("ACCURACY: {:.4}", report.accuracy);
    println!("PRECISION: {:.4}", report.precision);
    println!("RECALL: {:.4}", report.recall);
    println!("F1_SCORE: {:.4}", report.f1);
    println!("CONFUSION_MATRIX (rows=true, cols=pred):");
    println!(" True Real (TN): {}", report.confusion.true_real);
    println!(" False Fake (FP): {}", report.confusion.false_fake);
    println!(" False Real (FN): {}", report.confusion.false_real);
    println!(" True Fake (TP): {}", report.confusion.true_fake);
}
