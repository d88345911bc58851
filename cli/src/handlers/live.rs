use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use console::Style;
use inquire::Text;
use verdikt::DetectorSession;

use super::classify::{gather_images, handle_classify, handle_evaluate};
use crate::output::{print_error, print_info, print_warning};

/// Splits interactive input into paths, honoring single and double
/// quotes so paths with spaces survive.
fn split_input(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for character in input.chars() {
        match quote {
            Some(active) if character == active => quote = None,
            Some(_) => current.push(character),
            None if character == '"' || character == '\'' => {
                quote = Some(character)
            },
            None if character.is_whitespace() => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            },
            None => current.push(character),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn print_banner(session: &DetectorSession) {
    let rule = "=".repeat(80);
    let style = Style::new().bold();
    println!("\n{rule}");
    println!("{}", style.apply_to("LIVE MODE"));
    println!("{rule}");
    println!("Models are loaded and ready. Commands:");
    println!("  - image or directory path(s) to classify");
    println!("  - 'test <dir>' to evaluate a labeled test folder");
    println!(
        "  - 'tta' to toggle test-time augmentation (currently: {})",
        if session.settings.use_tta { "ON" } else { "OFF" }
    );
    println!(
        "  - 'batch <size>' to change the batch size (currently: {})",
        session.settings.batch_size
    );
    println!(
        "  - 'workers <count>' to change the worker count (currently: \
         {})",
        session.settings.workers
    );
    println!("  - 'info' for loaded-model information");
    println!("  - 'exit' to quit");
    println!("{}", "-".repeat(80));
}

fn print_session_info(session: &DetectorSession) {
    let info = session.info();
    if info.ensemble {
        println!("Ensemble with {} models:", info.models.len());
        for model in &info.models {
            println!(
                "  - {} (threshold: {:.3})",
                model.name, model.threshold
            );
        }
    } else if let Some(model) = info.models.first() {
        println!("Single model: {}", model.name);
        println!("Threshold: {:.3}", model.threshold);
    }
    println!(
        "Settings: TTA={}, batch size={}, workers={}",
        if info.settings.use_tta { "ON" } else { "OFF" },
        info.settings.batch_size,
        info.settings.workers
    );
}

pub fn handle_live(mut session: DetectorSession) {
    // Ctrl-C during an operation must not kill the process; the session
    // keeps its loaded models and returns to the prompt.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_for_handler = interrupted.clone();
    let _ = ctrlc::set_handler(move || {
        interrupted_for_handler.store(true, Ordering::SeqCst);
    });

    print_banner(&session);

    loop {
        interrupted.store(false, Ordering::SeqCst);
        let input = match Text::new(">").prompt() {
            Ok(input) => input,
            Err(_) => {
                println!("Live mode finished.");
                break;
            },
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let lowered = input.to_ascii_lowercase();
        if matches!(lowered.as_str(), "exit" | "quit" | "q") {
            println!("Live mode finished.");
            break;
        }

        if lowered == "tta" {
            let enabled = session.toggle_tta();
            print_info(&format!(
                "TTA {}",
                if enabled { "enabled" } else { "disabled" }
            ));
            continue;
        }

        if let Some(value) = lowered.strip_prefix("batch ") {
            match value.trim().parse::<usize>() {
                Ok(batch_size) if batch_size > 0 => {
                    session.set_batch_size(batch_size);
                    print_info(&format!(
                        "batch size set to {batch_size}"
                    ));
                },
                _ => print_error(
                    "invalid batch size, use: batch <number>",
                ),
            }
            continue;
        }

        if let Some(value) = lowered.strip_prefix("workers ") {
            match value.trim().parse::<usize>() {
                Ok(workers) => {
                    session.set_workers(workers);
                    print_info(&format!("workers set to {workers}"));
                },
                Err(_) => print_error(
                    "invalid worker count, use: workers <number>",
                ),
            }
            continue;
        }

        if lowered == "info" {
            print_session_info(&session);
            continue;
        }

        if let Some(path) = input.strip_prefix("test ") {
            let path =
                path.trim().trim_matches(|c| c == '"' || c == '\'');
            let test_dir = PathBuf::from(path);
            if !test_dir.exists() {
                print_error(&format!(
                    "test folder '{path}' does not exist"
                ));
                continue;
            }
            print_info(&format!("evaluating '{path}'..."));
            if let Err(error) = handle_evaluate(&session, &test_dir) {
                print_error(&format!("evaluation failed: {error}"));
            }
            continue;
        }

        let paths: Vec<PathBuf> =
            split_input(input).into_iter().map(PathBuf::from).collect();
        if gather_images(&paths).is_empty() {
            print_warning("no valid images found");
            continue;
        }
        if let Err(error) = handle_classify(&session, &paths) {
            print_error(&format!("{error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            split_input("a.jpg  b.png"),
            vec!["a.jpg".to_string(), "b.png".to_string()]
        );
    }

    #[test]
    fn quoted_paths_keep_their_spaces() {
        assert_eq!(
            split_input("'path with spaces/img.jpg' other.png"),
            vec![
                "path with spaces/img.jpg".to_string(),
                "other.png".to_string()
            ]
        );
        assert_eq!(
            split_input("\"double quoted.webp\""),
            vec!["double quoted.webp".to_string()]
        );
    }
}
