use colored::Colorize;
use env_logger::Env;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
mod libquiz;
use crate::libquiz::model::{uid, Document, Quiz, Upsert};
use crate::libquiz::store::{SqliteStore, Store};

#[derive(Parser, Debug)]
#[command(name = "Quiz Sprint Porter")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "info")]
    log_level: String,
    #[arg(short, long, value_name = "FILE", default_value = "quizsprint.db")]
    db: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge quizzes from a JSON file into the store
    Import { json: PathBuf },
    /// Write the stored document to a JSON file
    Export { json: PathBuf },
    List,
    /// Make a quiz the one the player starts with
    Select { id: String },
}

/// Accepts a whole document, an array of quizzes or a single quiz.
fn parse_import(json: &str) -> serde_json::Result<(Vec<Quiz>, Option<String>)> {
    let value: Value = serde_json::from_str(json)?;
    if value.is_array() {
        return Ok((serde_json::from_value(value)?, None));
    }
    if value.get("quizzes").is_some() {
        let document: Document = serde_json::from_value(value)?;
        return Ok((document.quizzes, document.current_id));
    }
    Ok((vec![serde_json::from_value(value)?], None))
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level)).init();

    info!("{}", format!("Database at {:?}", args.db).cyan());
    let mut store = match SqliteStore::create_or_open(&args.db) {
        Ok(s) => s,
        Err(e) => {
            error!("{}{}", "Unable to open Database: ".red(), e);
            std::process::exit(1);
        }
    };
    let mut document = store.load();

    // (succeeded, document changed)
    let (ok, changed) = match args.command {
        Commands::Import { json } => {
            let ok = import(&mut document, &json);
            (ok, ok)
        }
        Commands::Export { json } => (export(&document, &json), false),
        Commands::List => {
            list(&document);
            (true, false)
        }
        Commands::Select { id } => {
            if document.select(&id) {
                info!("{}", format!("Current quiz is now '{}'", id).green());
                (true, true)
            } else {
                error!("{}", format!("No quiz with id '{}'!", id).red());
                (false, false)
            }
        }
    };

    if changed {
        if let Err(e) = store.save(&document) {
            error!("{}{}", "Unable to save Database: ".red(), e);
            close(store);
            std::process::exit(1);
        }
    }
    close(store);
    if !ok {
        std::process::exit(1);
    }
}

fn close(store: SqliteStore) {
    if let Err(e) = store.close() {
        warn!("Closing the Database failed: {}", e);
    }
}

fn import(document: &mut Document, path: &Path) -> bool {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            error!("{}", format!("Cannot read {:?}: {}!", path, e).red());
            return false;
        }
    };
    let (quizzes, current_id) = match parse_import(json.as_str()) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", format!("Malformed JSON: {}!", e).red());
            return false;
        }
    };

    info!(
        "{}",
        format!("Importing data... ({} Quizzes)", quizzes.len()).blue()
    );
    for mut quiz in quizzes {
        if quiz.id.is_empty() {
            quiz.id = uid("quiz");
        }
        let total = quiz.questions.len();
        quiz.questions.retain_mut(|question| {
            if question.id.is_empty() {
                question.id = uid("q");
            }
            if question.is_playable() {
                info!("{} {}", "│".blue(), format!("├ Question: {}", question.prompt).green());
                true
            } else {
                error!(
                    "{} {}",
                    "│".blue(),
                    format!(
                        "├ ✘ Question: {:?} (needs a prompt, two answers and a correct one)",
                        question.prompt
                    )
                    .red()
                    .strikethrough()
                );
                false
            }
        });
        info!(
            "{}",
            format!(
                "├ Quiz: {} '{}' ({}/{} Questions)",
                quiz.id,
                quiz.title,
                quiz.questions.len(),
                total
            )
            .blue()
        );
        if document.upsert(quiz) == Upsert::Replaced {
            info!("{}", "│ (replaced existing quiz)".blue());
        }
    }

    if let Some(id) = current_id {
        if !document.select(&id) {
            warn!("[Import] currentId '{}' does not match any quiz", id);
        }
    }
    document.ensure_current();
    true
}

fn export(document: &Document, path: &Path) -> bool {
    let json = match serde_json::to_string_pretty(document) {
        Ok(json) => json,
        Err(e) => {
            error!("{}", format!("Cannot serialize document: {}!", e).red());
            return false;
        }
    };
    match std::fs::write(path, json) {
        Ok(_) => {
            info!(
                "{}",
                format!("Exported {} quizzes to {:?}", document.quizzes.len(), path).green()
            );
            true
        }
        Err(e) => {
            error!("{}", format!("Cannot write {:?}: {}!", path, e).red());
            false
        }
    }
}

fn list(document: &Document) {
    if document.quizzes.is_empty() {
        println!("{}", "No quizzes yet".yellow());
        return;
    }
    for quiz in &document.quizzes {
        let marker = if document.current_id.as_deref() == Some(quiz.id.as_str()) {
            "*".green()
        } else {
            " ".normal()
        };
        println!(
            "{} {} {} ({} questions)",
            marker,
            quiz.id.cyan(),
            quiz.display_title().bold(),
            quiz.questions.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "quizsprint-import-{}-{}.json",
            std::process::id(),
            uid("t")
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn imports_single_quiz_and_drops_invalid_questions() {
        let path = write_temp(
            r#"{
                "title": "Imported",
                "questions": [
                    {"prompt": "2+2?", "choices": [
                        {"text": "4", "isCorrect": true},
                        {"text": "5", "isCorrect": false}
                    ]},
                    {"prompt": "", "choices": [
                        {"text": "a", "isCorrect": true},
                        {"text": "b", "isCorrect": false}
                    ]}
                ]
            }"#,
        );
        let mut document = Document::default();
        assert!(import(&mut document, &path));
        let _ = std::fs::remove_file(&path);

        assert_eq!(document.quizzes.len(), 1);
        let quiz = &document.quizzes[0];
        assert!(quiz.id.starts_with("quiz_"));
        assert_eq!(quiz.questions.len(), 1);
        assert!(quiz.questions[0].id.starts_with("q_"));
        assert_eq!(document.current_id.as_deref(), Some(quiz.id.as_str()));
    }

    #[test]
    fn imported_document_replaces_by_id_and_sets_current() {
        let mut document = Document::default();
        document.upsert(Quiz::new("a".into(), "Old A"));
        document.upsert(Quiz::new("b".into(), "B"));
        document.current_id = Some("a".into());

        let path = write_temp(
            r#"{"quizzes": [{"id": "a", "title": "New A"}], "currentId": "b"}"#,
        );
        assert!(import(&mut document, &path));
        let _ = std::fs::remove_file(&path);

        assert_eq!(document.quizzes.len(), 2);
        assert_eq!(document.find("a").map(|q| q.title.as_str()), Some("New A"));
        assert_eq!(document.current_id.as_deref(), Some("b"));
    }

    #[test]
    fn missing_import_file_fails() {
        let path = std::env::temp_dir().join(format!("quizsprint-missing-{}.json", uid("t")));
        let mut document = Document::default();
        assert!(!import(&mut document, &path));
        assert_eq!(document, Document::default());
    }

    #[test]
    fn export_reports_write_failure() {
        let mut document = Document::default();
        document.ensure_current();
        let dir = std::env::temp_dir().join(format!("quizsprint-no-such-dir-{}", uid("t")));
        assert!(!export(&document, &dir.join("out.json")));

        let path = write_temp("");
        assert!(export(&document, &path));
        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(serde_json::from_str::<Document>(&written).unwrap(), document);
    }

    #[test]
    fn malformed_import_changes_nothing() {
        let path = write_temp("[1, 2");
        let mut document = Document::default();
        assert!(!import(&mut document, &path));
        let _ = std::fs::remove_file(&path);
        assert_eq!(document, Document::default());
    }
}
