use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use log::{debug, warn};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

mod libquiz;

use crate::libquiz::store::{self, SqliteStore, Store, StoreError};

cfg_if::cfg_if! {
    if #[cfg(feature = "gui")] {
        mod gui;
    } else {
        mod cli;
    }
}

#[derive(Debug, PartialEq)]
enum Choice {
    Option(usize),
    DontKnow,
    Quit,
}

#[derive(Parser, Debug)]
#[command(name = "Quiz Sprint")]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "quizsprint.db")]
    db: PathBuf,
    /// Play this quiz and remember it as the current one
    #[arg(short, long, value_name = "ID")]
    quiz: Option<String>,
    #[arg(short, long, default_value = "error")]
    log_level: String,
}

impl Choice {
    fn from_str(choices_count: usize, input: &str) -> Choice {
        match input {
            "q" => Choice::Quit,
            input => match input.parse::<usize>() {
                Ok(num) => {
                    if num == 0 || num > choices_count {
                        println!(
                            "{}",
                            format!("There are only {} options available!", choices_count)
                                .bright_red()
                        );
                        Choice::DontKnow
                    } else {
                        Choice::Option(num - 1)
                    }
                }
                Err(_) => Choice::DontKnow,
            },
        }
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("no quiz selected")]
    NoQuiz,
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "gui")]
    #[error("cannot open window: {0}")]
    Gui(#[from] eframe::Error),
}

fn main() -> Result<(), Error> {
    //INIT START
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level)).init();

    let mut store = match SqliteStore::create_or_open(&args.db) {
        Ok(store) => store,
        Err(err) => {
            warn!("[Setup] Cannot open {:?} ({}), using a temporary store", args.db, err);
            SqliteStore::in_memory()?
        }
    };
    debug!("[Setup] Store ready");

    let mut document = store.load();
    let mut changed = false;
    if let Some(id) = args.quiz.as_deref() {
        if document.select(id) {
            changed = true;
        } else {
            warn!("[Setup] Quiz '{}' not found", id);
            println!("{}", format!("No quiz with id '{}', playing the current one.", id).yellow());
        }
    }
    changed |= document.ensure_current();
    if changed {
        store::persist(&mut store, &document);
    }

    let quiz = match document.current_quiz() {
        Some(quiz) => quiz,
        None => {
            println!("{}", "No quiz selected.".yellow());
            return finish(store, Err(Error::NoQuiz));
        }
    };
    debug!(
        "[Setup] Playing '{}' ({} questions)",
        quiz.id,
        quiz.questions.len()
    );
    // INIT DONE

    cfg_if::cfg_if! {
        if #[cfg(feature = "gui")] {
            let result = gui::init_gui(quiz);
        } else {
            let result = cli::cli_loop(quiz);
        }
    }

    finish(store, result)
}

fn finish(store: SqliteStore, to_error: Result<(), Error>) -> Result<(), Error> {
    store.close()?;
    to_error
}
