use crate::libquiz::model::Quiz;
use crate::libquiz::player::Player;
use crate::libquiz::render::{QuestionView, Render, Reveal};
use crate::libquiz::timer::TimerUpdate;
use crate::{Choice, Error};
use colored::Colorize;
use log::debug;
use std::io::{self, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

const BAR_WIDTH: usize = 20;

#[derive(Default)]
struct Terminal {
    choices: Vec<String>,
    last_seconds: Option<u32>,
    answered: bool,
}

impl Terminal {
    fn prompt(&self, seconds: u32, fraction: f64) {
        let filled = ((fraction * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
        let clock = format!("{:>3}s {}", seconds, bar);
        let clock = if fraction > 0.5 {
            clock.green()
        } else if fraction > 0.2 {
            clock.yellow()
        } else {
            clock.red()
        };
        print!(
            "\r{} {} ",
            clock,
            format!("Answer (1-{}, q to quit):", self.choices.len()).cyan()
        );
        let _ = io::stdout().flush();
    }
}

impl Render for Terminal {
    fn render_question(&mut self, view: &QuestionView<'_>) {
        self.choices = view.choices.iter().map(|c| c.to_string()).collect();
        self.last_seconds = None;
        self.answered = false;

        if view.index == 0 {
            println!(
                "{}",
                format!("==========> {} ({} questions) <==========", view.title, view.count).cyan()
            );
        }
        let leading = format!("{}/{}. ", view.index + 1, view.count);
        println!(
            "{}{}",
            leading.cyan(),
            format!(" {} ", view.prompt).black().bold().on_white()
        );

        let indent = " ".repeat(leading.len());
        if let Some(media) = &view.media {
            println!(
                "{}{}",
                indent,
                format!("[{} attached: {}]", media.kind.label(), media.name).magenta()
            );
        }
        for (i, text) in view.choices.iter().enumerate() {
            println!("{}{}. {}", indent, format!("{}", i + 1).bold(), text);
        }
    }

    fn update_timer(&mut self, update: TimerUpdate) {
        if self.answered || self.last_seconds == Some(update.seconds_ceil) {
            return;
        }
        self.last_seconds = Some(update.seconds_ceil);
        self.prompt(update.seconds_ceil, update.fraction);
    }

    fn reveal_answer(&mut self, reveal: &Reveal) {
        self.answered = true;
        println!();
        let feedback = reveal.feedback();
        if reveal.is_correct {
            println!("{}", feedback.bright_green());
            return;
        }
        println!("{}", feedback.bright_red());
        if let Some(selected) = reveal.selected {
            println!(
                "{}",
                format!("You chose {}. {}", selected + 1, self.choices[selected]).red()
            );
        }
        if let Some(correct) = reveal.correct {
            println!(
                "{}",
                format!("The correct choice was {}. {}", correct + 1, self.choices[correct])
                    .green()
            );
        }
    }

    fn update_score(&mut self, total: u64) {
        if total > 0 || self.answered {
            println!("{}", format!("Score: {}", total).cyan());
        }
    }

    fn show_end_screen(&mut self, total: u64) {
        println!();
        println!("{}", "Quiz complete".cyan().bold());
        println!("Final score: {}", total.to_string().bold());
        println!("{}", "Thanks for playing".cyan());
    }

    fn show_empty_state(&mut self, message: &str) {
        println!("{}", message.yellow());
    }
}

pub fn cli_loop(quiz: &Quiz) -> Result<(), Error> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in io::stdin().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        debug!("[CLI] stdin closed: {}", err);
                        break;
                    }
                }
            }
        })?;

    let mut player = Player::new(quiz, Terminal::default());
    player.start(Instant::now());
    let mut input_open = true;

    while !player.is_finished() {
        let Some(deadline) = player.next_deadline() else {
            break;
        };
        let wait = deadline.saturating_duration_since(Instant::now());
        if !input_open {
            thread::sleep(wait);
            player.poll(Instant::now());
            continue;
        }

        match rx.recv_timeout(wait) {
            Ok(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    let choices_count = player.renderer().choices.len();
                    let choice = Choice::from_str(choices_count, line);
                    debug!("choice: {:?}", choice);
                    match choice {
                        Choice::Option(num) => {
                            player.select(num, Instant::now());
                        }
                        // one past the last choice counts as a wrong answer
                        Choice::DontKnow => {
                            player.select(choices_count, Instant::now());
                        }
                        Choice::Quit => {
                            println!();
                            println!("{}", "Quitting Early!".cyan());
                            return Ok(());
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("[CLI] No more input, letting the clock run out");
                input_open = false;
            }
        }
        player.poll(Instant::now());
    }
    Ok(())
}
