use crate::libquiz::model::{MediaKind, Quiz};
use crate::libquiz::player::Player;
use crate::libquiz::render::{QuestionView, Render, Reveal};
use crate::libquiz::timer::TimerUpdate;
use crate::Error;
use eframe::egui;
use eframe::egui::{Button, Color32, ProgressBar, RichText};
use log::debug;
use std::time::Instant;

const ANSWER_COLORS: [Color32; 4] = [
    Color32::from_rgb(226, 27, 60),
    Color32::from_rgb(19, 104, 206),
    Color32::from_rgb(216, 158, 0),
    Color32::from_rgb(38, 137, 12),
];
const REVEALED_CORRECT: Color32 = Color32::from_rgb(46, 160, 67);
const REVEALED_INCORRECT: Color32 = Color32::from_rgb(120, 20, 20);
const DIMMED: Color32 = Color32::from_rgb(70, 70, 70);

struct ShownQuestion {
    title: String,
    position: String,
    prompt: String,
    media: Option<String>,
    choices: Vec<String>,
}

enum View {
    Blank,
    Question(ShownQuestion),
    End(u64),
    Empty(String),
}

/// What the window currently shows; the player writes into it through `Render`.
struct Screen {
    view: View,
    timer: Option<TimerUpdate>,
    reveal: Option<Reveal>,
    score: u64,
}

impl Render for Screen {
    fn render_question(&mut self, view: &QuestionView<'_>) {
        self.reveal = None;
        self.view = View::Question(ShownQuestion {
            title: view.title.to_string(),
            position: format!("Question {} of {}", view.index + 1, view.count),
            prompt: view.prompt.to_string(),
            media: view.media.as_ref().map(|media| {
                let icon = match media.kind {
                    MediaKind::Video => "🎞",
                    MediaKind::Audio => "🔊",
                    MediaKind::Image => "🖼",
                };
                format!("{} {}", icon, media.name)
            }),
            choices: view.choices.iter().map(|c| c.to_string()).collect(),
        });
    }

    fn update_timer(&mut self, update: TimerUpdate) {
        self.timer = Some(update);
    }

    fn reveal_answer(&mut self, reveal: &Reveal) {
        self.reveal = Some(*reveal);
    }

    fn update_score(&mut self, total: u64) {
        self.score = total;
    }

    fn show_end_screen(&mut self, total: u64) {
        self.timer = None;
        self.reveal = None;
        self.view = View::End(total);
    }

    fn show_empty_state(&mut self, message: &str) {
        self.timer = None;
        self.view = View::Empty(message.to_string());
    }
}

fn answer_color(idx: usize, reveal: Option<&Reveal>) -> Color32 {
    match reveal {
        None => ANSWER_COLORS[idx % ANSWER_COLORS.len()],
        Some(reveal) if reveal.correct == Some(idx) => REVEALED_CORRECT,
        Some(reveal) if reveal.selected == Some(idx) => REVEALED_INCORRECT,
        Some(_) => DIMMED,
    }
}

struct GuiState<'q> {
    player: Player<'q, Screen>,
}

impl<'q> GuiState<'q> {
    fn new(quiz: &'q Quiz) -> Self {
        let screen = Screen {
            view: View::Blank,
            timer: None,
            reveal: None,
            score: 0,
        };
        let mut player = Player::new(quiz, screen);
        player.start(Instant::now());
        Self { player }
    }

    fn draw_question(&self, ui: &mut egui::Ui, question: &ShownQuestion) -> Option<usize> {
        let screen = self.player.renderer();
        let mut clicked = None;

        ui.label(RichText::new(question.prompt.as_str()).size(32.0).strong());
        if let Some(media) = &question.media {
            ui.label(RichText::new(media.as_str()).italics());
        }
        ui.add_space(12.0);

        let width = ui.available_width();
        for (idx, text) in question.choices.iter().enumerate() {
            let button = Button::new(RichText::new(text.as_str()).size(22.0).color(Color32::WHITE))
                .fill(answer_color(idx, screen.reveal.as_ref()))
                .min_size(egui::vec2(width, 48.0));
            if ui.add_enabled(screen.reveal.is_none(), button).clicked() {
                clicked = Some(idx);
            }
            ui.add_space(6.0);
        }

        if let Some(reveal) = &screen.reveal {
            let color = if reveal.is_correct {
                REVEALED_CORRECT
            } else {
                REVEALED_INCORRECT
            };
            ui.label(RichText::new(reveal.feedback()).size(20.0).color(color));
        }
        clicked
    }
}

impl eframe::App for GuiState<'_> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.player.poll(Instant::now());

        let screen = self.player.renderer();
        let header = match &screen.view {
            View::Question(question) => Some((question.title.clone(), question.position.clone())),
            _ => None,
        };

        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some((title, position)) = &header {
                    ui.heading(title.as_str());
                    ui.label(position.as_str());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new(format!("Score: {}", screen.score)).strong());
                });
            });
            if let Some(timer) = screen.timer {
                ui.add(
                    ProgressBar::new(timer.fraction as f32)
                        .text(format!("{}", timer.seconds_ceil)),
                );
            }
        });

        let mut clicked = None;
        egui::CentralPanel::default().show(ctx, |ui| match &self.player.renderer().view {
            View::Blank => {}
            View::Question(question) => clicked = self.draw_question(ui, question),
            View::End(total) => {
                ui.heading("Quiz complete");
                ui.label(RichText::new(format!("Final score: {}", total)).size(28.0).strong());
                ui.label("Thanks for playing");
            }
            View::Empty(message) => {
                ui.label(RichText::new(message.as_str()).size(24.0));
            }
        });

        if let Some(idx) = clicked {
            debug!("[GUI] clicked {}", idx);
            self.player.select(idx, Instant::now());
        }

        if let Some(deadline) = self.player.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
        }
    }
}

pub fn init_gui(quiz: &Quiz) -> Result<(), Error> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 520.0])
            .with_min_inner_size([360.0, 320.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Quiz Sprint",
        native_options,
        Box::new(|_cc| Ok(Box::new(GuiState::new(quiz)))),
    )?;

    Ok(())
}
