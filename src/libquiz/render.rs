use crate::libquiz::model::{MediaKind, Question};
use crate::libquiz::timer::TimerUpdate;

#[derive(Debug, Clone, PartialEq)]
pub struct MediaView<'a> {
    pub kind: MediaKind,
    pub source: &'a str,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView<'a> {
    pub title: &'a str,
    pub index: usize,
    pub count: usize,
    pub prompt: &'a str,
    pub media: Option<MediaView<'a>>,
    pub choices: Vec<&'a str>,
}

impl<'a> QuestionView<'a> {
    pub fn new(title: &'a str, question: &'a Question, index: usize, count: usize) -> Self {
        let media = question.media.as_deref().map(|source| MediaView {
            kind: MediaKind::classify(source),
            source,
            name: question
                .media_name
                .clone()
                .unwrap_or_else(|| format!("Question {} media", index + 1)),
        });
        Self {
            title,
            index,
            count,
            prompt: question.prompt.as_str(),
            media,
            choices: question.choices.iter().map(|c| c.text.as_str()).collect(),
        }
    }
}

/// Outcome of a finished question. `selected` is only set for a wrong pick
/// that maps to a real choice; `correct` is the first choice flagged correct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reveal {
    pub correct: Option<usize>,
    pub selected: Option<usize>,
    pub is_correct: bool,
    pub awarded: u64,
    pub timed_out: bool,
}

impl Reveal {
    pub fn feedback(&self) -> String {
        if self.timed_out {
            String::from("Time up! The correct answer is shown.")
        } else if self.is_correct {
            format!("Correct! +{} points", self.awarded)
        } else {
            String::from("Incorrect. The correct answer is shown.")
        }
    }
}

/// Presentation side of the player. The engine issues these commands and never
/// looks at how they are drawn.
pub trait Render {
    fn render_question(&mut self, view: &QuestionView<'_>);
    fn update_timer(&mut self, update: TimerUpdate);
    fn reveal_answer(&mut self, reveal: &Reveal);
    fn update_score(&mut self, total: u64);
    fn show_end_screen(&mut self, total: u64);
    fn show_empty_state(&mut self, message: &str);
}
