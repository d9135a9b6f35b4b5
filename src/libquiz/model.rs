use log::{debug, info};
use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_QUIZ_ID: &str = "quiz_default";
pub const DEFAULT_TIME: f64 = 20.0;

fn default_points() -> String {
    String::from("standard")
}

fn default_answer_mode() -> String {
    String::from("single")
}

fn default_kind() -> String {
    String::from("quiz")
}

/// Explicit `null` is read like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_points<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::deserialize(deserializer)?.unwrap_or_else(default_points))
}

fn null_as_answer_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::deserialize(deserializer)?.unwrap_or_else(default_answer_mode))
}

fn null_as_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::deserialize(deserializer)?.unwrap_or_else(default_kind))
}

/// Accepts any JSON value and keeps it only if it is a finite number.
/// Strings, booleans and nulls in numeric fields are treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value.as_f64() {
        Some(num) if num.is_finite() => Ok(Some(num)),
        _ => {
            if !value.is_null() {
                debug!("[Model] Discarding non-numeric value {value}");
            }
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    #[serde(rename = "type", default = "default_kind", deserialize_with = "null_as_kind")]
    pub kind: String,
    #[serde(default = "default_points", deserialize_with = "null_as_points")]
    pub points: String,
    #[serde(default = "default_answer_mode", deserialize_with = "null_as_answer_mode")]
    pub answer_mode: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub base_points: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub bonus_points: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_name: Option<String>,
}

impl Question {
    /// Index of the first choice flagged correct. Only this one is highlighted on reveal.
    pub fn correct_index(&self) -> Option<usize> {
        self.choices.iter().position(|c| c.is_correct)
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        self.choices.get(choice).is_some_and(|c| c.is_correct)
    }

    /// A question can be played if it has a prompt, at least two filled answers
    /// and one of the filled answers is marked correct.
    pub fn is_playable(&self) -> bool {
        let filled: Vec<&Choice> = self
            .choices
            .iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();
        !self.prompt.trim().is_empty() && filled.len() >= 2 && filled.iter().any(|c| c.is_correct)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub desc: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub default_time: Option<f64>,
    #[serde(default = "default_points", deserialize_with = "null_as_points")]
    pub default_points: String,
    #[serde(default = "default_answer_mode", deserialize_with = "null_as_answer_mode")]
    pub default_answer_mode: String,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub base_points: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub bonus_points: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(id: String, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            desc: String::new(),
            default_time: Some(DEFAULT_TIME),
            default_points: default_points(),
            default_answer_mode: default_answer_mode(),
            base_points: None,
            bonus_points: None,
            questions: Vec::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Quiz"
        } else {
            self.title.as_str()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_default")]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub current_id: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

impl Document {
    pub fn current_quiz(&self) -> Option<&Quiz> {
        let id = self.current_id.as_deref()?;
        self.quizzes.iter().find(|q| q.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == id)
    }

    /// Points `currentId` at `id`. Returns false (and changes nothing) if no such quiz exists.
    pub fn select(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        self.current_id = Some(id.to_string());
        true
    }

    /// Start-up normalisation: guarantees at least one quiz and a valid `currentId`.
    /// Returns whether the document was changed and should be persisted.
    pub fn ensure_current(&mut self) -> bool {
        let mut changed = false;
        if self.quizzes.is_empty() {
            info!("[Setup] No quizzes stored, creating '{}'", DEFAULT_QUIZ_ID);
            self.quizzes
                .push(Quiz::new(DEFAULT_QUIZ_ID.to_string(), "My Quiz"));
            self.current_id = Some(DEFAULT_QUIZ_ID.to_string());
            changed = true;
        }
        if self.current_quiz().is_none() {
            let first = self.quizzes[0].id.clone();
            debug!("[Setup] Current quiz {:?} is missing, using {}", self.current_id, first);
            self.current_id = Some(first);
            changed = true;
        }
        changed
    }

    pub fn upsert(&mut self, quiz: Quiz) -> Upsert {
        match self.quizzes.iter_mut().find(|q| q.id == quiz.id) {
            Some(existing) => {
                *existing = quiz;
                Upsert::Replaced
            }
            None => {
                self.quizzes.push(quiz);
                Upsert::Inserted
            }
        }
    }
}

/// `prefix_` followed by seven random lowercase alphanumerics.
pub fn uid(prefix: &str) -> String {
    let suffix: String = rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{prefix}_{suffix}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub fn classify(source: &str) -> MediaKind {
        if source.starts_with("data:video") {
            MediaKind::Video
        } else if source.starts_with("data:audio") {
            MediaKind::Audio
        } else {
            MediaKind::Image
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }
}
