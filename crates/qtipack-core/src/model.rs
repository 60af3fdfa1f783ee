//! Quiz model types for qtipack.
//!
//! These types describe an already-parsed quiz: its ordered entries, the
//! questions with their correctness data, and feedback. Nothing here carries an
//! interchange identifier; identifiers are issued during generation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A complete quiz, the immutable input to package generation.
#[derive(Debug, Clone, Default)]
pub struct Quiz {
    /// Quiz title, used for the test and manifest metadata.
    pub title: String,
    /// Quiz description (already-rendered XHTML).
    pub description: String,
    /// Top-level entries in quiz order.
    pub entries: Vec<Entry>,
}

impl Quiz {
    /// Number of items the package will contain (questions, group members and
    /// text regions).
    pub fn item_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Question(_) | Entry::Text(_) => 1,
                Entry::Group(group) => group.questions.len(),
            })
            .sum()
    }
}

/// One top-level quiz entry.
#[derive(Debug, Clone)]
pub enum Entry {
    Question(Question),
    Group(QuestionGroup),
    Text(TextRegion),
}

/// A single scored question.
#[derive(Debug, Clone)]
pub struct Question {
    /// Optional human-readable title; also the hint for the item identifier.
    pub title: Option<String>,
    /// Prompt body (already-rendered XHTML).
    pub prompt: String,
    /// Point value awarded for a fully correct response.
    pub points: f64,
    /// Question type and its correctness data.
    pub kind: QuestionKind,
    /// Question-level feedback.
    pub feedback: Feedback,
    /// Names of embedded assets referenced by the prompt.
    pub assets: Vec<String>,
}

/// The closed set of question types the interchange format supports.
#[derive(Debug, Clone)]
pub enum QuestionKind {
    SingleChoice { choices: Vec<Choice> },
    TrueFalse { choices: Vec<Choice> },
    MultipleAnswer { choices: Vec<Choice> },
    ShortAnswer { answers: Vec<String> },
    Numerical { answers: Vec<NumericAnswer> },
    Essay,
    FileUpload,
}

impl QuestionKind {
    /// A true/false question whose correct choice is `answer`.
    pub fn true_false(answer: bool) -> Self {
        QuestionKind::TrueFalse {
            choices: vec![
                Choice::new("True", answer),
                Choice::new("False", !answer),
            ],
        }
    }

    /// Stable snake_case name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice { .. } => "single_choice",
            QuestionKind::TrueFalse { .. } => "true_false",
            QuestionKind::MultipleAnswer { .. } => "multiple_answer",
            QuestionKind::ShortAnswer { .. } => "short_answer",
            QuestionKind::Numerical { .. } => "numerical",
            QuestionKind::Essay => "essay",
            QuestionKind::FileUpload => "file_upload",
        }
    }

    /// Choices for choice-bearing kinds.
    pub fn choices(&self) -> Option<&[Choice]> {
        match self {
            QuestionKind::SingleChoice { choices }
            | QuestionKind::TrueFalse { choices }
            | QuestionKind::MultipleAnswer { choices } => Some(choices),
            _ => None,
        }
    }

    /// Whether responses to this kind are scored automatically.
    pub fn is_auto_scored(&self) -> bool {
        !matches!(self, QuestionKind::Essay | QuestionKind::FileUpload)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One answer option of a choice-bearing question.
#[derive(Debug, Clone)]
pub struct Choice {
    /// Source label (e.g. "a"), informational only.
    pub label: String,
    /// Choice body (already-rendered XHTML).
    pub text: String,
    /// Whether selecting this choice is part of the correct response.
    pub correct: bool,
    /// Feedback shown when this choice is selected.
    pub feedback: Option<String>,
}

impl Choice {
    pub fn new(text: impl Into<String>, correct: bool) -> Self {
        Self {
            label: String::new(),
            text: text.into(),
            correct,
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

/// An accepted numerical answer.
///
/// Either an exact value with a symmetric tolerance, or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericAnswer {
    Range {
        min: f64,
        max: f64,
    },
    Exact {
        value: f64,
        #[serde(default)]
        tolerance: f64,
    },
}

impl NumericAnswer {
    pub fn exact(value: f64, tolerance: f64) -> Self {
        NumericAnswer::Exact { value, tolerance }
    }

    pub fn range(min: f64, max: f64) -> Self {
        NumericAnswer::Range { min, max }
    }

    /// Inclusive `(min, max)` bounds accepted for full credit.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            NumericAnswer::Range { min, max } => (min, max),
            NumericAnswer::Exact { value, tolerance } => (value - tolerance, value + tolerance),
        }
    }

    /// A representative value inside the accepted bounds.
    pub fn representative(&self) -> f64 {
        match *self {
            NumericAnswer::Exact { value, .. } => value,
            NumericAnswer::Range { min, max } => min + (max - min) / 2.0,
        }
    }
}

/// Question-level feedback bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feedback {
    /// Shown regardless of the response.
    #[serde(default)]
    pub general: Option<String>,
    /// Shown when the response is fully correct.
    #[serde(default)]
    pub correct: Option<String>,
    /// Shown when the response is not fully correct.
    #[serde(default)]
    pub incorrect: Option<String>,
}

/// Returns the feedback body if it is present and not blank.
pub fn non_empty(body: &Option<String>) -> Option<&str> {
    body.as_deref().filter(|s| !s.trim().is_empty())
}

/// A set of questions from which the LMS randomly picks `pick`.
#[derive(Debug, Clone)]
pub struct QuestionGroup {
    pub title: Option<String>,
    /// Number of questions selected per attempt.
    pub pick: usize,
    pub questions: Vec<Question>,
}

/// An unscored block of narrative text between questions.
#[derive(Debug, Clone)]
pub struct TextRegion {
    pub title: Option<String>,
    /// Body (already-rendered XHTML).
    pub text: String,
    pub assets: Vec<String>,
}

/// A rendered asset (image, rendered equation, ...) supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl Asset {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }
}

/// Resolved assets keyed by their reference name.
pub type AssetMap = BTreeMap<String, Asset>;

/// Interchange schema versions a package can be generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    /// IMS QTI 2.1.
    Qti21,
    /// IMS QTI 3.0.
    #[default]
    Qti30,
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageFormat::Qti21 => write!(f, "qti21"),
            PackageFormat::Qti30 => write!(f, "qti30"),
        }
    }
}

impl FromStr for PackageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['.', '-', '_'], "").as_str() {
            "qti21" | "21" => Ok(PackageFormat::Qti21),
            "qti30" | "qti3" | "30" | "3" => Ok(PackageFormat::Qti30),
            other => Err(format!("unknown package format: {other}")),
        }
    }
}
