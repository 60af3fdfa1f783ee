//! Quiz file loader.
//!
//! Loads quizzes from TOML or JSON files and directories, validates them, and
//! collects embedded assets from disk.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::EntryLocation;
use crate::model::{
    Asset, AssetMap, Choice, Entry, Feedback, NumericAnswer, Question, QuestionGroup,
    QuestionKind, Quiz, TextRegion,
};

/// Intermediate structure shared by the TOML and JSON quiz formats.
#[derive(Debug, Deserialize)]
struct QuizFile {
    quiz: QuizHeader,
    #[serde(default)]
    entries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct QuizHeader {
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    /// Question type, `group` or `text`.
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    points: Option<f64>,
    #[serde(default)]
    choices: Vec<RawChoice>,
    /// Correct answer of a true/false question.
    #[serde(default)]
    answer: Option<bool>,
    /// Accepted short answers.
    #[serde(default)]
    answers: Vec<String>,
    /// Accepted numerical answers.
    #[serde(default)]
    numeric: Vec<NumericAnswer>,
    #[serde(default)]
    feedback: Feedback,
    #[serde(default)]
    assets: Vec<String>,
    /// Body of a text region.
    #[serde(default)]
    text: String,
    #[serde(default)]
    pick: Option<usize>,
    #[serde(default)]
    questions: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    #[serde(default)]
    label: Option<String>,
    text: String,
    #[serde(default)]
    correct: bool,
    #[serde(default)]
    feedback: Option<String>,
}

/// Parse a single quiz file; the extension selects TOML or JSON.
pub fn parse_quiz(path: &Path) -> Result<Quiz> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse quiz source text; `source_path` selects the syntax and labels errors.
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<Quiz> {
    let parsed: QuizFile = if is_json(source_path) {
        serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?
    } else {
        toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?
    };

    let entries = parsed
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            convert_entry(raw, true).with_context(|| {
                format!(
                    "{}: invalid {}",
                    source_path.display(),
                    EntryLocation::entry(index)
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Quiz {
        title: parsed.quiz.title,
        description: parsed.quiz.description,
        entries,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn convert_entry(raw: RawEntry, top_level: bool) -> Result<Entry> {
    match raw.kind.as_str() {
        "group" => {
            if !top_level {
                anyhow::bail!("groups cannot be nested");
            }
            let questions = raw
                .questions
                .into_iter()
                .enumerate()
                .map(|(i, q)| {
                    let entry = convert_entry(q, false)
                        .with_context(|| format!("group question {}", i + 1))?;
                    match entry {
                        Entry::Question(question) => Ok(question),
                        _ => anyhow::bail!("group question {} is not a question", i + 1),
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Entry::Group(QuestionGroup {
                title: raw.title,
                pick: raw.pick.unwrap_or(1),
                questions,
            }))
        }
        "text" => Ok(Entry::Text(TextRegion {
            title: raw.title,
            text: raw.text,
            assets: raw.assets,
        })),
        other => {
            let kind = question_kind(other, raw.choices, raw.answer, raw.answers, raw.numeric)?;
            Ok(Entry::Question(Question {
                title: raw.title,
                prompt: raw.prompt,
                points: raw.points.unwrap_or(1.0),
                kind,
                feedback: raw.feedback,
                assets: raw.assets,
            }))
        }
    }
}

fn question_kind(
    kind: &str,
    choices: Vec<RawChoice>,
    answer: Option<bool>,
    answers: Vec<String>,
    numeric: Vec<NumericAnswer>,
) -> Result<QuestionKind> {
    let build_choices = || -> Vec<Choice> {
        choices
            .into_iter()
            .enumerate()
            .map(|(i, c)| Choice {
                label: c.label.unwrap_or_else(|| choice_label(i)),
                text: c.text,
                correct: c.correct,
                feedback: c.feedback,
            })
            .collect()
    };

    Ok(match kind {
        "single_choice" | "multiple_choice" => QuestionKind::SingleChoice {
            choices: build_choices(),
        },
        "multiple_answer" | "multiple_answers" => QuestionKind::MultipleAnswer {
            choices: build_choices(),
        },
        "true_false" => match answer {
            Some(answer) => QuestionKind::true_false(answer),
            None => QuestionKind::TrueFalse {
                choices: build_choices(),
            },
        },
        "short_answer" | "fill_in_the_blank" => QuestionKind::ShortAnswer { answers },
        "numerical" => QuestionKind::Numerical { answers: numeric },
        "essay" => QuestionKind::Essay,
        "file_upload" => QuestionKind::FileUpload,
        other => anyhow::bail!("unknown question kind: {other}"),
    })
}

fn choice_label(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    if index < 26 {
        letter.to_string()
    } else {
        format!("{letter}{}", index / 26)
    }
}

/// Recursively load all `.toml` and `.json` quiz files from a directory.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<Quiz>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json")
        {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

/// Load every file under `dir` as an asset named by its relative path.
pub fn load_asset_directory(dir: &Path) -> Result<AssetMap> {
    let mut assets = AssetMap::new();
    collect_assets(dir, dir, &mut assets)?;
    tracing::debug!(dir = %dir.display(), count = assets.len(), "loaded assets");
    Ok(assets)
}

fn collect_assets(root: &Path, dir: &Path, assets: &mut AssetMap) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read asset directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_assets(root, &path, assets)?;
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("asset outside of {}", root.display()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read asset: {}", path.display()))?;
        assets.insert(name, Asset::new(bytes, media_type_for(&path)));
    }
    Ok(())
}

/// Guess a media type from the file extension.
pub fn media_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// A warning from quiz validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The entry the warning is about (if applicable).
    pub location: Option<EntryLocation>,
    /// Warning message.
    pub message: String,
}

/// Validate a quiz for issues that do not stop generation.
pub fn validate_quiz(quiz: &Quiz) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if quiz.title.trim().is_empty() {
        warnings.push(ValidationWarning {
            location: None,
            message: "quiz title is empty".into(),
        });
    }

    let mut questions = Vec::new();
    for (index, entry) in quiz.entries.iter().enumerate() {
        match entry {
            Entry::Question(q) => questions.push((EntryLocation::entry(index), q)),
            Entry::Group(group) => {
                if group.pick == group.questions.len() && group.pick > 0 {
                    warnings.push(ValidationWarning {
                        location: Some(EntryLocation::entry(index)),
                        message: format!(
                            "group picks all {} of its questions; selection has no effect",
                            group.pick
                        ),
                    });
                }
                for (member, q) in group.questions.iter().enumerate() {
                    questions.push((EntryLocation::member(index, member), q));
                }
            }
            Entry::Text(_) => {}
        }
    }

    // Check for duplicate titles
    let mut seen_titles = HashSet::new();
    for (location, q) in &questions {
        if let Some(title) = q.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if !seen_titles.insert(title) {
                warnings.push(ValidationWarning {
                    location: Some(*location),
                    message: format!("duplicate question title: {title}"),
                });
            }
        }
    }

    // Check for empty prompts
    for (location, q) in &questions {
        if q.prompt.trim().is_empty() {
            warnings.push(ValidationWarning {
                location: Some(*location),
                message: "prompt is empty".into(),
            });
        }
    }

    for (location, q) in &questions {
        if q.points == 0.0 {
            warnings.push(ValidationWarning {
                location: Some(*location),
                message: "question is worth zero points".into(),
            });
        }
    }

    warnings
}
