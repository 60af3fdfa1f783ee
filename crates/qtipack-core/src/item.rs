//! Item builder.
//!
//! Composes one question, or one text region, into a schema-neutral
//! [`ItemDocument`]. Dialects serialize the document; the package assembler
//! checks its references.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{EntryLocation, PackageError, PackageResult};
use crate::evaluate::Response;
use crate::ident::{EntityKey, FeedbackSlot, Ident, IdentKind, IdentRegistry};
use crate::model::{Question, QuestionKind, TextRegion};
use crate::processing::{
    answer_key, float_literal, synthesize, BaseType, Cardinality, Declarations, FeedbackIdents,
    FeedbackPlan, ItemIdents, OutcomeDeclaration, OutcomeRole, ResponseProcessing, Synthesis,
};

/// Expected length hint for short-answer text entry.
pub const SHORT_ANSWER_LENGTH: usize = 20;
/// Expected length hint for numerical text entry.
pub const NUMERICAL_LENGTH: usize = 10;
/// Expected line count for essay responses.
pub const ESSAY_LINES: usize = 10;

/// Interaction families, independent of dialect vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Choice,
    TextEntry,
    ExtendedText,
    Upload,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimpleChoice {
    pub identifier: Ident,
    pub body: String,
}

/// The response-capturing element of an item.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "interaction", rename_all = "snake_case")]
pub enum Interaction {
    Choice {
        response: Ident,
        shuffle: bool,
        max_choices: usize,
        choices: Vec<SimpleChoice>,
    },
    TextEntry {
        response: Ident,
        expected_length: usize,
    },
    ExtendedText {
        response: Ident,
        expected_lines: usize,
    },
    Upload {
        response: Ident,
    },
}

impl Interaction {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Choice { .. } => InteractionKind::Choice,
            Interaction::TextEntry { .. } => InteractionKind::TextEntry,
            Interaction::ExtendedText { .. } => InteractionKind::ExtendedText,
            Interaction::Upload { .. } => InteractionKind::Upload,
        }
    }

    pub fn response(&self) -> &Ident {
        match self {
            Interaction::Choice { response, .. }
            | Interaction::TextEntry { response, .. }
            | Interaction::ExtendedText { response, .. }
            | Interaction::Upload { response } => response,
        }
    }
}

/// Content of the item body.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "body", rename_all = "snake_case")]
pub enum ItemBody {
    Question {
        prompt: String,
        interaction: Interaction,
    },
    Text {
        title: Option<String>,
        html: String,
    },
}

/// A feedback block, shown when `outcome` contains `identifier`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackBlock {
    pub identifier: Ident,
    pub outcome: Ident,
    pub body: String,
}

/// A schema-neutral assessment item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDocument {
    pub identifier: Ident,
    pub title: String,
    /// Question kind name, or `"text"` for text regions.
    pub kind: &'static str,
    pub points: f64,
    pub synthesis: Synthesis,
    pub body: ItemBody,
    pub feedback: Vec<FeedbackBlock>,
    /// Names of the assets the body embeds.
    pub assets: Vec<String>,
    /// The response that should earn full points.
    #[serde(skip)]
    pub answer_key: Option<Response>,
}

impl ItemDocument {
    pub fn declarations(&self) -> &Declarations {
        &self.synthesis.declarations
    }

    pub fn processing(&self) -> &ResponseProcessing {
        &self.synthesis.processing
    }

    pub fn interaction(&self) -> Option<&Interaction> {
        match &self.body {
            ItemBody::Question { interaction, .. } => Some(interaction),
            ItemBody::Text { .. } => None,
        }
    }

    pub fn interaction_kinds(&self) -> Vec<InteractionKind> {
        self.interaction().map(Interaction::kind).into_iter().collect()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.body, ItemBody::Text { .. })
    }

    /// Registry identifiers this item references, its own included.
    pub fn references(&self) -> BTreeSet<Ident> {
        let mut refs = BTreeSet::from([self.identifier.clone()]);
        refs.extend(self.declarations().identifiers().into_iter().cloned());
        if let Some(Interaction::Choice { choices, .. }) = self.interaction() {
            refs.extend(choices.iter().map(|c| c.identifier.clone()));
        }
        for block in &self.feedback {
            refs.insert(block.identifier.clone());
            refs.insert(block.outcome.clone());
        }
        refs
    }
}

/// Issue every identifier a question's item needs.
///
/// Identifiers are bound to `location` so later stages find them by lookup.
pub fn issue_item_idents(
    registry: &mut IdentRegistry,
    question: &Question,
    location: EntryLocation,
) -> PackageResult<ItemIdents> {
    let item = registry.issue_for(
        EntityKey::Question(location),
        IdentKind::Item,
        question.title.as_deref(),
    )?;
    let response = registry.issue_variable(&item, "RESPONSE");
    let score = registry.issue_variable(&item, "SCORE");

    let choice_count = question.kind.choices().map_or(0, <[_]>::len);
    let mut choices = Vec::with_capacity(choice_count);
    for index in 0..choice_count {
        choices.push(registry.issue_for(
            EntityKey::Choice {
                question: location,
                index,
            },
            IdentKind::Choice,
            None,
        )?);
    }

    let plan = FeedbackPlan::for_question(question);
    let slot = |registry: &mut IdentRegistry, present: bool, which: FeedbackSlot| {
        if !present {
            return Ok(None);
        }
        registry
            .issue_for(
                EntityKey::Feedback {
                    question: location,
                    slot: which,
                },
                IdentKind::Feedback,
                None,
            )
            .map(Some)
    };
    let feedback_blocks = FeedbackIdents {
        general: slot(registry, plan.general.is_some(), FeedbackSlot::General)?,
        correct: slot(registry, plan.correct.is_some(), FeedbackSlot::Correct)?,
        incorrect: slot(registry, plan.incorrect.is_some(), FeedbackSlot::Incorrect)?,
        choices: plan
            .choices
            .iter()
            .enumerate()
            .map(|(i, body)| slot(registry, body.is_some(), FeedbackSlot::Choice(i)))
            .collect::<PackageResult<_>>()?,
    };

    let feedback =
        (!feedback_blocks.is_empty()).then(|| registry.issue_variable(&item, "FEEDBACK"));

    Ok(ItemIdents {
        item,
        response,
        score,
        feedback,
        choices,
        feedback_blocks,
    })
}

/// Build the item document for one question.
pub fn build_item(
    registry: &mut IdentRegistry,
    question: &Question,
    location: EntryLocation,
    shuffle_choices: bool,
) -> PackageResult<ItemDocument> {
    let ids = issue_item_idents(registry, question, location)?;
    let synthesis = synthesize(question, &ids, location)?;

    let interaction = match &question.kind {
        QuestionKind::SingleChoice { choices }
        | QuestionKind::TrueFalse { choices }
        | QuestionKind::MultipleAnswer { choices } => {
            let multiple = matches!(question.kind, QuestionKind::MultipleAnswer { .. });
            Interaction::Choice {
                response: ids.response.clone(),
                // True/false order is meaningful.
                shuffle: shuffle_choices && !matches!(question.kind, QuestionKind::TrueFalse { .. }),
                max_choices: if multiple { choices.len() } else { 1 },
                choices: choices
                    .iter()
                    .zip(&ids.choices)
                    .map(|(choice, id)| {
                        Ok(SimpleChoice {
                            identifier: id.clone(),
                            body: rewrite_asset_refs(&choice.text, &question.assets)?,
                        })
                    })
                    .collect::<PackageResult<_>>()?,
            }
        }
        QuestionKind::ShortAnswer { .. } => Interaction::TextEntry {
            response: ids.response.clone(),
            expected_length: SHORT_ANSWER_LENGTH,
        },
        QuestionKind::Numerical { .. } => Interaction::TextEntry {
            response: ids.response.clone(),
            expected_length: NUMERICAL_LENGTH,
        },
        QuestionKind::Essay => Interaction::ExtendedText {
            response: ids.response.clone(),
            expected_lines: ESSAY_LINES,
        },
        QuestionKind::FileUpload => Interaction::Upload {
            response: ids.response.clone(),
        },
    };

    let feedback = feedback_blocks(question, &ids)?;
    let title = question
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("Question {}", location_ordinal(location)));

    let item = ItemDocument {
        answer_key: answer_key(question, &ids),
        identifier: ids.item,
        title,
        kind: question.kind.name(),
        points: question.points,
        synthesis,
        body: ItemBody::Question {
            prompt: rewrite_asset_refs(&question.prompt, &question.assets)?,
            interaction,
        },
        feedback,
        assets: dedup(&question.assets),
    };
    check_item(&item)?;

    tracing::debug!(
        item = %item.identifier,
        kind = item.kind,
        %location,
        "built assessment item"
    );
    Ok(item)
}

/// Build the unscored item for a text region at top-level `entry`.
pub fn build_text_item(
    registry: &mut IdentRegistry,
    region: &TextRegion,
    entry: usize,
) -> PackageResult<ItemDocument> {
    let identifier = registry.issue_for(
        EntityKey::Text(entry),
        IdentKind::TextItem,
        region.title.as_deref(),
    )?;
    let score = registry.issue_variable(&identifier, "SCORE");
    let title = region
        .title
        .clone()
        .filter(|t| !t.trim().is_empty());

    let synthesis = Synthesis {
        declarations: Declarations {
            response: None,
            outcomes: vec![OutcomeDeclaration {
                identifier: score,
                role: OutcomeRole::Score,
                cardinality: Cardinality::Single,
                base_type: BaseType::Float,
                default_value: Some(float_literal(0.0)),
                normal_maximum: None,
                human_scored: false,
            }],
        },
        processing: ResponseProcessing::default(),
    };

    let item = ItemDocument {
        identifier,
        title: title.clone().unwrap_or_else(|| "Text".to_string()),
        kind: "text",
        points: 0.0,
        synthesis,
        body: ItemBody::Text {
            title,
            html: rewrite_asset_refs(&region.text, &region.assets)?,
        },
        feedback: vec![],
        assets: dedup(&region.assets),
        answer_key: None,
    };
    check_item(&item)?;
    tracing::debug!(item = %item.identifier, entry = entry + 1, "built text item");
    Ok(item)
}

fn feedback_blocks(question: &Question, ids: &ItemIdents) -> PackageResult<Vec<FeedbackBlock>> {
    let Some(outcome) = &ids.feedback else {
        return Ok(vec![]);
    };
    let plan = FeedbackPlan::for_question(question);
    let blocks = &ids.feedback_blocks;

    let mut pairs: Vec<(&Ident, &str)> = Vec::new();
    if let (Some(id), Some(body)) = (&blocks.correct, plan.correct) {
        pairs.push((id, body));
    }
    if let (Some(id), Some(body)) = (&blocks.incorrect, plan.incorrect) {
        pairs.push((id, body));
    }
    for (id, body) in blocks.choices.iter().zip(&plan.choices) {
        if let (Some(id), Some(body)) = (id, body) {
            pairs.push((id, body));
        }
    }
    if let (Some(id), Some(body)) = (&blocks.general, plan.general) {
        pairs.push((id, body));
    }

    pairs
        .into_iter()
        .map(|(id, body)| {
            Ok(FeedbackBlock {
                identifier: id.clone(),
                outcome: outcome.clone(),
                body: rewrite_asset_refs(body, &question.assets)?,
            })
        })
        .collect()
}

/// Verify the item only uses variables it declares.
fn check_item(item: &ItemDocument) -> PackageResult<()> {
    let declared = item.declarations().identifiers();
    let document = item.identifier.to_string();

    if let Some(interaction) = item.interaction() {
        let response = interaction.response();
        let matches = item
            .declarations()
            .response
            .as_ref()
            .is_some_and(|r| &r.identifier == response);
        if !matches {
            return Err(PackageError::integrity(
                document,
                format!("interaction response {response} has no response declaration"),
            ));
        }
    }
    for var in item.processing().variables() {
        if !declared.contains(var) {
            return Err(PackageError::integrity(
                document,
                format!("response processing uses undeclared variable {var}"),
            ));
        }
    }
    for block in &item.feedback {
        if !declared.contains(&block.outcome) {
            return Err(PackageError::integrity(
                document,
                format!("feedback block {} shown by undeclared outcome", block.identifier),
            ));
        }
    }
    Ok(())
}

/// Rewrite `src="name"` references to embedded assets so they resolve from
/// the item's location in the package.
pub fn rewrite_asset_refs(html: &str, assets: &[String]) -> PackageResult<String> {
    let mut out = html.to_string();
    for name in assets {
        crate::package::check_asset_name(name)?;
        let href = crate::package::asset_href_from_item(name);
        for quote in ['"', '\''] {
            let from = format!("src={quote}{name}{quote}");
            let to = format!("src={quote}{href}{quote}");
            out = out.replace(&from, &to);
        }
    }
    Ok(out)
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .filter(|n| seen.insert(n.as_str()))
        .cloned()
        .collect()
}

fn location_ordinal(location: EntryLocation) -> String {
    match location.member {
        Some(member) => format!("{}.{}", location.entry + 1, member + 1),
        None => format!("{}", location.entry + 1),
    }
}
