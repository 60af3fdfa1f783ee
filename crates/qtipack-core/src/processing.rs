//! Response processing synthesis.
//!
//! Turns a question's correctness data into variable declarations and a
//! conditional scoring tree. The tree is schema-neutral; dialects decide how it
//! is spelled in XML, and [`crate::evaluate`] can run it directly.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{EntryLocation, PackageError, PackageResult};
use crate::evaluate::Response;
use crate::ident::Ident;
use crate::model::{non_empty, Choice, Feedback, NumericAnswer, Question, QuestionKind};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Whether a variable holds one value or a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    Multiple,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::Multiple => "multiple",
        }
    }
}

/// Value type of a variable or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Identifier,
    String,
    Float,
    File,
}

impl BaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::Identifier => "identifier",
            BaseType::String => "string",
            BaseType::Float => "float",
            BaseType::File => "file",
        }
    }
}

/// The variable a candidate's response is stored in.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseDeclaration {
    pub identifier: Ident,
    pub cardinality: Cardinality,
    pub base_type: BaseType,
    /// Values of the correct response, if one can be stated.
    pub correct: Vec<String>,
}

/// What an outcome variable is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeRole {
    Score,
    Feedback,
}

/// An outcome variable computed by response processing.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeDeclaration {
    pub identifier: Ident,
    pub role: OutcomeRole,
    pub cardinality: Cardinality,
    pub base_type: BaseType,
    pub default_value: Option<String>,
    /// Largest score the item can award.
    pub normal_maximum: Option<f64>,
    /// Set when a human grader, not the tree, decides the score.
    pub human_scored: bool,
}

/// All variables an item declares.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Declarations {
    pub response: Option<ResponseDeclaration>,
    pub outcomes: Vec<OutcomeDeclaration>,
}

impl Declarations {
    pub fn outcome(&self, role: OutcomeRole) -> Option<&OutcomeDeclaration> {
        self.outcomes.iter().find(|o| o.role == role)
    }

    /// Identifiers of every declared variable.
    pub fn identifiers(&self) -> BTreeSet<&Ident> {
        self.response
            .iter()
            .map(|r| &r.identifier)
            .chain(self.outcomes.iter().map(|o| &o.identifier))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Expression tree
// ---------------------------------------------------------------------------

/// A response-processing expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    Variable { identifier: Ident },
    Value { base_type: BaseType, value: String },
    /// Container built from the (flattened) values of its children.
    Multiple { items: Vec<Expr> },
    Match { left: Box<Expr>, right: Box<Expr> },
    /// `value` is contained in `container`.
    Member { value: Box<Expr>, container: Box<Expr> },
    StringMatch {
        case_sensitive: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Gte { left: Box<Expr>, right: Box<Expr> },
    Lte { left: Box<Expr>, right: Box<Expr> },
    And { operands: Vec<Expr> },
    Or { operands: Vec<Expr> },
    Not { operand: Box<Expr> },
    IsNull { operand: Box<Expr> },
}

impl Expr {
    pub fn variable(identifier: &Ident) -> Self {
        Expr::Variable {
            identifier: identifier.clone(),
        }
    }

    pub fn identifier(value: &Ident) -> Self {
        Expr::Value {
            base_type: BaseType::Identifier,
            value: value.to_string(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Value {
            base_type: BaseType::String,
            value: value.into(),
        }
    }

    pub fn float(value: f64) -> Self {
        Expr::Value {
            base_type: BaseType::Float,
            value: float_literal(value),
        }
    }

    pub fn matches(left: Expr, right: Expr) -> Self {
        Expr::Match {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn member(value: Expr, container: Expr) -> Self {
        Expr::Member {
            value: Box::new(value),
            container: Box::new(container),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Not {
            operand: Box::new(operand),
        }
    }

    /// Visit this expression and all of its children, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Variable { .. } | Expr::Value { .. } => {}
            Expr::Multiple { items: children }
            | Expr::And { operands: children }
            | Expr::Or { operands: children } => {
                for child in children {
                    child.walk(visit);
                }
            }
            Expr::Match { left, right }
            | Expr::StringMatch { left, right, .. }
            | Expr::Gte { left, right }
            | Expr::Lte { left, right } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Member { value, container } => {
                value.walk(visit);
                container.walk(visit);
            }
            Expr::Not { operand } | Expr::IsNull { operand } => operand.walk(visit),
        }
    }
}

/// A response-processing rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// `if` / `else if` branches, first match wins, then the optional `else`.
    Condition {
        branches: Vec<Branch>,
        otherwise: Vec<Rule>,
    },
    SetOutcome { identifier: Ident, value: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub condition: Expr,
    pub rules: Vec<Rule>,
}

impl Rule {
    fn walk<'a>(&'a self, visit_rule: &mut dyn FnMut(&'a Rule), visit_expr: &mut dyn FnMut(&'a Expr)) {
        visit_rule(self);
        match self {
            Rule::Condition {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    branch.condition.walk(visit_expr);
                    for rule in &branch.rules {
                        rule.walk(visit_rule, visit_expr);
                    }
                }
                for rule in otherwise {
                    rule.walk(visit_rule, visit_expr);
                }
            }
            Rule::SetOutcome { value, .. } => value.walk(visit_expr),
        }
    }
}

/// The ordered rules of an item's response processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseProcessing {
    pub rules: Vec<Rule>,
}

impl ResponseProcessing {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every variable read or written by the tree.
    pub fn variables<'a>(&'a self) -> BTreeSet<&'a Ident> {
        let mut vars = BTreeSet::new();
        let mut written = Vec::new();
        for rule in &self.rules {
            rule.walk(
                &mut |r: &'a Rule| {
                    if let Rule::SetOutcome { identifier, .. } = r {
                        written.push(identifier);
                    }
                },
                &mut |e: &'a Expr| {
                    if let Expr::Variable { identifier } = e {
                        vars.insert(identifier);
                    }
                },
            );
        }
        vars.extend(written);
        vars
    }

    /// Every identifier-typed literal in the tree (choice and feedback ids).
    pub fn identifier_values<'a>(&'a self) -> BTreeSet<&'a str> {
        let mut values = BTreeSet::new();
        for rule in &self.rules {
            rule.walk(&mut |_: &'a Rule| {}, &mut |e: &'a Expr| {
                if let Expr::Value {
                    base_type: BaseType::Identifier,
                    value,
                } = e
                {
                    values.insert(value.as_str());
                }
            });
        }
        values
    }
}

/// Declarations plus scoring tree for one item.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Synthesis {
    pub declarations: Declarations,
    pub processing: ResponseProcessing,
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Feedback block identifiers issued for one question.
#[derive(Debug, Clone, Default)]
pub struct FeedbackIdents {
    pub general: Option<Ident>,
    pub correct: Option<Ident>,
    pub incorrect: Option<Ident>,
    /// One slot per choice, `Some` when the choice has feedback.
    pub choices: Vec<Option<Ident>>,
}

impl FeedbackIdents {
    pub fn is_empty(&self) -> bool {
        self.general.is_none()
            && self.correct.is_none()
            && self.incorrect.is_none()
            && self.choices.iter().all(Option::is_none)
    }
}

/// Identifiers issued for one question before its item is built.
#[derive(Debug, Clone)]
pub struct ItemIdents {
    pub item: Ident,
    pub response: Ident,
    pub score: Ident,
    /// Present only when the question has at least one feedback block.
    pub feedback: Option<Ident>,
    pub choices: Vec<Ident>,
    pub feedback_blocks: FeedbackIdents,
}

/// Build declarations and the scoring tree for `question`.
pub fn synthesize(
    question: &Question,
    ids: &ItemIdents,
    location: EntryLocation,
) -> PackageResult<Synthesis> {
    validate_points(question.points, location)?;

    let (response, condition) = match &question.kind {
        QuestionKind::SingleChoice { choices } | QuestionKind::TrueFalse { choices } => {
            let correct = single_correct(choices, &ids.choices, location)?;
            let decl = response_decl(ids, Cardinality::Single, BaseType::Identifier, vec![
                correct.to_string(),
            ]);
            let cond = Expr::matches(Expr::variable(&ids.response), Expr::identifier(correct));
            (decl, Some(cond))
        }
        QuestionKind::MultipleAnswer { choices } => {
            check_choices(choices, &ids.choices, location)?;
            if !choices.iter().any(|c| c.correct) {
                return Err(PackageError::invalid_question(location, "no correct choice"));
            }
            let correct = choices
                .iter()
                .zip(&ids.choices)
                .filter(|(c, _)| c.correct)
                .map(|(_, id)| id.to_string())
                .collect();
            let decl =
                response_decl(ids, Cardinality::Multiple, BaseType::Identifier, correct);
            let operands = choices
                .iter()
                .zip(&ids.choices)
                .map(|(choice, id)| {
                    let selected =
                        Expr::member(Expr::identifier(id), Expr::variable(&ids.response));
                    if choice.correct {
                        selected
                    } else {
                        Expr::not(selected)
                    }
                })
                .collect();
            (decl, Some(Expr::And { operands }))
        }
        QuestionKind::ShortAnswer { answers } => {
            let answers: Vec<&str> = answers
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .collect();
            if answers.is_empty() {
                return Err(PackageError::invalid_question(
                    location,
                    "short answer has no accepted answers",
                ));
            }
            let decl = response_decl(ids, Cardinality::Single, BaseType::String, vec![
                answers[0].to_string(),
            ]);
            let operands = answers
                .iter()
                .map(|answer| Expr::StringMatch {
                    case_sensitive: false,
                    left: Box::new(Expr::variable(&ids.response)),
                    right: Box::new(Expr::string(*answer)),
                })
                .collect();
            (decl, Some(Expr::Or { operands }))
        }
        QuestionKind::Numerical { answers } => {
            if answers.is_empty() {
                return Err(PackageError::invalid_question(
                    location,
                    "numerical question has no accepted answers",
                ));
            }
            let mut operands = Vec::with_capacity(answers.len());
            for answer in answers {
                if let NumericAnswer::Exact { tolerance, .. } = answer {
                    if *tolerance < 0.0 {
                        return Err(PackageError::invalid_question(
                            location,
                            format!("negative tolerance {tolerance}"),
                        ));
                    }
                }
                let (min, max) = answer.bounds();
                if !min.is_finite() || !max.is_finite() {
                    return Err(PackageError::invalid_question(
                        location,
                        "numerical bounds must be finite",
                    ));
                }
                if min > max {
                    return Err(PackageError::invalid_question(
                        location,
                        format!("empty numerical range [{min}, {max}]"),
                    ));
                }
                operands.push(Expr::And {
                    operands: vec![
                        Expr::Gte {
                            left: Box::new(Expr::variable(&ids.response)),
                            right: Box::new(Expr::float(min)),
                        },
                        Expr::Lte {
                            left: Box::new(Expr::variable(&ids.response)),
                            right: Box::new(Expr::float(max)),
                        },
                    ],
                });
            }
            let decl = response_decl(ids, Cardinality::Single, BaseType::Float, vec![
                float_literal(answers[0].representative()),
            ]);
            (decl, Some(Expr::Or { operands }))
        }
        QuestionKind::Essay => (
            response_decl(ids, Cardinality::Single, BaseType::String, vec![]),
            None,
        ),
        QuestionKind::FileUpload => (
            response_decl(ids, Cardinality::Single, BaseType::File, vec![]),
            None,
        ),
    };

    let human_scored = condition.is_none();
    let mut outcomes = vec![OutcomeDeclaration {
        identifier: ids.score.clone(),
        role: OutcomeRole::Score,
        cardinality: Cardinality::Single,
        base_type: BaseType::Float,
        default_value: Some(float_literal(0.0)),
        normal_maximum: (question.points > 0.0).then_some(question.points),
        human_scored,
    }];
    if let Some(feedback) = &ids.feedback {
        outcomes.push(OutcomeDeclaration {
            identifier: feedback.clone(),
            role: OutcomeRole::Feedback,
            cardinality: Cardinality::Multiple,
            base_type: BaseType::Identifier,
            default_value: None,
            normal_maximum: None,
            human_scored: false,
        });
    }

    let processing = ResponseProcessing {
        rules: scoring_rules(question, ids, condition),
    };

    Ok(Synthesis {
        declarations: Declarations {
            response: Some(response),
            outcomes,
        },
        processing,
    })
}

/// The response that should earn full points, if one can be stated.
pub fn answer_key(question: &Question, ids: &ItemIdents) -> Option<Response> {
    match &question.kind {
        QuestionKind::SingleChoice { choices } | QuestionKind::TrueFalse { choices } => choices
            .iter()
            .zip(&ids.choices)
            .find(|(c, _)| c.correct)
            .map(|(_, id)| Response::Identifier(id.to_string())),
        QuestionKind::MultipleAnswer { choices } => Some(Response::Identifiers(
            choices
                .iter()
                .zip(&ids.choices)
                .filter(|(c, _)| c.correct)
                .map(|(_, id)| id.to_string())
                .collect(),
        )),
        QuestionKind::ShortAnswer { answers } => answers
            .iter()
            .map(|a| a.trim())
            .find(|a| !a.is_empty())
            .map(|a| Response::Text(a.to_string())),
        QuestionKind::Numerical { answers } => answers
            .first()
            .map(|a| Response::Number(a.representative())),
        QuestionKind::Essay | QuestionKind::FileUpload => None,
    }
}

/// Render a float the way interchange documents expect (`2.0`, `1.4142`).
pub fn float_literal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn validate_points(points: f64, location: EntryLocation) -> PackageResult<()> {
    if !points.is_finite() || points < 0.0 {
        return Err(PackageError::invalid_question(
            location,
            format!("point value must be a non-negative number, got {points}"),
        ));
    }
    Ok(())
}

fn check_choices(
    choices: &[Choice],
    idents: &[Ident],
    location: EntryLocation,
) -> PackageResult<()> {
    if choices.is_empty() {
        return Err(PackageError::invalid_question(location, "question has no choices"));
    }
    if choices.len() != idents.len() {
        return Err(PackageError::integrity(
            location.to_string(),
            format!(
                "{} choices but {} choice identifiers issued",
                choices.len(),
                idents.len()
            ),
        ));
    }
    Ok(())
}

fn single_correct<'a>(
    choices: &[Choice],
    idents: &'a [Ident],
    location: EntryLocation,
) -> PackageResult<&'a Ident> {
    check_choices(choices, idents, location)?;
    let mut correct = choices.iter().zip(idents).filter(|(c, _)| c.correct);
    match (correct.next(), correct.next()) {
        (Some((_, id)), None) => Ok(id),
        (None, _) => Err(PackageError::invalid_question(location, "no correct choice")),
        (Some(_), Some(_)) => Err(PackageError::invalid_question(
            location,
            "single-choice question has more than one correct choice",
        )),
    }
}

fn response_decl(
    ids: &ItemIdents,
    cardinality: Cardinality,
    base_type: BaseType,
    correct: Vec<String>,
) -> ResponseDeclaration {
    ResponseDeclaration {
        identifier: ids.response.clone(),
        cardinality,
        base_type,
        correct,
    }
}

/// `FEEDBACK := FEEDBACK + {block}`.
fn show_feedback(feedback_var: &Ident, block: &Ident) -> Rule {
    Rule::SetOutcome {
        identifier: feedback_var.clone(),
        value: Expr::Multiple {
            items: vec![Expr::variable(feedback_var), Expr::identifier(block)],
        },
    }
}

fn scoring_rules(question: &Question, ids: &ItemIdents, condition: Option<Expr>) -> Vec<Rule> {
    let mut rules = Vec::new();
    let blocks = &ids.feedback_blocks;

    if let Some(condition) = condition {
        let mut on_correct = vec![Rule::SetOutcome {
            identifier: ids.score.clone(),
            value: Expr::float(question.points),
        }];
        let mut on_incorrect = vec![Rule::SetOutcome {
            identifier: ids.score.clone(),
            value: Expr::float(0.0),
        }];
        if let Some(var) = &ids.feedback {
            if let Some(block) = &blocks.correct {
                on_correct.push(show_feedback(var, block));
            }
            if let Some(block) = &blocks.incorrect {
                on_incorrect.push(show_feedback(var, block));
            }
        }
        rules.push(Rule::Condition {
            branches: vec![Branch {
                condition,
                rules: on_correct,
            }],
            otherwise: on_incorrect,
        });
    }

    let Some(var) = &ids.feedback else {
        return rules;
    };

    // Per-choice feedback fires whenever that choice is part of the response.
    let multiple = matches!(question.kind, QuestionKind::MultipleAnswer { .. });
    for (choice_id, block) in ids.choices.iter().zip(&blocks.choices) {
        let Some(block) = block else { continue };
        let selected = if multiple {
            Expr::member(Expr::identifier(choice_id), Expr::variable(&ids.response))
        } else {
            Expr::matches(Expr::variable(&ids.response), Expr::identifier(choice_id))
        };
        rules.push(Rule::Condition {
            branches: vec![Branch {
                condition: selected,
                rules: vec![show_feedback(var, block)],
            }],
            otherwise: vec![],
        });
    }

    if let Some(block) = &blocks.general {
        rules.push(show_feedback(var, block));
    }

    rules
}

/// Which feedback blocks a question materializes.
pub(crate) struct FeedbackPlan<'a> {
    pub general: Option<&'a str>,
    pub correct: Option<&'a str>,
    pub incorrect: Option<&'a str>,
    pub choices: Vec<Option<&'a str>>,
}

impl<'a> FeedbackPlan<'a> {
    pub fn for_question(question: &'a Question) -> Self {
        let Feedback {
            general,
            correct,
            incorrect,
        } = &question.feedback;
        // Correct/incorrect feedback is meaningless without an automatic score.
        let scored = question.kind.is_auto_scored();
        Self {
            general: non_empty(general),
            correct: non_empty(correct).filter(|_| scored),
            incorrect: non_empty(incorrect).filter(|_| scored),
            choices: question
                .kind
                .choices()
                .unwrap_or_default()
                .iter()
                .map(|c| non_empty(&c.feedback))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{IdentKind, IdentRegistry};

    fn ids_for(reg: &mut IdentRegistry, choices: usize, with_feedback: bool) -> ItemIdents {
        let item = reg.issue(IdentKind::Item, Some("q"));
        ItemIdents {
            response: reg.issue_variable(&item, "RESPONSE"),
            score: reg.issue_variable(&item, "SCORE"),
            feedback: with_feedback.then(|| reg.issue_variable(&item, "FEEDBACK")),
            choices: (0..choices)
                .map(|_| reg.issue(IdentKind::Choice, None))
                .collect(),
            feedback_blocks: FeedbackIdents {
                choices: vec![None; choices],
                ..Default::default()
            },
            item,
        }
    }

    fn question(kind: QuestionKind, points: f64) -> Question {
        Question {
            title: None,
            prompt: "Prompt".into(),
            points,
            kind,
            feedback: Feedback::default(),
            assets: vec![],
        }
    }

    #[test]
    fn single_choice_declares_single_identifier() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 3, false);
        let q = question(
            QuestionKind::SingleChoice {
                choices: vec![
                    Choice::new("6", false),
                    Choice::new("1", false),
                    Choice::new("5", true),
                ],
            },
            1.0,
        );
        let synth = synthesize(&q, &ids, EntryLocation::entry(0)).unwrap();
        let response = synth.declarations.response.as_ref().unwrap();
        assert_eq!(response.cardinality, Cardinality::Single);
        assert_eq!(response.base_type, BaseType::Identifier);
        assert_eq!(response.correct, vec![ids.choices[2].to_string()]);
        assert_eq!(synth.processing.rules.len(), 1);
        assert!(synth.processing.identifier_values().contains(ids.choices[2].as_str()));
    }

    #[test]
    fn zero_correct_choices_is_rejected() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 2, false);
        let q = question(
            QuestionKind::SingleChoice {
                choices: vec![Choice::new("a", false), Choice::new("b", false)],
            },
            1.0,
        );
        let err = synthesize(&q, &ids, EntryLocation::entry(4)).unwrap_err();
        assert!(matches!(err, PackageError::InvalidQuestion { .. }));
        assert_eq!(err.location(), Some(EntryLocation::entry(4)));

        let q = question(
            QuestionKind::MultipleAnswer {
                choices: vec![Choice::new("a", false), Choice::new("b", false)],
            },
            1.0,
        );
        assert!(synthesize(&q, &ids, EntryLocation::entry(4)).is_err());
    }

    #[test]
    fn two_correct_single_choices_is_rejected() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 2, false);
        let q = question(
            QuestionKind::SingleChoice {
                choices: vec![Choice::new("a", true), Choice::new("b", true)],
            },
            1.0,
        );
        assert!(synthesize(&q, &ids, EntryLocation::entry(0)).is_err());
    }

    #[test]
    fn multiple_answer_conjunction_covers_every_choice() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 4, false);
        let q = question(
            QuestionKind::MultipleAnswer {
                choices: vec![
                    Choice::new("Woolly mammoth", false),
                    Choice::new("Tyrannosaurus rex", true),
                    Choice::new("Triceratops", true),
                    Choice::new("Smilodon", false),
                ],
            },
            2.0,
        );
        let synth = synthesize(&q, &ids, EntryLocation::entry(0)).unwrap();
        let response = synth.declarations.response.as_ref().unwrap();
        assert_eq!(response.cardinality, Cardinality::Multiple);
        assert_eq!(response.correct.len(), 2);
        let Rule::Condition { branches, .. } = &synth.processing.rules[0] else {
            panic!("expected condition");
        };
        let Expr::And { operands } = &branches[0].condition else {
            panic!("expected conjunction");
        };
        assert_eq!(operands.len(), 4);
        assert!(matches!(operands[0], Expr::Not { .. }));
        assert!(matches!(operands[1], Expr::Member { .. }));
    }

    #[test]
    fn short_answer_is_case_insensitive_disjunction() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 0, false);
        let q = question(
            QuestionKind::ShortAnswer {
                answers: vec!["Santa".into(), "Saint Nick".into(), "  ".into()],
            },
            1.0,
        );
        let synth = synthesize(&q, &ids, EntryLocation::entry(0)).unwrap();
        let Rule::Condition { branches, .. } = &synth.processing.rules[0] else {
            panic!("expected condition");
        };
        let Expr::Or { operands } = &branches[0].condition else {
            panic!("expected disjunction");
        };
        assert_eq!(operands.len(), 2);
        assert!(matches!(
            operands[0],
            Expr::StringMatch {
                case_sensitive: false,
                ..
            }
        ));

        let empty = question(QuestionKind::ShortAnswer { answers: vec![] }, 1.0);
        assert!(synthesize(&empty, &ids, EntryLocation::entry(0)).is_err());
    }

    #[test]
    fn numerical_rejects_bad_ranges() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 0, false);
        for answer in [
            NumericAnswer::exact(1.0, -0.1),
            NumericAnswer::range(2.0, 1.0),
            NumericAnswer::exact(f64::NAN, 0.0),
        ] {
            let q = question(
                QuestionKind::Numerical {
                    answers: vec![answer],
                },
                1.0,
            );
            assert!(synthesize(&q, &ids, EntryLocation::entry(0)).is_err());
        }
    }

    #[test]
    fn essay_is_human_scored_without_tree() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 0, false);
        let q = question(QuestionKind::Essay, 5.0);
        let synth = synthesize(&q, &ids, EntryLocation::entry(0)).unwrap();
        assert!(synth.processing.is_empty());
        let score = synth.declarations.outcome(OutcomeRole::Score).unwrap();
        assert!(score.human_scored);
        assert_eq!(score.default_value.as_deref(), Some("0.0"));
        assert_eq!(score.normal_maximum, Some(5.0));

        let upload = question(QuestionKind::FileUpload, 5.0);
        let synth = synthesize(&upload, &ids, EntryLocation::entry(0)).unwrap();
        assert_eq!(
            synth.declarations.response.unwrap().base_type,
            BaseType::File
        );
    }

    #[test]
    fn negative_points_are_rejected() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 0, false);
        let q = question(QuestionKind::Essay, -1.0);
        assert!(synthesize(&q, &ids, EntryLocation::entry(0)).is_err());
    }

    #[test]
    fn feedback_rules_use_declared_variable() {
        let mut reg = IdentRegistry::with_namespace("t");
        let mut ids = ids_for(&mut reg, 2, true);
        ids.feedback_blocks.general = Some(reg.issue(IdentKind::Feedback, None));
        ids.feedback_blocks.choices[1] = Some(reg.issue(IdentKind::Feedback, None));
        let q = question(QuestionKind::true_false(true), 0.0);
        let synth = synthesize(&q, &ids, EntryLocation::entry(0)).unwrap();

        // score condition, choice feedback condition, general feedback
        assert_eq!(synth.processing.rules.len(), 3);
        let declared = synth.declarations.identifiers();
        for var in synth.processing.variables() {
            assert!(declared.contains(var), "undeclared variable {var}");
        }
        // Zero-point questions are still scored, with no normal maximum.
        let score = synth.declarations.outcome(OutcomeRole::Score).unwrap();
        assert_eq!(score.normal_maximum, None);
        assert!(!score.human_scored);
    }

    #[test]
    fn answer_keys() {
        let mut reg = IdentRegistry::with_namespace("t");
        let ids = ids_for(&mut reg, 2, false);
        let tf = question(QuestionKind::true_false(false), 1.0);
        assert_eq!(
            answer_key(&tf, &ids),
            Some(Response::Identifier(ids.choices[1].to_string()))
        );
        let num = question(
            QuestionKind::Numerical {
                answers: vec![NumericAnswer::range(1.0, 3.0)],
            },
            1.0,
        );
        assert_eq!(answer_key(&num, &ids), Some(Response::Number(2.0)));
        assert_eq!(answer_key(&question(QuestionKind::Essay, 1.0), &ids), None);
    }

    #[test]
    fn float_literals() {
        assert_eq!(float_literal(2.0), "2.0");
        assert_eq!(float_literal(0.0), "0.0");
        assert_eq!(float_literal(1.4142), "1.4142");
        assert_eq!(float_literal(-0.5), "-0.5");
    }
}
