//! Reference evaluator for synthesized response processing.
//!
//! Runs a [`Synthesis`] against a candidate response the way a delivery
//! engine would. Used by the `validate` command to check that every answer
//! key earns full points, and by tests.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::ident::Ident;
use crate::processing::{BaseType, Expr, OutcomeRole, Rule, Synthesis};

/// A candidate's response to one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Empty,
    Identifier(String),
    Identifiers(Vec<String>),
    Text(String),
    Number(f64),
}

/// Result of running response processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    pub score: f64,
    /// Feedback block identifiers switched on, in the order they were added.
    pub feedback: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Null,
    Single(Scalar),
    Container(Vec<Scalar>),
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Text(String),
    Number(f64),
}

impl Scalar {
    fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Number(n) => n.to_string(),
        }
    }
}

impl Value {
    fn scalars(&self) -> Vec<Scalar> {
        match self {
            Value::Null => vec![],
            Value::Single(s) => vec![s.clone()],
            Value::Container(items) => items.clone(),
        }
    }

    fn truthy(&self) -> bool {
        matches!(self, Value::Single(Scalar::Number(n)) if *n != 0.0)
    }

    fn boolean(b: bool) -> Self {
        Value::Single(Scalar::Number(if b { 1.0 } else { 0.0 }))
    }
}

struct State<'a> {
    response: Option<&'a Ident>,
    candidate: Value,
    score: Option<&'a Ident>,
    score_value: f64,
    feedback_var: Option<&'a Ident>,
    feedback: Vec<String>,
}

/// Run `synthesis` against `response`.
///
/// Items without a scoring tree (human-scored) always evaluate to zero.
pub fn score(synthesis: &Synthesis, response: &Response) -> Outcome {
    let decls = &synthesis.declarations;
    let mut state = State {
        response: decls.response.as_ref().map(|r| &r.identifier),
        candidate: candidate_value(response),
        score: decls.outcome(OutcomeRole::Score).map(|o| &o.identifier),
        score_value: decls
            .outcome(OutcomeRole::Score)
            .and_then(|o| o.default_value.as_deref())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0),
        feedback_var: decls.outcome(OutcomeRole::Feedback).map(|o| &o.identifier),
        feedback: Vec::new(),
    };

    for rule in &synthesis.processing.rules {
        run_rule(rule, &mut state);
    }

    Outcome {
        score: state.score_value,
        feedback: state.feedback,
    }
}

fn candidate_value(response: &Response) -> Value {
    match response {
        Response::Empty => Value::Null,
        Response::Identifier(id) => Value::Single(Scalar::Text(id.clone())),
        Response::Identifiers(ids) if ids.is_empty() => Value::Null,
        Response::Identifiers(ids) => {
            let unique: BTreeSet<&String> = ids.iter().collect();
            Value::Container(unique.into_iter().cloned().map(Scalar::Text).collect())
        }
        Response::Text(text) if text.is_empty() => Value::Null,
        Response::Text(text) => Value::Single(Scalar::Text(text.clone())),
        Response::Number(n) => Value::Single(Scalar::Number(*n)),
    }
}

fn run_rule(rule: &Rule, state: &mut State<'_>) {
    match rule {
        Rule::Condition {
            branches,
            otherwise,
        } => {
            let chosen = branches
                .iter()
                .find(|b| eval(&b.condition, state).truthy())
                .map(|b| &b.rules)
                .unwrap_or(otherwise);
            for rule in chosen {
                run_rule(rule, state);
            }
        }
        Rule::SetOutcome { identifier, value } => {
            let value = eval(value, state);
            if Some(identifier) == state.score {
                state.score_value = value
                    .scalars()
                    .first()
                    .and_then(Scalar::as_number)
                    .unwrap_or(0.0);
            } else if Some(identifier) == state.feedback_var {
                state.feedback = value.scalars().iter().map(Scalar::as_text).collect();
            }
        }
    }
}

fn eval(expr: &Expr, state: &State<'_>) -> Value {
    match expr {
        Expr::Variable { identifier } => {
            if Some(identifier) == state.response {
                state.candidate.clone()
            } else if Some(identifier) == state.score {
                Value::Single(Scalar::Number(state.score_value))
            } else if Some(identifier) == state.feedback_var {
                if state.feedback.is_empty() {
                    Value::Null
                } else {
                    Value::Container(state.feedback.iter().cloned().map(Scalar::Text).collect())
                }
            } else {
                Value::Null
            }
        }
        Expr::Value { base_type, value } => match base_type {
            BaseType::Float => value
                .parse()
                .map(|n| Value::Single(Scalar::Number(n)))
                .unwrap_or(Value::Null),
            _ => Value::Single(Scalar::Text(value.clone())),
        },
        Expr::Multiple { items } => {
            let values: Vec<Scalar> = items.iter().flat_map(|e| eval(e, state).scalars()).collect();
            if values.is_empty() {
                Value::Null
            } else {
                Value::Container(values)
            }
        }
        Expr::Match { left, right } => {
            let (l, r) = (eval(left, state), eval(right, state));
            match (&l, &r) {
                (Value::Null, _) | (_, Value::Null) => Value::boolean(false),
                (Value::Container(a), Value::Container(b)) => {
                    let a: BTreeSet<String> = a.iter().map(Scalar::as_text).collect();
                    let b: BTreeSet<String> = b.iter().map(Scalar::as_text).collect();
                    Value::boolean(a == b)
                }
                _ => Value::boolean(l == r),
            }
        }
        Expr::Member { value, container } => {
            let needle = eval(value, state).scalars();
            let haystack = eval(container, state).scalars();
            Value::boolean(match needle.first() {
                Some(needle) => haystack.contains(needle),
                None => false,
            })
        }
        Expr::StringMatch {
            case_sensitive,
            left,
            right,
        } => {
            let l = eval(left, state).scalars();
            let r = eval(right, state).scalars();
            Value::boolean(match (l.first(), r.first()) {
                (Some(a), Some(b)) => {
                    let (a, b) = (a.as_text(), b.as_text());
                    if *case_sensitive {
                        a == b
                    } else {
                        a.to_lowercase() == b.to_lowercase()
                    }
                }
                _ => false,
            })
        }
        Expr::Gte { left, right } => compare(left, right, state, |a, b| a >= b),
        Expr::Lte { left, right } => compare(left, right, state, |a, b| a <= b),
        Expr::And { operands } => Value::boolean(operands.iter().all(|e| eval(e, state).truthy())),
        Expr::Or { operands } => Value::boolean(operands.iter().any(|e| eval(e, state).truthy())),
        Expr::Not { operand } => Value::boolean(!eval(operand, state).truthy()),
        Expr::IsNull { operand } => Value::boolean(eval(operand, state) == Value::Null),
    }
}

fn compare(left: &Expr, right: &Expr, state: &State<'_>, op: fn(f64, f64) -> bool) -> Value {
    let l = eval(left, state).scalars().first().and_then(Scalar::as_number);
    let r = eval(right, state).scalars().first().and_then(Scalar::as_number);
    Value::boolean(matches!((l, r), (Some(a), Some(b)) if op(a, b)))
}
