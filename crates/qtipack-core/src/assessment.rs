//! Test assembler.
//!
//! Builds the single assessment test: one test part holding one root section
//! that mirrors the quiz's top-level order. Groups become nested sections with
//! a selection count and shuffled ordering.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{EntryLocation, PackageError, PackageResult};
use crate::ident::{EntityKey, Ident, IdentKind, IdentRegistry};
use crate::model::{Entry, Quiz};
use crate::package::item_href_from_test;

/// Title given to the root section.
pub const ROOT_SECTION_TITLE: &str = "Questions";

/// How the delivery engine may navigate between items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    Linear,
    Nonlinear,
}

impl NavigationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationMode::Linear => "linear",
            NavigationMode::Nonlinear => "nonlinear",
        }
    }
}

/// When responses are submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    Individual,
    Simultaneous,
}

impl SubmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionMode::Individual => "individual",
            SubmissionMode::Simultaneous => "simultaneous",
        }
    }
}

/// Item session settings applied to the whole test part.
#[derive(Debug, Clone, Serialize)]
pub struct SessionControl {
    pub max_attempts: u32,
    pub show_feedback: bool,
    pub show_solution: bool,
    pub allow_comment: bool,
    pub allow_skipping: bool,
    pub validate_responses: bool,
}

impl Default for SessionControl {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            show_feedback: true,
            show_solution: false,
            allow_comment: false,
            allow_skipping: true,
            validate_responses: false,
        }
    }
}

/// A reference from the test to an item document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRef {
    pub identifier: Ident,
    /// Path of the item relative to the test document.
    pub href: String,
}

impl ItemRef {
    fn new(identifier: &Ident) -> Self {
        Self {
            identifier: identifier.clone(),
            href: item_href_from_test(identifier),
        }
    }
}

/// A nested section that picks `select` of its items per attempt.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSection {
    pub identifier: Ident,
    pub title: String,
    pub select: usize,
    pub shuffle: bool,
    pub items: Vec<ItemRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "part", rename_all = "snake_case")]
pub enum SectionPart {
    Item(ItemRef),
    Group(GroupSection),
}

/// The schema-neutral assessment test.
#[derive(Debug, Clone, Serialize)]
pub struct TestDocument {
    pub identifier: Ident,
    pub title: String,
    /// Test-level score outcome.
    pub score: Ident,
    pub part: Ident,
    pub navigation: NavigationMode,
    pub submission: SubmissionMode,
    pub session: SessionControl,
    pub section: Ident,
    pub section_title: String,
    pub parts: Vec<SectionPart>,
}

impl TestDocument {
    /// Every item reference, group members included, in document order.
    pub fn item_refs(&self) -> impl Iterator<Item = &ItemRef> {
        self.parts.iter().flat_map(|part| match part {
            SectionPart::Item(item) => std::slice::from_ref(item).iter(),
            SectionPart::Group(group) => group.items.iter(),
        })
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupSection> {
        self.parts.iter().filter_map(|part| match part {
            SectionPart::Group(group) => Some(group),
            SectionPart::Item(_) => None,
        })
    }

    pub fn references(&self) -> BTreeSet<Ident> {
        let mut refs = BTreeSet::from([
            self.identifier.clone(),
            self.score.clone(),
            self.part.clone(),
            self.section.clone(),
        ]);
        refs.extend(self.groups().map(|g| g.identifier.clone()));
        refs.extend(self.item_refs().map(|r| r.identifier.clone()));
        refs
    }
}

/// Build the test document.
///
/// Items must already have been built, so their identifiers are bound in
/// `registry`; a missing binding is an integrity failure.
pub fn build_test(registry: &mut IdentRegistry, quiz: &Quiz) -> PackageResult<TestDocument> {
    let identifier =
        registry.issue_for(EntityKey::Test, IdentKind::Test, Some(quiz.title.as_str()))?;
    let score = registry.issue_variable(&identifier, "SCORE");
    let part = registry.issue_for(EntityKey::TestPart, IdentKind::TestPart, None)?;
    let section = registry.issue_for(
        EntityKey::RootSection,
        IdentKind::Section,
        Some("main_section"),
    )?;

    let mut parts = Vec::with_capacity(quiz.entries.len());
    for (index, entry) in quiz.entries.iter().enumerate() {
        match entry {
            Entry::Question(_) => {
                let key = EntityKey::Question(EntryLocation::entry(index));
                parts.push(SectionPart::Item(ItemRef::new(bound(registry, &key)?)));
            }
            Entry::Text(_) => {
                let key = EntityKey::Text(index);
                parts.push(SectionPart::Item(ItemRef::new(bound(registry, &key)?)));
            }
            Entry::Group(group) => {
                let location = EntryLocation::entry(index);
                let members = group.questions.len();
                if members == 0 || group.pick == 0 || group.pick > members {
                    return Err(PackageError::InvalidGroup {
                        location,
                        pick: group.pick,
                        members,
                    });
                }
                let title = group
                    .title
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| format!("Group {}", index + 1));
                let identifier = registry.issue_for(
                    EntityKey::Group(index),
                    IdentKind::Section,
                    group.title.as_deref(),
                )?;
                let items = (0..members)
                    .map(|member| {
                        let key = EntityKey::Question(EntryLocation::member(index, member));
                        bound(registry, &key).map(ItemRef::new)
                    })
                    .collect::<PackageResult<Vec<_>>>()?;
                parts.push(SectionPart::Group(GroupSection {
                    identifier,
                    title,
                    select: group.pick,
                    shuffle: true,
                    items,
                }));
            }
        }
    }

    let test = TestDocument {
        identifier,
        title: quiz.title.clone(),
        score,
        part,
        navigation: NavigationMode::Linear,
        submission: SubmissionMode::Individual,
        session: SessionControl::default(),
        section,
        section_title: ROOT_SECTION_TITLE.to_string(),
        parts,
    };
    tracing::debug!(
        test = %test.identifier,
        items = test.item_refs().count(),
        groups = test.groups().count(),
        "built assessment test"
    );
    Ok(test)
}

fn bound<'r>(registry: &'r IdentRegistry, key: &EntityKey) -> PackageResult<&'r Ident> {
    registry.lookup(key).ok_or_else(|| {
        PackageError::integrity("assessment test", format!("no item was built for {key:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{build_item, build_text_item};
    use crate::model::{Feedback, Question, QuestionGroup, QuestionKind, TextRegion};

    fn tf(title: &str) -> Question {
        Question {
            title: Some(title.into()),
            prompt: "True?".into(),
            points: 1.0,
            kind: QuestionKind::true_false(true),
            feedback: Feedback::default(),
            assets: vec![],
        }
    }

    fn build_items(reg: &mut IdentRegistry, quiz: &Quiz) {
        for (i, entry) in quiz.entries.iter().enumerate() {
            match entry {
                Entry::Question(q) => {
                    build_item(reg, q, EntryLocation::entry(i), false).unwrap();
                }
                Entry::Text(t) => {
                    build_text_item(reg, t, i).unwrap();
                }
                Entry::Group(g) => {
                    for (j, q) in g.questions.iter().enumerate() {
                        build_item(reg, q, EntryLocation::member(i, j), false).unwrap();
                    }
                }
            }
        }
    }

    fn group_quiz(pick: usize, members: usize) -> Quiz {
        Quiz {
            title: "Groups".into(),
            description: String::new(),
            entries: vec![
                Entry::Question(tf("Warmup")),
                Entry::Group(QuestionGroup {
                    title: Some("Pool".into()),
                    pick,
                    questions: (0..members).map(|i| tf(&format!("Pool {i}"))).collect(),
                }),
                Entry::Text(TextRegion {
                    title: None,
                    text: "Done".into(),
                    assets: vec![],
                }),
            ],
        }
    }

    #[test]
    fn group_of_five_pick_three() {
        let quiz = group_quiz(3, 5);
        let mut reg = IdentRegistry::with_namespace("as");
        build_items(&mut reg, &quiz);
        let test = build_test(&mut reg, &quiz).unwrap();

        assert_eq!(test.parts.len(), 3);
        let group = test.groups().next().unwrap();
        assert_eq!(group.select, 3);
        assert_eq!(group.items.len(), 5);
        assert!(group.shuffle);
        assert_eq!(test.item_refs().count(), 7);
        assert!(matches!(test.parts[0], SectionPart::Item(_)));
        assert!(matches!(test.parts[2], SectionPart::Item(_)));
    }

    #[test]
    fn group_pick_exceeding_members_fails() {
        let quiz = group_quiz(6, 5);
        let mut reg = IdentRegistry::with_namespace("as");
        build_items(&mut reg, &quiz);
        let err = build_test(&mut reg, &quiz).unwrap_err();
        assert!(matches!(
            err,
            PackageError::InvalidGroup {
                pick: 6,
                members: 5,
                ..
            }
        ));
        assert_eq!(err.location(), Some(EntryLocation::entry(1)));
    }

    #[test]
    fn empty_or_zero_pick_groups_fail() {
        for (pick, members) in [(0, 3), (1, 0)] {
            let quiz = group_quiz(pick, members);
            let mut reg = IdentRegistry::with_namespace("as");
            build_items(&mut reg, &quiz);
            assert!(matches!(
                build_test(&mut reg, &quiz),
                Err(PackageError::InvalidGroup { .. })
            ));
        }
    }

    #[test]
    fn item_refs_point_into_items_dir() {
        let quiz = group_quiz(1, 1);
        let mut reg = IdentRegistry::with_namespace("as");
        build_items(&mut reg, &quiz);
        let test = build_test(&mut reg, &quiz).unwrap();
        for item in test.item_refs() {
            assert_eq!(item.href, format!("../items/{}.xml", item.identifier));
        }
        assert_eq!(test.identifier.as_str(), "groups_as");
    }

    #[test]
    fn unbuilt_items_are_an_integrity_error() {
        let quiz = group_quiz(1, 1);
        let mut reg = IdentRegistry::with_namespace("as");
        assert!(matches!(
            build_test(&mut reg, &quiz),
            Err(PackageError::Integrity { .. })
        ));
    }
}
