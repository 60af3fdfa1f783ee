//! Identifier registry.
//!
//! Issues the identifiers every generated document uses to reference every
//! other one. A registry lives for exactly one generation run and carries a
//! per-run namespace token, so two runs over the same quiz never share an
//! identifier while still producing the same document shape.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{EntryLocation, PackageError, PackageResult};

/// Longest sanitized base kept from a hint, before suffixes.
const MAX_BASE_LEN: usize = 40;

/// An interchange identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ident(String);

impl Ident {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Ident {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentKind {
    Manifest,
    Test,
    TestPart,
    Section,
    Item,
    TextItem,
    Choice,
    Feedback,
    Asset,
    Variable,
}

impl IdentKind {
    /// Prefix used when a hint is empty or cannot start an identifier.
    pub fn prefix(&self) -> &'static str {
        match self {
            IdentKind::Manifest => "manifest",
            IdentKind::Test => "test",
            IdentKind::TestPart => "part",
            IdentKind::Section => "section",
            IdentKind::Item => "item",
            IdentKind::TextItem => "text",
            IdentKind::Choice => "choice",
            IdentKind::Feedback => "feedback",
            IdentKind::Asset => "asset",
            IdentKind::Variable => "var",
        }
    }

    /// Whether identifiers of this kind name a file in the package, and so
    /// must resolve across documents.
    pub fn is_package_resource(&self) -> bool {
        matches!(
            self,
            IdentKind::Test | IdentKind::Item | IdentKind::TextItem | IdentKind::Asset
        )
    }
}

impl fmt::Display for IdentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Which feedback block of a question an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedbackSlot {
    General,
    Correct,
    Incorrect,
    Choice(usize),
}

/// Model entities identifiers can be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Manifest,
    Test,
    TestPart,
    RootSection,
    Question(EntryLocation),
    Group(usize),
    Text(usize),
    Choice {
        question: EntryLocation,
        index: usize,
    },
    Feedback {
        question: EntryLocation,
        slot: FeedbackSlot,
    },
    Asset(String),
}

impl EntityKey {
    /// The quiz entry the entity comes from; `None` for structural entities.
    pub fn location(&self) -> Option<EntryLocation> {
        match self {
            EntityKey::Question(location) => Some(*location),
            EntityKey::Group(index) | EntityKey::Text(index) => Some(EntryLocation::entry(*index)),
            EntityKey::Choice { question, .. } | EntityKey::Feedback { question, .. } => {
                Some(*question)
            }
            EntityKey::Manifest
            | EntityKey::Test
            | EntityKey::TestPart
            | EntityKey::RootSection
            | EntityKey::Asset(_) => None,
        }
    }
}

/// Issues unique identifiers for one generation run.
#[derive(Debug)]
pub struct IdentRegistry {
    namespace: String,
    strict: bool,
    bases: HashSet<String>,
    issued: BTreeMap<Ident, IdentKind>,
    bound: HashMap<EntityKey, Ident>,
    variables: BTreeSet<(Ident, Ident)>,
}

impl Default for IdentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentRegistry {
    /// Create a registry with a fresh random namespace.
    pub fn new() -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self::with_namespace(&token[..8])
    }

    /// Create a registry with a fixed namespace, for reproducible output.
    ///
    /// An empty namespace yields bare hint-derived identifiers.
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            namespace: sanitize(namespace),
            strict: false,
            bases: HashSet::new(),
            issued: BTreeMap::new(),
            bound: HashMap::new(),
            variables: BTreeSet::new(),
        }
    }

    /// In strict mode a colliding hint on an entity bound to a quiz entry
    /// fails with `DuplicateHint` instead of being suffixed.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Issue a new identifier of `kind`, derived from `hint` when given.
    ///
    /// A colliding base is always suffixed.
    pub fn issue(&mut self, kind: IdentKind, hint: Option<&str>) -> Ident {
        let base = base_for(kind, hint);
        let unique_base = first_free(base, |candidate| self.bases.contains(candidate));
        self.bases.insert(unique_base.clone());

        let ident = if self.namespace.is_empty() {
            Ident(unique_base)
        } else {
            Ident(format!("{unique_base}_{}", self.namespace))
        };
        self.issued.insert(ident.clone(), kind);
        ident
    }

    /// Issue an identifier bound to `key`, or return the one already bound.
    ///
    /// Strict mode only rejects hints of entities that come from a quiz
    /// entry; structural identifiers never fail.
    pub fn issue_for(
        &mut self,
        key: EntityKey,
        kind: IdentKind,
        hint: Option<&str>,
    ) -> PackageResult<Ident> {
        if let Some(existing) = self.bound.get(&key) {
            return Ok(existing.clone());
        }
        if self.strict {
            let hint = hint.filter(|h| !sanitize(h).is_empty());
            if let (Some(hint), Some(location)) = (hint, key.location()) {
                if self.bases.contains(&base_for(kind, Some(hint))) {
                    return Err(PackageError::DuplicateHint {
                        location,
                        kind,
                        hint: hint.to_string(),
                    });
                }
            }
        }
        let ident = self.issue(kind, hint);
        self.bound.insert(key, ident.clone());
        Ok(ident)
    }

    /// The identifier previously bound to `key`.
    pub fn lookup(&self, key: &EntityKey) -> Option<&Ident> {
        self.bound.get(key)
    }

    /// Issue an item-scoped variable identifier such as `RESPONSE`.
    ///
    /// Variable names are unique within their owning item rather than across
    /// the package, so the well-known names LMS scoring relies on are kept.
    pub fn issue_variable(&mut self, owner: &Ident, name: &str) -> Ident {
        let base = base_for(IdentKind::Variable, Some(name)).to_uppercase();
        let unique = first_free(base, |candidate| {
            self.variables
                .contains(&(owner.clone(), Ident(candidate.to_string())))
        });
        let ident = Ident(unique);
        self.variables.insert((owner.clone(), ident.clone()));
        ident
    }

    /// Whether `name` was issued as a variable of `owner`.
    pub fn is_issued_variable(&self, owner: &Ident, name: &Ident) -> bool {
        self.variables.contains(&(owner.clone(), name.clone()))
    }

    /// Whether `ident` was issued by this registry.
    pub fn contains(&self, ident: &str) -> bool {
        self.issued.contains_key(ident)
    }

    pub fn kind_of(&self, ident: &str) -> Option<IdentKind> {
        self.issued.get(ident).copied()
    }

    /// All issued identifiers, in sorted order.
    pub fn issued(&self) -> impl Iterator<Item = (&Ident, IdentKind)> {
        self.issued.iter().map(|(ident, kind)| (ident, *kind))
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

/// `base` when free, otherwise the first free `base_N` with `N >= 2`.
fn first_free(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Sanitized base for a hint, falling back to the kind prefix.
fn base_for(kind: IdentKind, hint: Option<&str>) -> String {
    let sanitized = hint.map(sanitize).unwrap_or_default();
    match sanitized.chars().next() {
        None => kind.prefix().to_string(),
        Some(first) if first.is_ascii_alphabetic() => sanitized,
        Some(_) => format!("{}_{}", kind.prefix(), sanitized),
    }
}

/// Reduce a hint to `[a-z0-9_.-]`, collapsing everything else into single
/// underscores.
fn sanitize(hint: &str) -> String {
    let mut out = String::with_capacity(hint.len());
    for c in hint.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.truncate(MAX_BASE_LEN);
    out.trim_end_matches(['_', '-', '.']).to_string()
}
