//! Package assembler.
//!
//! Orchestrates a full generation run: issue identifiers, build items, the
//! test and the manifest, serialize them through a [`Dialect`], check
//! referential integrity, and hand back the `{path -> bytes}` mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::assessment::{build_test, TestDocument};
use crate::error::{EntryLocation, PackageError, PackageResult};
use crate::ident::{Ident, IdentRegistry};
use crate::item::{build_item, build_text_item, InteractionKind, ItemDocument};
use crate::manifest::{build_manifest, ManifestDocument, ResourceKind};
use crate::model::{AssetMap, Entry, PackageFormat, Quiz};
use crate::traits::{Dialect, PackageGenerator};

// ---------------------------------------------------------------------------
// Package layout
// ---------------------------------------------------------------------------

pub const MANIFEST_PATH: &str = "imsmanifest.xml";
pub const TESTS_DIR: &str = "tests";
pub const ITEMS_DIR: &str = "items";
pub const ASSETS_DIR: &str = "assets";

pub fn item_path(identifier: &Ident) -> String {
    format!("{ITEMS_DIR}/{identifier}.xml")
}

pub fn test_path(identifier: &Ident) -> String {
    format!("{TESTS_DIR}/{identifier}.xml")
}

pub fn asset_path(name: &str) -> String {
    format!("{ASSETS_DIR}/{name}")
}

/// Href of an item as seen from the test document.
pub fn item_href_from_test(identifier: &Ident) -> String {
    format!("../{}", item_path(identifier))
}

/// Href of an asset as seen from an item document.
pub fn asset_href_from_item(name: &str) -> String {
    format!("../{}", asset_path(name))
}

/// Reject asset names that would escape the assets directory.
pub fn check_asset_name(name: &str) -> PackageResult<()> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(PackageError::integrity(
            ASSETS_DIR,
            format!("asset name {name:?} is not a relative path inside the package"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    AssessmentItem,
    AssessmentTest,
    Manifest,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::AssessmentItem => write!(f, "assessment item"),
            DocumentKind::AssessmentTest => write!(f, "assessment test"),
            DocumentKind::Manifest => write!(f, "manifest"),
        }
    }
}

/// One serialized document of the package.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub kind: DocumentKind,
    pub identifier: Ident,
    /// Package-relative path.
    pub path: String,
    pub body: String,
    /// Registry identifiers the document references.
    pub references: BTreeSet<Ident>,
}

/// An embedded asset copied into the package.
#[derive(Debug, Clone)]
pub struct AssetFile {
    pub name: String,
    pub path: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// A complete, integrity-checked package.
#[derive(Debug, Clone)]
pub struct Package {
    pub format: PackageFormat,
    pub title: String,
    /// Manifest first, then the test, then items in quiz order.
    pub documents: Vec<GeneratedDocument>,
    pub assets: Vec<AssetFile>,
    summary: PackageSummary,
}

impl Package {
    /// Every file of the package as `(path, bytes)`, in package order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.documents
            .iter()
            .map(|d| (d.path.as_str(), d.body.as_bytes()))
            .chain(self.assets.iter().map(|a| (a.path.as_str(), a.bytes.as_slice())))
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files().find(|(p, _)| *p == path).map(|(_, bytes)| bytes)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files().map(|(path, _)| path).collect()
    }

    pub fn documents(&self) -> &[GeneratedDocument] {
        &self.documents
    }

    pub fn documents_of(&self, kind: DocumentKind) -> impl Iterator<Item = &GeneratedDocument> {
        self.documents.iter().filter(move |d| d.kind == kind)
    }

    pub fn manifest(&self) -> Option<&GeneratedDocument> {
        self.documents_of(DocumentKind::Manifest).next()
    }

    pub fn test(&self) -> Option<&GeneratedDocument> {
        self.documents_of(DocumentKind::AssessmentTest).next()
    }

    pub fn summary(&self) -> &PackageSummary {
        &self.summary
    }

    /// Write every file under `dir`, creating directories as needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        for (path, bytes) in self.files() {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, bytes)
                .with_context(|| format!("failed to write {}", target.display()))?;
        }
        tracing::info!(
            dir = %dir.display(),
            files = self.documents.len() + self.assets.len(),
            "wrote package"
        );
        Ok(())
    }
}

/// Serializable overview of a generated package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageSummary {
    pub format: PackageFormat,
    pub title: String,
    pub test: String,
    pub items: Vec<ItemSummary>,
    pub groups: usize,
    pub assets: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub identifier: String,
    pub title: String,
    pub kind: String,
    pub points: f64,
    pub interactions: Vec<InteractionKind>,
    pub path: String,
}

impl PackageSummary {
    /// Sum of the point values of every scored item.
    pub fn total_points(&self) -> f64 {
        self.items.iter().map(|i| i.points).sum()
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Knobs for a generation run.
#[derive(Debug, Clone, Default)]
pub struct AssemblerOptions {
    /// Fail on duplicate identifier hints instead of suffixing.
    pub strict_identifiers: bool,
    /// Fixed run namespace; random when `None`.
    pub namespace: Option<String>,
    /// Let the delivery engine shuffle choices (true/false never shuffles).
    pub shuffle_choices: bool,
}

/// The schema-neutral documents of one run, before serialization.
#[derive(Debug)]
pub struct Plan {
    pub registry: IdentRegistry,
    pub items: Vec<ItemDocument>,
    pub test: TestDocument,
    pub manifest: ManifestDocument,
}

/// Generates packages through one [`Dialect`].
#[derive(Debug, Clone)]
pub struct Assembler<D> {
    dialect: D,
    options: AssemblerOptions,
}

impl<D: Dialect> Assembler<D> {
    pub fn new(dialect: D) -> Self {
        Self::with_options(dialect, AssemblerOptions::default())
    }

    pub fn with_options(dialect: D, options: AssemblerOptions) -> Self {
        Self { dialect, options }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    fn registry(&self) -> IdentRegistry {
        let registry = match &self.options.namespace {
            Some(namespace) => IdentRegistry::with_namespace(namespace),
            None => IdentRegistry::new(),
        };
        registry.strict(self.options.strict_identifiers)
    }

    /// Build every schema-neutral document without serializing.
    pub fn plan(&self, quiz: &Quiz, assets: &AssetMap) -> PackageResult<Plan> {
        let mut registry = self.registry();
        let shuffle = self.options.shuffle_choices;

        let mut items = Vec::with_capacity(quiz.item_count());
        for (index, entry) in quiz.entries.iter().enumerate() {
            match entry {
                Entry::Question(question) => {
                    let location = EntryLocation::entry(index);
                    items.push(build_item(&mut registry, question, location, shuffle)?);
                }
                Entry::Group(group) => {
                    for (member, question) in group.questions.iter().enumerate() {
                        let location = EntryLocation::member(index, member);
                        items.push(build_item(&mut registry, question, location, shuffle)?);
                    }
                }
                Entry::Text(region) => {
                    items.push(build_text_item(&mut registry, region, index)?);
                }
            }
        }

        let test = build_test(&mut registry, quiz)?;
        let manifest = build_manifest(&mut registry, quiz, &test, &items, assets)?;

        Ok(Plan {
            registry,
            items,
            test,
            manifest,
        })
    }

    fn serialize(&self, plan: &Plan, quiz: &Quiz, assets: &AssetMap) -> Package {
        let mut documents = Vec::with_capacity(plan.items.len() + 2);
        documents.push(GeneratedDocument {
            kind: DocumentKind::Manifest,
            identifier: plan.manifest.identifier.clone(),
            path: MANIFEST_PATH.to_string(),
            body: self.dialect.write_manifest(&plan.manifest),
            references: plan.manifest.references(),
        });
        documents.push(GeneratedDocument {
            kind: DocumentKind::AssessmentTest,
            identifier: plan.test.identifier.clone(),
            path: test_path(&plan.test.identifier),
            body: self.dialect.write_test(&plan.test),
            references: plan.test.references(),
        });
        for item in &plan.items {
            documents.push(GeneratedDocument {
                kind: DocumentKind::AssessmentItem,
                identifier: item.identifier.clone(),
                path: item_path(&item.identifier),
                body: self.dialect.write_item(item),
                references: item.references(),
            });
        }

        let asset_files = plan
            .manifest
            .resources_of(ResourceKind::Asset)
            .filter_map(|resource| {
                let name = resource.href.strip_prefix(&format!("{ASSETS_DIR}/"))?;
                let asset = assets.get(name)?;
                Some(AssetFile {
                    name: name.to_string(),
                    path: resource.href.clone(),
                    media_type: asset.media_type.clone(),
                    bytes: asset.bytes.clone(),
                })
            })
            .collect::<Vec<_>>();

        let summary = PackageSummary {
            format: self.dialect.format(),
            title: quiz.title.clone(),
            test: plan.test.identifier.to_string(),
            items: plan
                .items
                .iter()
                .map(|item| ItemSummary {
                    identifier: item.identifier.to_string(),
                    title: item.title.clone(),
                    kind: item.kind.to_string(),
                    points: item.points,
                    interactions: item.interaction_kinds(),
                    path: item_path(&item.identifier),
                })
                .collect(),
            groups: plan.test.groups().count(),
            assets: asset_files.len(),
            files: documents.len() + asset_files.len(),
        };

        Package {
            format: self.dialect.format(),
            title: quiz.title.clone(),
            documents,
            assets: asset_files,
            summary,
        }
    }
}

impl<D: Dialect> PackageGenerator for Assembler<D> {
    fn format(&self) -> PackageFormat {
        self.dialect.format()
    }

    fn generate(&self, quiz: &Quiz, assets: &AssetMap) -> PackageResult<Package> {
        let plan = self.plan(quiz, assets)?;
        let package = self.serialize(&plan, quiz, assets);
        check_integrity(&package, &plan)?;

        tracing::info!(
            format = %package.format,
            title = %package.title,
            items = plan.items.len(),
            assets = package.assets.len(),
            "generated package"
        );
        Ok(package)
    }
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// Verify that the serialized package is referentially closed.
pub fn check_integrity(package: &Package, plan: &Plan) -> PackageResult<()> {
    let registry = &plan.registry;

    // Unique paths.
    let mut paths = BTreeSet::new();
    for (path, _) in package.files() {
        if !paths.insert(path) {
            return Err(PackageError::integrity(path, "path is used by more than one file"));
        }
    }

    // Every reference was issued and made it into the serialized body.
    for doc in &package.documents {
        for ident in &doc.references {
            let issued = registry.contains(ident.as_str())
                || registry.is_issued_variable(&doc.identifier, ident);
            if !issued {
                return Err(PackageError::integrity(
                    &doc.path,
                    format!("identifier {ident} was not issued by the registry"),
                ));
            }
            if !doc.body.contains(ident.as_str()) {
                return Err(PackageError::integrity(
                    &doc.path,
                    format!("identifier {ident} is missing from the serialized {}", doc.kind),
                ));
            }
        }
    }

    // Test item references resolve to item documents at the referenced path.
    let items: BTreeMap<&Ident, &GeneratedDocument> = package
        .documents_of(DocumentKind::AssessmentItem)
        .map(|d| (&d.identifier, d))
        .collect();
    let test_path_str = test_path(&plan.test.identifier);
    for item_ref in plan.test.item_refs() {
        let resolved = items
            .get(&item_ref.identifier)
            .is_some_and(|doc| item_href_from_test(&doc.identifier) == item_ref.href);
        if !resolved {
            return Err(PackageError::integrity(
                &test_path_str,
                format!("item reference {} does not resolve", item_ref.identifier),
            ));
        }
    }

    // Manifest resources resolve, and list every file except the manifest once.
    let manifest = &plan.manifest;
    let mut listed: BTreeMap<&str, usize> = BTreeMap::new();
    for resource in &manifest.resources {
        *listed.entry(resource.href.as_str()).or_default() += 1;
        let target_kind = match resource.kind {
            ResourceKind::Test => Some(DocumentKind::AssessmentTest),
            ResourceKind::Item => Some(DocumentKind::AssessmentItem),
            ResourceKind::Asset => None,
        };
        let resolves = match target_kind {
            Some(kind) => package
                .documents_of(kind)
                .any(|d| d.identifier == resource.identifier && d.path == resource.href),
            None => package.assets.iter().any(|a| a.path == resource.href),
        };
        if !resolves {
            return Err(PackageError::integrity(
                MANIFEST_PATH,
                format!("resource {} ({}) does not resolve", resource.identifier, resource.href),
            ));
        }
        for dependency in &resource.dependencies {
            if manifest.resource(dependency).is_none() {
                return Err(PackageError::integrity(
                    MANIFEST_PATH,
                    format!("resource {} depends on unknown {dependency}", resource.identifier),
                ));
            }
        }
    }
    for path in paths.iter().filter(|p| **p != MANIFEST_PATH) {
        match listed.get(path) {
            Some(1) => {}
            Some(n) => {
                return Err(PackageError::integrity(
                    MANIFEST_PATH,
                    format!("{path} is listed {n} times"),
                ))
            }
            None => {
                return Err(PackageError::integrity(
                    MANIFEST_PATH,
                    format!("{path} is not listed"),
                ))
            }
        }
    }

    tracing::debug!(files = paths.len(), "package integrity verified");
    Ok(())
}
