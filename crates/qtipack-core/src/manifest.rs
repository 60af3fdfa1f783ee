//! Manifest builder.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::assessment::TestDocument;
use crate::error::{PackageError, PackageResult};
use crate::ident::{EntityKey, Ident, IdentKind, IdentRegistry};
use crate::item::{InteractionKind, ItemDocument};
use crate::model::{AssetMap, Quiz};
use crate::package::{asset_path, item_path, test_path, MANIFEST_PATH};

/// Name recorded as the generating tool.
pub const GENERATOR: &str = "qtipack";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Test,
    Item,
    Asset,
}

/// One manifest resource.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub identifier: Ident,
    pub kind: ResourceKind,
    /// Path relative to the package root.
    pub href: String,
    /// Interaction families used by an item resource.
    pub interactions: Vec<InteractionKind>,
    /// Resources this one embeds or references.
    pub dependencies: Vec<Ident>,
    /// Media type of asset resources.
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageMetadata {
    pub title: String,
    pub description: String,
    pub generator: &'static str,
    /// Version marker of the generating tool.
    pub version: &'static str,
}

/// The package-level resource manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestDocument {
    pub identifier: Ident,
    pub metadata: PackageMetadata,
    pub resources: Vec<Resource>,
}

impl ManifestDocument {
    pub fn resource(&self, identifier: &Ident) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.identifier == identifier)
    }

    pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    pub fn references(&self) -> BTreeSet<Ident> {
        let mut refs = BTreeSet::from([self.identifier.clone()]);
        for resource in &self.resources {
            refs.insert(resource.identifier.clone());
            refs.extend(resource.dependencies.iter().cloned());
        }
        refs
    }
}

/// Build the manifest for a test, its items and the assets they embed.
///
/// Only assets some item embeds become resources; an embedded asset missing
/// from `assets` is an integrity failure.
pub fn build_manifest(
    registry: &mut IdentRegistry,
    quiz: &Quiz,
    test: &TestDocument,
    items: &[ItemDocument],
    assets: &AssetMap,
) -> PackageResult<ManifestDocument> {
    let identifier = registry.issue_for(
        EntityKey::Manifest,
        IdentKind::Manifest,
        Some(format!("{}_manifest", quiz.title).as_str()),
    )?;

    let mut asset_resources = Vec::new();
    let mut item_resources = Vec::with_capacity(items.len());
    for item in items {
        let mut dependencies = Vec::with_capacity(item.assets.len());
        for name in &item.assets {
            let asset = assets.get(name).ok_or_else(|| {
                PackageError::integrity(
                    item_path(&item.identifier),
                    format!("embedded asset {name:?} was not supplied"),
                )
            })?;
            let key = EntityKey::Asset(name.clone());
            let id = match registry.lookup(&key).cloned() {
                Some(id) => id,
                None => {
                    let id = registry.issue_for(key, IdentKind::Asset, Some(name.as_str()))?;
                    asset_resources.push(Resource {
                        identifier: id.clone(),
                        kind: ResourceKind::Asset,
                        href: asset_path(name),
                        interactions: vec![],
                        dependencies: vec![],
                        media_type: Some(asset.media_type.clone()),
                    });
                    id
                }
            };
            dependencies.push(id);
        }
        item_resources.push(Resource {
            identifier: item.identifier.clone(),
            kind: ResourceKind::Item,
            href: item_path(&item.identifier),
            interactions: item.interaction_kinds(),
            dependencies,
            media_type: None,
        });
    }

    let mut resources = Vec::with_capacity(1 + item_resources.len() + asset_resources.len());
    resources.push(Resource {
        identifier: test.identifier.clone(),
        kind: ResourceKind::Test,
        href: test_path(&test.identifier),
        interactions: vec![],
        dependencies: test.item_refs().map(|r| r.identifier.clone()).collect(),
        media_type: None,
    });
    resources.extend(item_resources);
    resources.extend(asset_resources);

    let manifest = ManifestDocument {
        identifier,
        metadata: PackageMetadata {
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            generator: GENERATOR,
            version: env!("CARGO_PKG_VERSION"),
        },
        resources,
    };
    tracing::debug!(
        manifest = %manifest.identifier,
        path = MANIFEST_PATH,
        resources = manifest.resources.len(),
        "built manifest"
    );
    Ok(manifest)
}
