//! Core trait definitions for package generators and schema dialects.
//!
//! Dialects are implemented by the `qtipack-render` crate; the assembler in
//! [`crate::package`] drives them.

use crate::assessment::TestDocument;
use crate::error::PackageResult;
use crate::item::ItemDocument;
use crate::manifest::ManifestDocument;
use crate::model::{AssetMap, PackageFormat, Quiz};
use crate::package::Package;

// ---------------------------------------------------------------------------
// Dialect trait
// ---------------------------------------------------------------------------

/// Serializes schema-neutral documents into one interchange schema version.
///
/// Each method returns the complete document body, XML declaration included.
pub trait Dialect: Send + Sync {
    /// The schema version this dialect writes.
    fn format(&self) -> PackageFormat;

    fn write_item(&self, item: &ItemDocument) -> String;

    fn write_test(&self, test: &TestDocument) -> String;

    fn write_manifest(&self, manifest: &ManifestDocument) -> String;
}

impl<D: Dialect + ?Sized> Dialect for Box<D> {
    fn format(&self) -> PackageFormat {
        (**self).format()
    }

    fn write_item(&self, item: &ItemDocument) -> String {
        (**self).write_item(item)
    }

    fn write_test(&self, test: &TestDocument) -> String {
        (**self).write_test(test)
    }

    fn write_manifest(&self, manifest: &ManifestDocument) -> String {
        (**self).write_manifest(manifest)
    }
}

// ---------------------------------------------------------------------------
// Package generator trait
// ---------------------------------------------------------------------------

/// Anything that turns a quiz into a complete package.
///
/// Each call is a fresh, full generation; no state carries over between calls.
pub trait PackageGenerator: Send + Sync {
    fn format(&self) -> PackageFormat;

    /// Generate a package, or fail without producing any output.
    fn generate(&self, quiz: &Quiz, assets: &AssetMap) -> PackageResult<Package>;
}
