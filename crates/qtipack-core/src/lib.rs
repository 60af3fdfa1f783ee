//! qtipack-core: quiz model, identifier registry, scoring synthesis and
//! package assembly.
//!
//! This crate turns an already-parsed [`model::Quiz`] into the schema-neutral
//! documents of an assessment interchange package and checks that they
//! reference each other consistently. Serializing those documents into a
//! concrete schema version is the job of a [`traits::Dialect`], implemented in
//! `qtipack-render`.

pub mod assessment;
pub mod error;
pub mod evaluate;
pub mod ident;
pub mod item;
pub mod manifest;
pub mod model;
pub mod package;
pub mod parser;
pub mod processing;
pub mod traits;

pub use error::{PackageError, PackageResult};
pub use model::{AssetMap, PackageFormat, Quiz};
pub use package::{Assembler, AssemblerOptions, Package};
pub use traits::{Dialect, PackageGenerator};
