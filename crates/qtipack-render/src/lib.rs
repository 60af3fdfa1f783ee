//! qtipack-render: schema dialects for qtipack packages.
//!
//! Implements the `Dialect` trait for IMS QTI 2.1 and 3.0, and picks the
//! right one for a [`PackageFormat`].

pub mod qti21;
pub mod qti30;
pub mod xml;

use qtipack_core::model::PackageFormat;
use qtipack_core::package::{Assembler, AssemblerOptions};
use qtipack_core::traits::{Dialect, PackageGenerator};

pub use qti21::Qti21;
pub use qti30::Qti30;

/// The dialect that writes `format`.
pub fn dialect(format: PackageFormat) -> Box<dyn Dialect> {
    tracing::debug!(%format, "selected dialect");
    match format {
        PackageFormat::Qti21 => Box::new(Qti21),
        PackageFormat::Qti30 => Box::new(Qti30),
    }
}

/// A package generator for `format` configured with `options`.
pub fn generator(format: PackageFormat, options: AssemblerOptions) -> Box<dyn PackageGenerator> {
    Box::new(Assembler::with_options(dialect(format), options))
}
