//! The `qtipack build` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use qtipack_core::model::{AssetMap, PackageFormat};
use qtipack_core::package::{AssemblerOptions, AssetFile, PackageSummary};
use qtipack_core::parser;

use crate::config::load_config_from;

pub struct BuildArgs {
    pub quiz: PathBuf,
    pub format: Option<PackageFormat>,
    pub output: Option<PathBuf>,
    pub assets: Option<PathBuf>,
    pub strict: bool,
    pub shuffle: bool,
    pub namespace: Option<String>,
    pub json: bool,
    pub config: Option<PathBuf>,
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let quiz = parser::parse_quiz(&args.quiz)?;
    for warning in parser::validate_quiz(&quiz) {
        match &warning.location {
            Some(location) => tracing::warn!(%location, "{}", warning.message),
            None => tracing::warn!("{}", warning.message),
        }
    }

    let assets = match args.assets.or(config.assets_dir) {
        Some(dir) => parser::load_asset_directory(&dir)?,
        None => AssetMap::new(),
    };

    let format = args.format.unwrap_or(config.default_format);
    let options = AssemblerOptions {
        strict_identifiers: args.strict || config.strict_identifiers,
        namespace: args.namespace,
        shuffle_choices: args.shuffle || config.shuffle_choices,
    };
    let package = qtipack_render::generator(format, options)
        .generate(&quiz, &assets)
        .with_context(|| format!("failed to build package from {}", args.quiz.display()))?;

    let output = args.output.unwrap_or_else(|| {
        let stem = args
            .quiz
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string());
        config.output_dir.join(stem)
    });
    package.write_to_dir(&output)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(package.summary())?);
    } else {
        print_summary(package.summary());
        print_assets(&package.assets);
        println!("Package written to: {}", output.display());
    }

    Ok(())
}

fn print_summary(summary: &PackageSummary) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Item", "Title", "Kind", "Points", "Path"]);
    for item in &summary.items {
        table.add_row(vec![
            Cell::new(&item.identifier),
            Cell::new(&item.title),
            Cell::new(&item.kind),
            Cell::new(format!("{:.1}", item.points)),
            Cell::new(&item.path),
        ]);
    }

    println!("{} ({})", summary.title, summary.format);
    println!("{table}");
    println!(
        "{} item(s), {} group(s), {} asset(s), {} file(s), {:.1} point(s)",
        summary.items.len(),
        summary.groups,
        summary.assets,
        summary.files,
        summary.total_points()
    );
}

fn print_assets(assets: &[AssetFile]) {
    use comfy_table::{Cell, Table};

    if assets.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Asset", "Media type", "Bytes", "Path"]);
    for asset in assets {
        table.add_row(vec![
            Cell::new(&asset.name),
            Cell::new(&asset.media_type),
            Cell::new(asset.bytes.len()),
            Cell::new(&asset.path),
        ]);
    }
    println!("{table}");
}
