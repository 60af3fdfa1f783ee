//! The `qtipack validate` command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use qtipack_core::evaluate;
use qtipack_core::model::{Asset, AssetMap, Entry, Quiz};
use qtipack_core::package::{Assembler, AssemblerOptions};
use qtipack_core::parser;
use qtipack_core::PackageFormat;

pub fn execute(quiz_path: PathBuf, assets_dir: Option<PathBuf>) -> Result<()> {
    let quizzes = if quiz_path.is_dir() {
        parser::load_quiz_directory(&quiz_path)?
    } else {
        vec![parser::parse_quiz(&quiz_path)?]
    };
    let assets = match &assets_dir {
        Some(dir) => Some(parser::load_asset_directory(dir)?),
        None => None,
    };

    let mut total_warnings = 0;
    let mut total_errors = 0;

    for quiz in &quizzes {
        println!("Quiz: {} ({} items)", quiz.title, quiz.item_count());

        let warnings = parser::validate_quiz(quiz);
        for w in &warnings {
            let prefix = w
                .location
                .as_ref()
                .map(|location| format!("  [{location}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();

        let errors = check_quiz(quiz, assets.as_ref());
        for e in &errors {
            println!("   ERROR: {e}");
        }
        total_errors += errors.len();
    }

    if total_errors > 0 {
        anyhow::bail!("{total_errors} error(s) found");
    }
    if total_warnings == 0 {
        println!("All quizzes valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

/// Plan the package in memory and score every item's answer key.
///
/// Without an asset directory, every referenced asset is stubbed so that only
/// the quiz structure is checked.
fn check_quiz(quiz: &Quiz, assets: Option<&AssetMap>) -> Vec<String> {
    let stubs;
    let assets = match assets {
        Some(assets) => assets,
        None => {
            stubs = stub_assets(quiz);
            &stubs
        }
    };

    let assembler = Assembler::with_options(
        qtipack_render::dialect(PackageFormat::default()),
        AssemblerOptions {
            namespace: Some(String::new()),
            ..Default::default()
        },
    );
    let plan = match assembler.plan(quiz, assets) {
        Ok(plan) => plan,
        Err(e) => return vec![e.to_string()],
    };

    let mut errors = Vec::new();
    for item in &plan.items {
        let Some(key) = &item.answer_key else {
            continue;
        };
        let outcome = evaluate::score(&item.synthesis, key);
        if (outcome.score - item.points).abs() > f64::EPSILON {
            errors.push(format!(
                "answer key of {} scores {} of {} point(s)",
                item.title, outcome.score, item.points
            ));
        }
    }
    errors
}

fn stub_assets(quiz: &Quiz) -> AssetMap {
    let mut names = Vec::new();
    for entry in &quiz.entries {
        match entry {
            Entry::Question(question) => names.extend(&question.assets),
            Entry::Group(group) => names.extend(group.questions.iter().flat_map(|q| &q.assets)),
            Entry::Text(region) => names.extend(&region.assets),
        }
    }
    names
        .into_iter()
        .map(|name| {
            let media_type = parser::media_type_for(Path::new(name));
            (name.clone(), Asset::new(Vec::new(), media_type))
        })
        .collect()
}
