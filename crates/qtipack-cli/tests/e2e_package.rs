//! End-to-end package tests: generate real packages and check scoring and
//! cross-document references.

use std::collections::BTreeSet;

use qtipack_core::evaluate::{score, Response};
use qtipack_core::item::{Interaction, ItemDocument};
use qtipack_core::model::{
    Asset, AssetMap, Choice, Entry, Feedback, NumericAnswer, PackageFormat, Question,
    QuestionGroup, QuestionKind, Quiz,
};
use qtipack_core::package::{Assembler, AssemblerOptions, DocumentKind, Package, Plan};
use qtipack_core::traits::PackageGenerator;
use qtipack_core::PackageError;
use qtipack_render::{dialect, generator};

fn question(title: &str, points: f64, kind: QuestionKind) -> Question {
    Question {
        title: Some(title.into()),
        prompt: format!("<p>{title}</p>"),
        points,
        kind,
        feedback: Feedback::default(),
        assets: vec![],
    }
}

fn quiz(entries: Vec<Entry>) -> Quiz {
    Quiz {
        title: "E2E".into(),
        description: String::new(),
        entries,
    }
}

fn plan(quiz: &Quiz) -> Plan {
    Assembler::new(dialect(PackageFormat::Qti30))
        .plan(quiz, &AssetMap::new())
        .unwrap()
}

fn choice_ids(item: &ItemDocument) -> Vec<String> {
    match item.interaction() {
        Some(Interaction::Choice { choices, .. }) => {
            choices.iter().map(|c| c.identifier.to_string()).collect()
        }
        _ => panic!("not a choice item"),
    }
}

fn pick(ids: &[String], indices: &[usize]) -> Response {
    Response::Identifiers(indices.iter().map(|&i| ids[i].clone()).collect())
}

fn text(package: &Package, path: &str) -> String {
    String::from_utf8(package.file(path).unwrap().to_vec()).unwrap()
}

/// Values of every `attr="..."` occurrence in `xml`.
fn attr_values(xml: &str, attr: &str) -> Vec<String> {
    let needle = format!(" {attr}=\"");
    xml.match_indices(&needle)
        .filter_map(|(at, _)| {
            let rest = &xml[at + needle.len()..];
            rest.find('"').map(|end| rest[..end].to_string())
        })
        .collect()
}

fn rich_quiz() -> Quiz {
    let mut choice = question(
        "Arithmetic",
        1.0,
        QuestionKind::SingleChoice {
            choices: vec![
                Choice::new("6", false),
                Choice::new("1", false).with_feedback("<p>Subtracted</p>"),
                Choice::new("5", true),
            ],
        },
    );
    choice.feedback.correct = Some("<p>Yes</p>".into());
    choice.feedback.incorrect = Some("<p>No</p>".into());
    let mut figure = question("Figure", 1.0, QuestionKind::true_false(true));
    figure.prompt = r#"<p><img src="fig.png"/></p>"#.into();
    figure.assets = vec!["fig.png".into()];

    quiz(vec![
        Entry::Question(choice),
        Entry::Group(QuestionGroup {
            title: Some("Pool".into()),
            pick: 1,
            questions: vec![
                question(
                    "Capital",
                    1.0,
                    QuestionKind::ShortAnswer {
                        answers: vec!["Paris".into()],
                    },
                ),
                question("Essay", 3.0, QuestionKind::Essay),
            ],
        }),
        Entry::Question(figure),
        Entry::Question(question("Upload", 1.0, QuestionKind::FileUpload)),
    ])
}

fn rich_assets() -> AssetMap {
    AssetMap::from([("fig.png".to_string(), Asset::new(vec![1, 2, 3], "image/png"))])
}

#[test]
fn single_choice_scores_only_the_correct_choice() {
    let quiz = quiz(vec![Entry::Question(question(
        "Colour",
        3.0,
        QuestionKind::SingleChoice {
            choices: vec![
                Choice::new("Red", false),
                Choice::new("Blue", true),
                Choice::new("Green", false),
            ],
        },
    ))]);
    let plan = plan(&quiz);
    let item = &plan.items[0];
    let ids = choice_ids(item);

    for (i, id) in ids.iter().enumerate() {
        let outcome = score(&item.synthesis, &Response::Identifier(id.clone()));
        let expected = if i == 1 { 3.0 } else { 0.0 };
        assert_eq!(outcome.score, expected, "choice {i}");
    }
    assert_eq!(score(&item.synthesis, &Response::Empty).score, 0.0);
}

#[test]
fn multiple_answer_is_all_or_nothing() {
    let quiz = quiz(vec![Entry::Question(question(
        "Primes",
        2.0,
        QuestionKind::MultipleAnswer {
            choices: vec![
                Choice::new("2", true),
                Choice::new("4", false),
                Choice::new("7", true),
                Choice::new("9", false),
            ],
        },
    ))]);
    let plan = plan(&quiz);
    let item = &plan.items[0];
    let ids = choice_ids(item);

    assert_eq!(score(&item.synthesis, &pick(&ids, &[0, 2])).score, 2.0);
    assert_eq!(score(&item.synthesis, &pick(&ids, &[2, 0])).score, 2.0);
    assert_eq!(score(&item.synthesis, &pick(&ids, &[0])).score, 0.0);
    assert_eq!(score(&item.synthesis, &pick(&ids, &[0, 1, 2])).score, 0.0);
    assert_eq!(score(&item.synthesis, &pick(&ids, &[1, 3])).score, 0.0);
    assert_eq!(score(&item.synthesis, &Response::Identifiers(vec![])).score, 0.0);
}

#[test]
fn numerical_tolerance_is_inclusive() {
    let quiz = quiz(vec![Entry::Question(question(
        "Speed",
        1.0,
        QuestionKind::Numerical {
            answers: vec![NumericAnswer::exact(10.0, 0.5)],
        },
    ))]);
    let plan = plan(&quiz);
    let synthesis = &plan.items[0].synthesis;

    for (value, expected) in [
        (10.0, 1.0),
        (9.5, 1.0),
        (10.5, 1.0),
        (10.5 + 1e-6, 0.0),
        (9.5 - 1e-6, 0.0),
    ] {
        assert_eq!(score(synthesis, &Response::Number(value)).score, expected, "{value}");
    }
    assert_eq!(score(synthesis, &Response::Text("10.25".into())).score, 1.0);
    assert_eq!(score(synthesis, &Response::Text("ten".into())).score, 0.0);
}

#[test]
fn true_false_package_has_one_item() {
    let quiz = quiz(vec![Entry::Question(question(
        "Sky",
        2.0,
        QuestionKind::true_false(true),
    ))]);

    let plan = plan(&quiz);
    assert_eq!(plan.items.len(), 1);
    let item = &plan.items[0];
    let ids = choice_ids(item);
    let score_of = |i: usize| score(&item.synthesis, &Response::Identifier(ids[i].clone())).score;
    assert_eq!(score_of(0), 2.0);
    assert_eq!(score_of(1), 0.0);

    let refs: Vec<_> = plan.test.item_refs().collect();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].identifier, item.identifier);

    let package = generator(PackageFormat::Qti21, AssemblerOptions::default())
        .generate(&quiz, &AssetMap::new())
        .unwrap();
    let test = package.test().unwrap();
    assert_eq!(attr_values(&test.body, "href").len(), 1);
}

#[test]
fn group_selection() {
    let members = |n: usize| -> Vec<Question> {
        (0..n)
            .map(|i| question(&format!("Member {i}"), 1.0, QuestionKind::true_false(i % 2 == 0)))
            .collect()
    };
    let grouped = |pick: usize| {
        quiz(vec![Entry::Group(QuestionGroup {
            title: Some("Pool".into()),
            pick,
            questions: members(5),
        })])
    };

    let plan = plan(&grouped(3));
    let groups: Vec<_> = plan.test.groups().collect();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].select, 3);
    assert_eq!(groups[0].items.len(), 5);
    assert!(groups[0].shuffle);

    let package = generator(PackageFormat::Qti30, AssemblerOptions::default())
        .generate(&grouped(3), &AssetMap::new())
        .unwrap();
    assert!(package.test().unwrap().body.contains("<qti-selection select=\"3\"/>"));

    let err = Assembler::new(dialect(PackageFormat::Qti30))
        .generate(&grouped(6), &AssetMap::new())
        .unwrap_err();
    assert!(matches!(
        err,
        PackageError::InvalidGroup {
            pick: 6,
            members: 5,
            ..
        }
    ));
}

#[test]
fn fresh_runs_use_fresh_identifiers() {
    for format in [PackageFormat::Qti21, PackageFormat::Qti30] {
        let make = || {
            generator(format, AssemblerOptions::default())
                .generate(&rich_quiz(), &rich_assets())
                .unwrap()
        };
        let first = make();
        let second = make();

        let ids = |package: &Package| -> BTreeSet<String> {
            package
                .documents()
                .iter()
                .map(|d| d.identifier.to_string())
                .collect()
        };
        assert!(ids(&first).is_disjoint(&ids(&second)));

        // Same shape: same number and kinds of documents, same asset paths.
        assert_eq!(first.documents().len(), second.documents().len());
        for (a, b) in first.documents().iter().zip(second.documents()) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.body.lines().count(), b.body.lines().count());
        }
        let assets = |p: &Package| p.assets.iter().map(|a| a.path.clone()).collect::<Vec<_>>();
        assert_eq!(assets(&first), assets(&second));
    }
}

#[test]
fn fixed_namespace_is_reproducible() {
    let options = AssemblerOptions {
        namespace: Some("fixed".into()),
        ..Default::default()
    };
    let a = generator(PackageFormat::Qti30, options.clone())
        .generate(&rich_quiz(), &rich_assets())
        .unwrap();
    let b = generator(PackageFormat::Qti30, options)
        .generate(&rich_quiz(), &rich_assets())
        .unwrap();
    let files = |p: &Package| {
        p.files()
            .map(|(path, bytes)| (path.to_string(), bytes.to_vec()))
            .collect::<Vec<_>>()
    };
    assert_eq!(files(&a), files(&b));
}

#[test]
fn no_dangling_references() {
    for format in [PackageFormat::Qti21, PackageFormat::Qti30] {
        let package = generator(format, AssemblerOptions::default())
            .generate(&rich_quiz(), &rich_assets())
            .unwrap();
        let paths: BTreeSet<String> = package.paths().into_iter().map(String::from).collect();
        let manifest = text(&package, "imsmanifest.xml");

        // Every manifest href is a file, every file but the manifest is listed.
        let hrefs: BTreeSet<String> = attr_values(&manifest, "href").into_iter().collect();
        for href in &hrefs {
            assert!(paths.contains(href), "{format}: manifest lists missing {href}");
        }
        for path in &paths {
            if path != "imsmanifest.xml" {
                assert!(hrefs.contains(path), "{format}: {path} is not in the manifest");
            }
        }

        // Every dependency names a resource.
        let resources: BTreeSet<String> = manifest
            .lines()
            .filter(|line| line.trim_start().starts_with("<resource "))
            .flat_map(|line| attr_values(line, "identifier"))
            .collect();
        for dependency in attr_values(&manifest, "identifierref") {
            assert!(resources.contains(&dependency), "{format}: dangling {dependency}");
        }

        // Every test item reference resolves relative to tests/.
        let test = package.test().unwrap();
        for href in attr_values(&test.body, "href") {
            let target = href.strip_prefix("../").unwrap();
            assert!(paths.contains(target), "{format}: test references missing {href}");
        }

        // Every embedded image resolves relative to items/.
        for doc in package.documents_of(DocumentKind::AssessmentItem) {
            for src in attr_values(&doc.body, "src") {
                let target = src.strip_prefix("../").unwrap();
                assert!(paths.contains(target), "{format}: {} embeds missing {src}", doc.path);
            }
        }
    }
}

#[test]
fn written_tree_matches_package() {
    let dir = tempfile::tempdir().unwrap();
    let package = generator(PackageFormat::Qti21, AssemblerOptions::default())
        .generate(&rich_quiz(), &rich_assets())
        .unwrap();
    package.write_to_dir(dir.path()).unwrap();

    for (path, bytes) in package.files() {
        assert_eq!(std::fs::read(dir.path().join(path)).unwrap(), bytes, "{path}");
    }
}

#[test]
fn feedback_is_triggered_by_response() {
    let plan = Assembler::new(dialect(PackageFormat::Qti30))
        .plan(&rich_quiz(), &rich_assets())
        .unwrap();
    let item = &plan.items[0];
    let ids = choice_ids(item);
    let blocks: Vec<String> = item.feedback.iter().map(|b| b.identifier.to_string()).collect();

    let correct = score(&item.synthesis, &Response::Identifier(ids[2].clone()));
    assert_eq!(correct.score, 1.0);
    assert_eq!(correct.feedback.len(), 1);
    assert!(blocks.contains(&correct.feedback[0]));

    let wrong = score(&item.synthesis, &Response::Identifier(ids[1].clone()));
    assert_eq!(wrong.score, 0.0);
    // Incorrect feedback plus the choice's own feedback.
    assert_eq!(wrong.feedback.len(), 2);
    assert!(wrong.feedback.iter().all(|f| blocks.contains(f)));
    assert_ne!(wrong.feedback, correct.feedback);
}
