//! IMS QTI 3.0 dialect.
//!
//! Same document model as 2.1, written in the kebab-case `qti-` vocabulary
//! under the `imsqtiasi_v3p0` namespace.

use qtipack_core::assessment::{SectionPart, TestDocument};
use qtipack_core::ident::Ident;
use qtipack_core::item::{Interaction, InteractionKind, ItemBody, ItemDocument};
use qtipack_core::manifest::{ManifestDocument, ResourceKind};
use qtipack_core::model::PackageFormat;
use qtipack_core::processing::{
    float_literal, Expr, OutcomeDeclaration, ResponseDeclaration, Rule,
};
use qtipack_core::traits::Dialect;

use crate::xml::{escape, escape_attr, indent};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const QTI_NS: &str = "http://www.imsglobal.org/xsd/imsqtiasi_v3p0";
const QTI_XSD: &str = "https://purl.imsglobal.org/spec/qti/v3p0/schema/xsd/imsqti_asiv3p0_v1p0.xsd";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const CP_NS: &str = "http://www.imsglobal.org/xsd/qti/qtiv3p0/imscp_v1p1";
const CP_XSD: &str = "https://purl.imsglobal.org/spec/qti/v3p0/schema/xsd/imsqtiv3p0_imscpv1p2_v1p0.xsd";
const LOM_NS: &str = "http://ltsc.ieee.org/xsd/LOM";
const LOM_XSD: &str = "https://purl.imsglobal.org/spec/md/v1p3/schema/xsd/imsmd_loose_v1p3p2.xsd";
const QTI_MD_NS: &str = "http://www.imsglobal.org/xsd/imsqti_metadata_v3p0";
const QTI_MD_XSD: &str = "https://purl.imsglobal.org/spec/qti/v3p0/schema/xsd/imsqti_metadatav3p0_v1p0.xsd";

/// Writes QTI 3.0 documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Qti30;

impl Dialect for Qti30 {
    fn format(&self) -> PackageFormat {
        PackageFormat::Qti30
    }

    fn write_item(&self, item: &ItemDocument) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECL);
        xml.push_str(&format!(
            "<qti-assessment-item xmlns=\"{QTI_NS}\" xmlns:xsi=\"{XSI_NS}\" \
             xsi:schemaLocation=\"{QTI_NS} {QTI_XSD}\" identifier=\"{}\" title=\"{}\" \
             adaptive=\"false\" time-dependent=\"false\">\n",
            escape_attr(item.identifier.as_str()),
            escape_attr(&item.title)
        ));

        let decls = item.declarations();
        if let Some(response) = &decls.response {
            response_declaration(&mut xml, response);
        }
        for outcome in &decls.outcomes {
            outcome_declaration(&mut xml, outcome);
        }

        xml.push_str("  <qti-item-body>\n");
        match &item.body {
            ItemBody::Question {
                prompt,
                interaction,
            } => write_interaction(&mut xml, prompt, interaction),
            ItemBody::Text { title, html } => {
                xml.push_str("    <div class=\"text-region\">\n");
                if let Some(title) = title {
                    xml.push_str(&format!("      <h3>{}</h3>\n", escape(title)));
                }
                xml.push_str(&format!("      {html}\n"));
                xml.push_str("    </div>\n");
            }
        }
        xml.push_str("  </qti-item-body>\n");

        if !item.processing().is_empty() {
            xml.push_str("  <qti-response-processing>\n");
            for rule in &item.processing().rules {
                write_rule(&mut xml, rule, 2);
            }
            xml.push_str("  </qti-response-processing>\n");
        }

        for block in &item.feedback {
            xml.push_str(&format!(
                "  <qti-modal-feedback outcome-identifier=\"{}\" identifier=\"{}\" show-hide=\"show\">\n",
                escape_attr(block.outcome.as_str()),
                escape_attr(block.identifier.as_str())
            ));
            xml.push_str(&format!(
                "    <qti-content-body>{}</qti-content-body>\n",
                block.body
            ));
            xml.push_str("  </qti-modal-feedback>\n");
        }

        xml.push_str("</qti-assessment-item>\n");
        xml
    }

    fn write_test(&self, test: &TestDocument) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECL);
        xml.push_str(&format!(
            "<qti-assessment-test xmlns=\"{QTI_NS}\" xmlns:xsi=\"{XSI_NS}\" \
             xsi:schemaLocation=\"{QTI_NS} {QTI_XSD}\" identifier=\"{}\" title=\"{}\">\n",
            escape_attr(test.identifier.as_str()),
            escape_attr(&test.title)
        ));
        xml.push_str(&format!(
            "  <qti-outcome-declaration identifier=\"{}\" cardinality=\"single\" base-type=\"float\">\n\
             \x20   <qti-default-value>\n\
             \x20     <qti-value>0.0</qti-value>\n\
             \x20   </qti-default-value>\n\
             \x20 </qti-outcome-declaration>\n",
            escape_attr(test.score.as_str())
        ));

        let session = &test.session;
        xml.push_str(&format!(
            "  <qti-test-part identifier=\"{}\" navigation-mode=\"{}\" submission-mode=\"{}\">\n",
            escape_attr(test.part.as_str()),
            test.navigation.as_str(),
            test.submission.as_str()
        ));
        xml.push_str(&format!(
            "    <qti-item-session-control max-attempts=\"{}\" show-feedback=\"{}\" show-solution=\"{}\" \
             allow-comment=\"{}\" allow-skipping=\"{}\" validate-responses=\"{}\"/>\n",
            session.max_attempts,
            session.show_feedback,
            session.show_solution,
            session.allow_comment,
            session.allow_skipping,
            session.validate_responses
        ));
        xml.push_str(&format!(
            "    <qti-assessment-section identifier=\"{}\" title=\"{}\" visible=\"true\">\n",
            escape_attr(test.section.as_str()),
            escape_attr(&test.section_title)
        ));
        for part in &test.parts {
            match part {
                SectionPart::Item(item) => item_ref(&mut xml, &item.identifier, &item.href, 3),
                SectionPart::Group(group) => {
                    xml.push_str(&format!(
                        "      <qti-assessment-section identifier=\"{}\" title=\"{}\" visible=\"true\">\n",
                        escape_attr(group.identifier.as_str()),
                        escape_attr(&group.title)
                    ));
                    xml.push_str(&format!(
                        "        <qti-selection select=\"{}\"/>\n",
                        group.select
                    ));
                    xml.push_str(&format!(
                        "        <qti-ordering shuffle=\"{}\"/>\n",
                        group.shuffle
                    ));
                    for item in &group.items {
                        item_ref(&mut xml, &item.identifier, &item.href, 4);
                    }
                    xml.push_str("      </qti-assessment-section>\n");
                }
            }
        }
        xml.push_str("    </qti-assessment-section>\n");
        xml.push_str("  </qti-test-part>\n");
        xml.push_str("</qti-assessment-test>\n");
        xml
    }

    fn write_manifest(&self, manifest: &ManifestDocument) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECL);
        xml.push_str(&format!(
            "<manifest identifier=\"{}\" xmlns=\"{CP_NS}\" xmlns:imsmd=\"{LOM_NS}\" \
             xmlns:imsqti=\"{QTI_MD_NS}\" xmlns:xsi=\"{XSI_NS}\" \
             xsi:schemaLocation=\"{CP_NS} {CP_XSD} {LOM_NS} {LOM_XSD} {QTI_MD_NS} {QTI_MD_XSD}\">\n",
            escape_attr(manifest.identifier.as_str())
        ));

        let meta = &manifest.metadata;
        xml.push_str("  <metadata>\n");
        xml.push_str("    <schema>QTI Package</schema>\n");
        xml.push_str("    <schemaversion>3.0.0</schemaversion>\n");
        xml.push_str("    <imsmd:lom>\n");
        xml.push_str("      <imsmd:general>\n");
        xml.push_str(&format!(
            "        <imsmd:title><imsmd:string>{}</imsmd:string></imsmd:title>\n",
            escape(&meta.title)
        ));
        if !meta.description.trim().is_empty() {
            xml.push_str(&format!(
                "        <imsmd:description><imsmd:string>{}</imsmd:string></imsmd:description>\n",
                escape(&meta.description)
            ));
        }
        xml.push_str("      </imsmd:general>\n");
        xml.push_str("      <imsmd:lifeCycle>\n");
        xml.push_str(&format!(
            "        <imsmd:version><imsmd:string>{} {}</imsmd:string></imsmd:version>\n",
            escape(meta.generator),
            escape(meta.version)
        ));
        xml.push_str("      </imsmd:lifeCycle>\n");
        xml.push_str("    </imsmd:lom>\n");
        xml.push_str("  </metadata>\n");
        xml.push_str("  <organizations/>\n");

        xml.push_str("  <resources>\n");
        for resource in &manifest.resources {
            let kind = match resource.kind {
                ResourceKind::Test => "imsqti_test_xmlv3p0",
                ResourceKind::Item => "imsqti_item_xmlv3p0",
                ResourceKind::Asset => "webcontent",
            };
            xml.push_str(&format!(
                "    <resource identifier=\"{}\" type=\"{kind}\" href=\"{}\">\n",
                escape_attr(resource.identifier.as_str()),
                escape_attr(&resource.href)
            ));
            if !resource.interactions.is_empty() {
                xml.push_str("      <metadata>\n        <imsqti:qtiMetadata>\n");
                for interaction in &resource.interactions {
                    xml.push_str(&format!(
                        "          <imsqti:interactionType>{}</imsqti:interactionType>\n",
                        interaction_name(*interaction)
                    ));
                }
                xml.push_str("        </imsqti:qtiMetadata>\n      </metadata>\n");
            }
            if let Some(media_type) = &resource.media_type {
                xml.push_str("      <metadata>\n        <imsmd:lom>\n");
                xml.push_str(&format!(
                    "          <imsmd:technical><imsmd:format>{}</imsmd:format></imsmd:technical>\n",
                    escape(media_type)
                ));
                xml.push_str("        </imsmd:lom>\n      </metadata>\n");
            }
            xml.push_str(&format!(
                "      <file href=\"{}\"/>\n",
                escape_attr(&resource.href)
            ));
            for dependency in &resource.dependencies {
                xml.push_str(&format!(
                    "      <dependency identifierref=\"{}\"/>\n",
                    escape_attr(dependency.as_str())
                ));
            }
            xml.push_str("    </resource>\n");
        }
        xml.push_str("  </resources>\n");
        xml.push_str("</manifest>\n");
        xml
    }
}

fn interaction_name(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Choice => "qti-choice-interaction",
        InteractionKind::TextEntry => "qti-text-entry-interaction",
        InteractionKind::ExtendedText => "qti-extended-text-interaction",
        InteractionKind::Upload => "qti-upload-interaction",
    }
}

fn item_ref(xml: &mut String, identifier: &Ident, href: &str, depth: usize) {
    xml.push_str(&format!(
        "{}<qti-assessment-item-ref identifier=\"{}\" href=\"{}\"/>\n",
        indent(depth),
        escape_attr(identifier.as_str()),
        escape_attr(href)
    ));
}

fn response_declaration(xml: &mut String, decl: &ResponseDeclaration) {
    let open = format!(
        "  <qti-response-declaration identifier=\"{}\" cardinality=\"{}\" base-type=\"{}\"",
        escape_attr(decl.identifier.as_str()),
        decl.cardinality.as_str(),
        decl.base_type.as_str()
    );
    if decl.correct.is_empty() {
        xml.push_str(&format!("{open}/>\n"));
        return;
    }
    xml.push_str(&format!("{open}>\n    <qti-correct-response>\n"));
    for value in &decl.correct {
        xml.push_str(&format!("      <qti-value>{}</qti-value>\n", escape(value)));
    }
    xml.push_str("    </qti-correct-response>\n  </qti-response-declaration>\n");
}

fn outcome_declaration(xml: &mut String, decl: &OutcomeDeclaration) {
    let mut open = format!(
        "  <qti-outcome-declaration identifier=\"{}\" cardinality=\"{}\" base-type=\"{}\"",
        escape_attr(decl.identifier.as_str()),
        decl.cardinality.as_str(),
        decl.base_type.as_str()
    );
    if decl.human_scored {
        open.push_str(" external-scored=\"human\"");
    }
    if let Some(max) = decl.normal_maximum {
        open.push_str(&format!(" normal-maximum=\"{}\"", float_literal(max)));
    }
    match &decl.default_value {
        Some(value) => xml.push_str(&format!(
            "{open}>\n    <qti-default-value>\n      <qti-value>{}</qti-value>\n    </qti-default-value>\n  </qti-outcome-declaration>\n",
            escape(value)
        )),
        None => xml.push_str(&format!("{open}/>\n")),
    }
}

fn write_interaction(xml: &mut String, prompt: &str, interaction: &Interaction) {
    let response = escape_attr(interaction.response().as_str());
    match interaction {
        Interaction::Choice {
            shuffle,
            max_choices,
            choices,
            ..
        } => {
            xml.push_str(&format!(
                "    <qti-choice-interaction response-identifier=\"{response}\" shuffle=\"{shuffle}\" max-choices=\"{max_choices}\">\n"
            ));
            xml.push_str(&format!("      <qti-prompt>{prompt}</qti-prompt>\n"));
            for choice in choices {
                xml.push_str(&format!(
                    "      <qti-simple-choice identifier=\"{}\">{}</qti-simple-choice>\n",
                    escape_attr(choice.identifier.as_str()),
                    choice.body
                ));
            }
            xml.push_str("    </qti-choice-interaction>\n");
        }
        Interaction::TextEntry {
            expected_length, ..
        } => {
            xml.push_str(&format!("    <div>{prompt}</div>\n"));
            xml.push_str(&format!(
                "    <p><qti-text-entry-interaction response-identifier=\"{response}\" expected-length=\"{expected_length}\"/></p>\n"
            ));
        }
        Interaction::ExtendedText { expected_lines, .. } => {
            xml.push_str(&format!(
                "    <qti-extended-text-interaction response-identifier=\"{response}\" expected-lines=\"{expected_lines}\">\n"
            ));
            xml.push_str(&format!("      <qti-prompt>{prompt}</qti-prompt>\n"));
            xml.push_str("    </qti-extended-text-interaction>\n");
        }
        Interaction::Upload { .. } => {
            xml.push_str(&format!(
                "    <qti-upload-interaction response-identifier=\"{response}\">\n"
            ));
            xml.push_str(&format!("      <qti-prompt>{prompt}</qti-prompt>\n"));
            xml.push_str("    </qti-upload-interaction>\n");
        }
    }
}

fn write_rule(xml: &mut String, rule: &Rule, depth: usize) {
    let pad = indent(depth);
    match rule {
        Rule::Condition {
            branches,
            otherwise,
        } => {
            xml.push_str(&format!("{pad}<qti-response-condition>\n"));
            for (i, branch) in branches.iter().enumerate() {
                let tag = if i == 0 {
                    "qti-response-if"
                } else {
                    "qti-response-else-if"
                };
                xml.push_str(&format!("{pad}  <{tag}>\n"));
                write_expr(xml, &branch.condition, depth + 2);
                for rule in &branch.rules {
                    write_rule(xml, rule, depth + 2);
                }
                xml.push_str(&format!("{pad}  </{tag}>\n"));
            }
            if !otherwise.is_empty() {
                xml.push_str(&format!("{pad}  <qti-response-else>\n"));
                for rule in otherwise {
                    write_rule(xml, rule, depth + 2);
                }
                xml.push_str(&format!("{pad}  </qti-response-else>\n"));
            }
            xml.push_str(&format!("{pad}</qti-response-condition>\n"));
        }
        Rule::SetOutcome { identifier, value } => {
            xml.push_str(&format!(
                "{pad}<qti-set-outcome-value identifier=\"{}\">\n",
                escape_attr(identifier.as_str())
            ));
            write_expr(xml, value, depth + 1);
            xml.push_str(&format!("{pad}</qti-set-outcome-value>\n"));
        }
    }
}

fn write_expr(xml: &mut String, expr: &Expr, depth: usize) {
    let pad = indent(depth);
    match expr {
        Expr::Variable { identifier } => xml.push_str(&format!(
            "{pad}<qti-variable identifier=\"{}\"/>\n",
            escape_attr(identifier.as_str())
        )),
        Expr::Value { base_type, value } => xml.push_str(&format!(
            "{pad}<qti-base-value base-type=\"{}\">{}</qti-base-value>\n",
            base_type.as_str(),
            escape(value)
        )),
        Expr::Multiple { items } => operator(xml, depth, "qti-multiple", "", items.iter()),
        Expr::Match { left, right } => operator(xml, depth, "qti-match", "", [&**left, &**right]),
        Expr::Member { value, container } => {
            operator(xml, depth, "qti-member", "", [&**value, &**container])
        }
        Expr::StringMatch {
            case_sensitive,
            left,
            right,
        } => operator(
            xml,
            depth,
            "qti-string-match",
            &format!(" case-sensitive=\"{case_sensitive}\""),
            [&**left, &**right],
        ),
        Expr::Gte { left, right } => operator(xml, depth, "qti-gte", "", [&**left, &**right]),
        Expr::Lte { left, right } => operator(xml, depth, "qti-lte", "", [&**left, &**right]),
        Expr::And { operands } => operator(xml, depth, "qti-and", "", operands.iter()),
        Expr::Or { operands } => operator(xml, depth, "qti-or", "", operands.iter()),
        Expr::Not { operand } => operator(xml, depth, "qti-not", "", [&**operand]),
        Expr::IsNull { operand } => operator(xml, depth, "qti-is-null", "", [&**operand]),
    }
}

fn operator<'a>(
    xml: &mut String,
    depth: usize,
    tag: &str,
    attrs: &str,
    children: impl IntoIterator<Item = &'a Expr>,
) {
    let pad = indent(depth);
    xml.push_str(&format!("{pad}<{tag}{attrs}>\n"));
    for child in children {
        write_expr(xml, child, depth + 1);
    }
    xml.push_str(&format!("{pad}</{tag}>\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtipack_core::model::{
        Asset, AssetMap, Choice, Entry, Feedback, NumericAnswer, Question, QuestionGroup,
        QuestionKind, Quiz,
    };
    use qtipack_core::package::{Assembler, AssemblerOptions, Package};
    use qtipack_core::traits::PackageGenerator;

    fn question(title: &str, kind: QuestionKind) -> Question {
        Question {
            title: Some(title.into()),
            prompt: format!("<p>{title}</p>"),
            points: 1.0,
            kind,
            feedback: Feedback::default(),
            assets: vec![],
        }
    }

    fn quiz() -> Quiz {
        let mut pets = question(
            "Pets",
            QuestionKind::MultipleAnswer {
                choices: vec![
                    Choice::new("Cat", true),
                    Choice::new("Rock", false),
                    Choice::new("Dog", true),
                ],
            },
        );
        pets.feedback.general = Some("<p>Pets are animals.</p>".into());
        let mut diagram = question("Diagram", QuestionKind::true_false(true));
        diagram.prompt = r#"<p>Is this a cell? <img src="cell.svg"/></p>"#.into();
        diagram.assets = vec!["cell.svg".into()];

        Quiz {
            title: "Biology <basics>".into(),
            description: String::new(),
            entries: vec![
                Entry::Question(pets),
                Entry::Group(QuestionGroup {
                    title: None,
                    pick: 2,
                    questions: vec![
                        question(
                            "Legs",
                            QuestionKind::Numerical {
                                answers: vec![NumericAnswer::exact(4.0, 0.0)],
                            },
                        ),
                        question(
                            "Wings",
                            QuestionKind::Numerical {
                                answers: vec![NumericAnswer::range(1.5, 2.5)],
                            },
                        ),
                        question("Essay", QuestionKind::Essay),
                    ],
                }),
                Entry::Question(diagram),
            ],
        }
    }

    fn generate(shuffle: bool) -> Package {
        let assets = AssetMap::from([(
            "cell.svg".to_string(),
            Asset::new(b"<svg/>".to_vec(), "image/svg+xml"),
        )]);
        let options = AssemblerOptions {
            namespace: Some("t30".into()),
            shuffle_choices: shuffle,
            ..Default::default()
        };
        Assembler::with_options(Qti30, options)
            .generate(&quiz(), &assets)
            .unwrap()
    }

    fn text(package: &Package, path: &str) -> String {
        String::from_utf8(package.file(path).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn multiple_answer_item_vocabulary() {
        let package = generate(true);
        let xml = text(&package, "items/pets_t30.xml");
        assert!(xml.contains("<qti-assessment-item xmlns=\"http://www.imsglobal.org/xsd/imsqtiasi_v3p0\""));
        assert!(xml.contains("time-dependent=\"false\""));
        assert!(xml.contains("cardinality=\"multiple\" base-type=\"identifier\""));
        assert!(xml.contains(
            "<qti-choice-interaction response-identifier=\"RESPONSE\" shuffle=\"true\" max-choices=\"3\">"
        ));
        assert!(xml.contains("<qti-prompt><p>Pets</p></qti-prompt>"));
        assert!(xml.contains("<qti-member>"));
        assert!(xml.contains("<qti-not>"));
        assert!(xml.contains("<qti-content-body><p>Pets are animals.</p></qti-content-body>"));
        assert!(!xml.contains("<choiceInteraction"));
        assert!(!xml.contains("baseType="));
    }

    #[test]
    fn true_false_never_shuffles() {
        let package = generate(true);
        let xml = text(&package, "items/diagram_t30.xml");
        assert!(xml.contains("shuffle=\"false\" max-choices=\"1\""));
        assert!(xml.contains("<img src=\"../assets/cell.svg\"/>"));
    }

    #[test]
    fn numeric_items_use_bounds() {
        let package = generate(false);
        let legs = text(&package, "items/legs_t30.xml");
        assert!(legs.contains("<qti-text-entry-interaction response-identifier=\"RESPONSE\" expected-length=\"10\"/>"));
        assert!(legs.contains("<qti-gte>"));
        assert!(legs.contains("<qti-lte>"));
        assert!(legs.contains("base-type=\"float\">4.0</qti-base-value>"));

        let essay = text(&package, "items/essay_t30.xml");
        assert!(essay.contains("external-scored=\"human\""));
        assert!(essay.contains("expected-lines=\"10\""));
    }

    #[test]
    fn test_document_groups() {
        let package = generate(false);
        let test = package.test().unwrap();
        assert!(test.body.contains("title=\"Biology &lt;basics&gt;\""));
        assert!(test.body.contains("navigation-mode=\"linear\" submission-mode=\"individual\""));
        assert!(test.body.contains("<qti-selection select=\"2\"/>"));
        assert!(test.body.contains("<qti-ordering shuffle=\"true\"/>"));
        assert_eq!(test.body.matches("<qti-assessment-item-ref ").count(), 5);
        assert!(test.body.contains("href=\"../items/legs_t30.xml\""));
    }

    #[test]
    fn manifest_lists_v3_resources() {
        let package = generate(false);
        let xml = text(&package, "imsmanifest.xml");
        assert!(xml.contains("xmlns=\"http://www.imsglobal.org/xsd/qti/qtiv3p0/imscp_v1p1\""));
        assert!(xml.contains("type=\"imsqti_test_xmlv3p0\""));
        assert_eq!(xml.matches("type=\"imsqti_item_xmlv3p0\"").count(), 5);
        assert!(xml.contains("type=\"webcontent\" href=\"assets/cell.svg\""));
        assert!(xml.contains(
            "<imsqti:interactionType>qti-text-entry-interaction</imsqti:interactionType>"
        ));
        assert!(!xml.contains("<imsmd:description>"));
        assert!(xml.contains(
            "<imsmd:technical><imsmd:format>image/svg+xml</imsmd:format></imsmd:technical>"
        ));
        assert_eq!(xml.matches("<imsmd:format>").count(), 1);
    }
}
