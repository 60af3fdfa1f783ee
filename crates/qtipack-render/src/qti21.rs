//! IMS QTI 2.1 dialect.
//!
//! camelCase element vocabulary, `imsqti_v2p1` namespace, IMS CP 1.1
//! manifest with `imsqti_*_xmlv2p1` resource types.

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
const QTI_NS: &str = "http://www.imsglobal.org/xsd/imsqti_v2p1";
const QTI_XSD: &str = "http://www.imsglobal.org/xsd/qti/qtiv2p1/imsqti_v2p1.xsd";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const CP_NS: &str = "http://www.imsglobal.org/xsd/imscp_v1p1";
const CP_XSD: &str = "http://www.imsglobal.org/xsd/qti/qtiv2p1/qtiv2p1_imscpv1p2_v1p0.xsd";
const LOM_NS: &str = "http://ltsc.ieee.org/xsd/LOM";
const LOM_XSD: &str = "http://www.imsglobal.org/xsd/imsmd_loose_v1p3p2.xsd";
const QTI_MD_NS: &str = "http://www.imsglobal.org/xsd/imsqti_metadata_v2p1";
const QTI_MD_XSD: &str = "http://www.imsglobal.org/xsd/qti/qtiv2p1/imsqti_metadata_v2p1p1.xsd";

/// Writes QTI 2.1 documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Qti21;

impl Dialect for Qti21 {
    fn format(&self) -> PackageFormat {
        PackageFormat::Qti21
    }

    fn write_item(&self, item: &ItemDocument) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECL);
        xml.push_str(&format!(
            "<assessmentItem xmlns=\"{QTI_NS}\" xmlns:xsi=\"{XSI_NS}\" \
             xsi:schemaLocation=\"{QTI_NS} {QTI_XSD}\" identifier=\"{}\" title=\"{}\" \
             adaptive=\"false\" timeDependent=\"false\">\n",
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

        xml.push_str("  <itemBody>\n");
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
        xml.push_str("  </itemBody>\n");

        if !item.processing().is_empty() {
            xml.push_str("  <responseProcessing>\n");
            for rule in &item.processing().rules {
                write_rule(&mut xml, rule, 2);
            }
            xml.push_str("  </responseProcessing>\n");
        }

        for block in &item.feedback {
            xml.push_str(&format!(
                "  <modalFeedback outcomeIdentifier=\"{}\" identifier=\"{}\" showHide=\"show\">{}</modalFeedback>\n",
                escape_attr(block.outcome.as_str()),
                escape_attr(block.identifier.as_str()),
                block.body
            ));
        }

        xml.push_str("</assessmentItem>\n");
        xml
    }

    fn write_test(&self, test: &TestDocument) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECL);
        xml.push_str(&format!(
            "<assessmentTest xmlns=\"{QTI_NS}\" xmlns:xsi=\"{XSI_NS}\" \
             xsi:schemaLocation=\"{QTI_NS} {QTI_XSD}\" identifier=\"{}\" title=\"{}\">\n",
            escape_attr(test.identifier.as_str()),
            escape_attr(&test.title)
        ));
        xml.push_str(&format!(
            "  <outcomeDeclaration identifier=\"{}\" cardinality=\"single\" baseType=\"float\">\n\
             \x20   <defaultValue>\n\
             \x20     <value>0.0</value>\n\
             \x20   </defaultValue>\n\
             \x20 </outcomeDeclaration>\n",
            escape_attr(test.score.as_str())
        ));

        let session = &test.session;
        xml.push_str(&format!(
            "  <testPart identifier=\"{}\" navigationMode=\"{}\" submissionMode=\"{}\">\n",
            escape_attr(test.part.as_str()),
            test.navigation.as_str(),
            test.submission.as_str()
        ));
        xml.push_str(&format!(
            "    <itemSessionControl maxAttempts=\"{}\" showFeedback=\"{}\" showSolution=\"{}\" \
             allowComment=\"{}\" allowSkipping=\"{}\" validateResponses=\"{}\"/>\n",
            session.max_attempts,
            session.show_feedback,
            session.show_solution,
            session.allow_comment,
            session.allow_skipping,
            session.validate_responses
        ));
        xml.push_str(&format!(
            "    <assessmentSection identifier=\"{}\" title=\"{}\" visible=\"true\">\n",
            escape_attr(test.section.as_str()),
            escape_attr(&test.section_title)
        ));
        for part in &test.parts {
            match part {
                SectionPart::Item(item) => item_ref(&mut xml, &item.identifier, &item.href, 3),
                SectionPart::Group(group) => {
                    xml.push_str(&format!(
                        "      <assessmentSection identifier=\"{}\" title=\"{}\" visible=\"true\">\n",
                        escape_attr(group.identifier.as_str()),
                        escape_attr(&group.title)
                    ));
                    xml.push_str(&format!("        <selection select=\"{}\"/>\n", group.select));
                    xml.push_str(&format!("        <ordering shuffle=\"{}\"/>\n", group.shuffle));
                    for item in &group.items {
                        item_ref(&mut xml, &item.identifier, &item.href, 4);
                    }
                    xml.push_str("      </assessmentSection>\n");
                }
            }
        }
        xml.push_str("    </assessmentSection>\n");
        xml.push_str("  </testPart>\n");
        xml.push_str("</assessmentTest>\n");
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
        xml.push_str("    <schema>QTIv2.1 Package</schema>\n");
        xml.push_str("    <schemaversion>1.0.0</schemaversion>\n");
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
                ResourceKind::Test => "imsqti_test_xmlv2p1",
                ResourceKind::Item => "imsqti_item_xmlv2p1",
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
        InteractionKind::Choice => "choiceInteraction",
        InteractionKind::TextEntry => "textEntryInteraction",
        InteractionKind::ExtendedText => "extendedTextInteraction",
        InteractionKind::Upload => "uploadInteraction",
    }
}

fn item_ref(xml: &mut String, identifier: &Ident, href: &str, depth: usize) {
    xml.push_str(&format!(
        "{}<assessmentItemRef identifier=\"{}\" href=\"{}\"/>\n",
        indent(depth),
        escape_attr(identifier.as_str()),
        escape_attr(href)
    ));
}

fn response_declaration(xml: &mut String, decl: &ResponseDeclaration) {
    let open = format!(
        "  <responseDeclaration identifier=\"{}\" cardinality=\"{}\" baseType=\"{}\"",
        escape_attr(decl.identifier.as_str()),
        decl.cardinality.as_str(),
        decl.base_type.as_str()
    );
    if decl.correct.is_empty() {
        xml.push_str(&format!("{open}/>\n"));
        return;
    }
    xml.push_str(&format!("{open}>\n    <correctResponse>\n"));
    for value in &decl.correct {
        xml.push_str(&format!("      <value>{}</value>\n", escape(value)));
    }
    xml.push_str("    </correctResponse>\n  </responseDeclaration>\n");
}

fn outcome_declaration(xml: &mut String, decl: &OutcomeDeclaration) {
    let mut open = format!(
        "  <outcomeDeclaration identifier=\"{}\" cardinality=\"{}\" baseType=\"{}\"",
        escape_attr(decl.identifier.as_str()),
        decl.cardinality.as_str(),
        decl.base_type.as_str()
    );
    if decl.human_scored {
        open.push_str(" interpretation=\"human-scored\"");
    }
    if let Some(max) = decl.normal_maximum {
        open.push_str(&format!(" normalMaximum=\"{}\"", float_literal(max)));
    }
    match &decl.default_value {
        Some(value) => xml.push_str(&format!(
            "{open}>\n    <defaultValue>\n      <value>{}</value>\n    </defaultValue>\n  </outcomeDeclaration>\n",
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
                "    <choiceInteraction responseIdentifier=\"{response}\" shuffle=\"{shuffle}\" maxChoices=\"{max_choices}\">\n"
            ));
            xml.push_str(&format!("      <prompt>{prompt}</prompt>\n"));
            for choice in choices {
                xml.push_str(&format!(
                    "      <simpleChoice identifier=\"{}\">{}</simpleChoice>\n",
                    escape_attr(choice.identifier.as_str()),
                    choice.body
                ));
            }
            xml.push_str("    </choiceInteraction>\n");
        }
        Interaction::TextEntry {
            expected_length, ..
        } => {
            // textEntryInteraction is inline and needs a block container.
            xml.push_str(&format!("    <div>{prompt}</div>\n"));
            xml.push_str(&format!(
                "    <p><textEntryInteraction responseIdentifier=\"{response}\" expectedLength=\"{expected_length}\"/></p>\n"
            ));
        }
        Interaction::ExtendedText { expected_lines, .. } => {
            xml.push_str(&format!(
                "    <extendedTextInteraction responseIdentifier=\"{response}\" expectedLines=\"{expected_lines}\">\n"
            ));
            xml.push_str(&format!("      <prompt>{prompt}</prompt>\n"));
            xml.push_str("    </extendedTextInteraction>\n");
        }
        Interaction::Upload { .. } => {
            xml.push_str(&format!(
                "    <uploadInteraction responseIdentifier=\"{response}\">\n"
            ));
            xml.push_str(&format!("      <prompt>{prompt}</prompt>\n"));
            xml.push_str("    </uploadInteraction>\n");
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
            xml.push_str(&format!("{pad}<responseCondition>\n"));
            for (i, branch) in branches.iter().enumerate() {
                let tag = if i == 0 { "responseIf" } else { "responseElseIf" };
                xml.push_str(&format!("{pad}  <{tag}>\n"));
                write_expr(xml, &branch.condition, depth + 2);
                for rule in &branch.rules {
                    write_rule(xml, rule, depth + 2);
                }
                xml.push_str(&format!("{pad}  </{tag}>\n"));
            }
            if !otherwise.is_empty() {
                xml.push_str(&format!("{pad}  <responseElse>\n"));
                for rule in otherwise {
                    write_rule(xml, rule, depth + 2);
                }
                xml.push_str(&format!("{pad}  </responseElse>\n"));
            }
            xml.push_str(&format!("{pad}</responseCondition>\n"));
        }
        Rule::SetOutcome { identifier, value } => {
            xml.push_str(&format!(
                "{pad}<setOutcomeValue identifier=\"{}\">\n",
                escape_attr(identifier.as_str())
            ));
            write_expr(xml, value, depth + 1);
            xml.push_str(&format!("{pad}</setOutcomeValue>\n"));
        }
    }
}

fn write_expr(xml: &mut String, expr: &Expr, depth: usize) {
    let pad = indent(depth);
    match expr {
        Expr::Variable { identifier } => xml.push_str(&format!(
            "{pad}<variable identifier=\"{}\"/>\n",
            escape_attr(identifier.as_str())
        )),
        Expr::Value { base_type, value } => xml.push_str(&format!(
            "{pad}<baseValue baseType=\"{}\">{}</baseValue>\n",
            base_type.as_str(),
            escape(value)
        )),
        Expr::Multiple { items } => operator(xml, depth, "multiple", "multiple", items.iter()),
        Expr::Match { left, right } => operator(xml, depth, "match", "match", [&**left, &**right]),
        Expr::Member { value, container } => {
            operator(xml, depth, "member", "member", [&**value, &**container])
        }
        Expr::StringMatch {
            case_sensitive,
            left,
            right,
        } => operator(
            xml,
            depth,
            &format!("stringMatch caseSensitive=\"{case_sensitive}\""),
            "stringMatch",
            [&**left, &**right],
        ),
        Expr::Gte { left, right } => operator(xml, depth, "gte", "gte", [&**left, &**right]),
        Expr::Lte { left, right } => operator(xml, depth, "lte", "lte", [&**left, &**right]),
        Expr::And { operands } => operator(xml, depth, "and", "and", operands.iter()),
        Expr::Or { operands } => operator(xml, depth, "or", "or", operands.iter()),
        Expr::Not { operand } => operator(xml, depth, "not", "not", [&**operand]),
        Expr::IsNull { operand } => operator(xml, depth, "isNull", "isNull", [&**operand]),
    }
}

fn operator<'a>(
    xml: &mut String,
    depth: usize,
    open: &str,
    close: &str,
    children: impl IntoIterator<Item = &'a Expr>,
) {
    let pad = indent(depth);
    xml.push_str(&format!("{pad}<{open}>\n"));
    for child in children {
        write_expr(xml, child, depth + 1);
    }
    xml.push_str(&format!("{pad}</{close}>\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtipack_core::model::{
        Asset, AssetMap, Choice, Entry, Feedback, Question, QuestionGroup, QuestionKind, Quiz,
        TextRegion,
    };
    use qtipack_core::package::{Assembler, AssemblerOptions};
    use qtipack_core::traits::PackageGenerator;

    fn question(title: &str, kind: QuestionKind) -> Question {
        Question {
            title: Some(title.into()),
            prompt: format!("<p>{title}?</p>"),
            points: 2.0,
            kind,
            feedback: Feedback::default(),
            assets: vec![],
        }
    }

    fn quiz() -> Quiz {
        let mut arithmetic = question(
            "Arithmetic",
            QuestionKind::SingleChoice {
                choices: vec![
                    Choice::new("6", false),
                    Choice::new("1", false).with_feedback("<p>Add, don't subtract.</p>"),
                    Choice::new("5", true),
                ],
            },
        );
        arithmetic.feedback.correct = Some("<p>Right</p>".into());
        let mut plot = question("Plot", QuestionKind::Essay);
        plot.prompt = r#"<p><img src="plot.png" alt="plot"/></p>"#.into();
        plot.assets = vec!["plot.png".into()];

        Quiz {
            title: "Tom's \"QTI\" quiz".into(),
            description: "Checks & balances".into(),
            entries: vec![
                Entry::Question(arithmetic),
                Entry::Group(QuestionGroup {
                    title: Some("Pool".into()),
                    pick: 1,
                    questions: vec![
                        question(
                            "Santa",
                            QuestionKind::ShortAnswer {
                                answers: vec!["Santa".into()],
                            },
                        ),
                        question("Upload", QuestionKind::FileUpload),
                    ],
                }),
                Entry::Text(TextRegion {
                    title: Some("Intermission".into()),
                    text: "<p>Stretch</p>".into(),
                    assets: vec![],
                }),
                Entry::Question(plot),
            ],
        }
    }

    fn generate() -> qtipack_core::package::Package {
        let assets = AssetMap::from([("plot.png".to_string(), Asset::new(vec![7], "image/png"))]);
        let options = AssemblerOptions {
            namespace: Some("t21".into()),
            ..Default::default()
        };
        Assembler::with_options(Qti21, options)
            .generate(&quiz(), &assets)
            .unwrap()
    }

    fn text(package: &qtipack_core::package::Package, path: &str) -> String {
        String::from_utf8(package.file(path).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn choice_item_vocabulary() {
        let package = generate();
        let xml = text(&package, "items/arithmetic_t21.xml");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<assessmentItem xmlns=\"http://www.imsglobal.org/xsd/imsqti_v2p1\""));
        assert!(xml.contains(
            "<responseDeclaration identifier=\"RESPONSE\" cardinality=\"single\" baseType=\"identifier\">"
        ));
        assert!(xml.contains("<value>choice_3_t21</value>"));
        assert!(xml.contains(
            "<choiceInteraction responseIdentifier=\"RESPONSE\" shuffle=\"false\" maxChoices=\"1\">"
        ));
        assert!(xml.contains("<simpleChoice identifier=\"choice_t21\">6</simpleChoice>"));
        assert!(xml.contains("normalMaximum=\"2.0\""));
        assert!(xml.contains("<responseIf>"));
        assert!(xml.contains("<match>"));
        assert!(xml.contains("<baseValue baseType=\"float\">2.0</baseValue>"));
        assert!(xml.contains("<modalFeedback outcomeIdentifier=\"FEEDBACK\""));
        assert!(!xml.contains("qti-"));
    }

    #[test]
    fn text_entry_and_human_scored_items() {
        let package = generate();
        let short = text(&package, "items/santa_t21.xml");
        assert!(short.contains("<stringMatch caseSensitive=\"false\">"));
        assert!(short.contains("expectedLength=\"20\""));

        let upload = text(&package, "items/upload_t21.xml");
        assert!(upload.contains("baseType=\"file\""));
        assert!(upload.contains("<uploadInteraction responseIdentifier=\"RESPONSE\">"));
        assert!(upload.contains("interpretation=\"human-scored\""));
        assert!(!upload.contains("<responseProcessing>"));

        let essay = text(&package, "items/plot_t21.xml");
        assert!(essay.contains("<extendedTextInteraction responseIdentifier=\"RESPONSE\" expectedLines=\"10\">"));
        assert!(essay.contains("src=\"../assets/plot.png\""));
    }

    #[test]
    fn test_document_structure() {
        let package = generate();
        let xml = text(&package, "tests/tom_s_qti_quiz_t21.xml");
        assert!(xml.contains("title=\"Tom&apos;s &quot;QTI&quot; quiz\""));
        assert!(xml.contains("navigationMode=\"linear\" submissionMode=\"individual\""));
        assert!(xml.contains("<itemSessionControl maxAttempts=\"1\" showFeedback=\"true\""));
        assert!(xml.contains("<selection select=\"1\"/>"));
        assert!(xml.contains("<ordering shuffle=\"true\"/>"));
        assert!(xml.contains(
            "<assessmentItemRef identifier=\"arithmetic_t21\" href=\"../items/arithmetic_t21.xml\"/>"
        ));
        assert!(xml.contains("identifier=\"intermission_t21\""));
        assert_eq!(xml.matches("<assessmentItemRef").count(), 5);
    }

    #[test]
    fn manifest_resources() {
        let package = generate();
        let xml = text(&package, "imsmanifest.xml");
        assert!(xml.contains("xmlns=\"http://www.imsglobal.org/xsd/imscp_v1p1\""));
        assert!(xml.contains("<schema>QTIv2.1 Package</schema>"));
        assert!(xml.contains("type=\"imsqti_test_xmlv2p1\""));
        assert_eq!(xml.matches("type=\"imsqti_item_xmlv2p1\"").count(), 5);
        assert!(xml.contains("type=\"webcontent\" href=\"assets/plot.png\""));
        assert!(xml.contains("<imsqti:interactionType>choiceInteraction</imsqti:interactionType>"));
        assert!(xml.contains("<dependency identifierref=\"plot.png_t21\"/>"));
        assert!(xml.contains("<imsmd:string>Checks &amp; balances</imsmd:string>"));
        assert!(xml.contains(&format!("qtipack {}", env!("CARGO_PKG_VERSION"))));
        assert!(xml.contains(
            "<imsmd:technical><imsmd:format>image/png</imsmd:format></imsmd:technical>"
        ));
        assert_eq!(xml.matches("<imsmd:format>").count(), 1);
    }

    #[test]
    fn manifest_media_type_from_file_name() {
        let mut quiz = quiz();
        let Entry::Question(plot) = &mut quiz.entries[3] else {
            unreachable!()
        };
        plot.prompt = r#"<p><img src="pic.bmp"/></p>"#.into();
        plot.assets = vec!["pic.bmp".into()];
        let media_type = qtipack_core::parser::media_type_for(std::path::Path::new("pic.bmp"));
        let assets = AssetMap::from([("pic.bmp".to_string(), Asset::new(vec![0x42], media_type))]);
        let options = AssemblerOptions {
            namespace: Some("bmp".into()),
            ..Default::default()
        };
        let package = Assembler::with_options(Qti21, options)
            .generate(&quiz, &assets)
            .unwrap();

        let xml = text(&package, "imsmanifest.xml");
        assert!(xml.contains("<imsmd:format>image/bmp</imsmd:format>"));
        assert!(!xml.contains("octet-stream"));
    }
}
