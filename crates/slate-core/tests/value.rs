use anyhow::Context as _;
use manos_slate_core::{
    Document, DocumentValue, EditorConfig, ElementNode, LINK, Node, Op, Point, Range, TextNode,
    Transaction,
};
use serde_json::json;

fn sample() -> Document {
    Document::new(vec![
        Node::element(
            "paragraph",
            vec![
                TextNode::new("a").with_mark("bold", true).into(),
                ElementNode::new(LINK, vec![Node::text("site")])
                    .with_attr("url", "https://example.com")
                    .into(),
                Node::text(""),
            ],
        ),
        ElementNode::new("check-list-item", vec![Node::text("task")])
            .with_attr("checked", true)
            .into(),
    ])
}

#[test]
fn documents_serialize_to_the_canonical_shape() -> anyhow::Result<()> {
    let value = serde_json::to_value(sample())?;

    assert_eq!(
        value,
        json!([
            {
                "type": "paragraph",
                "children": [
                    { "text": "a", "bold": true },
                    { "type": "link", "url": "https://example.com", "children": [{ "text": "site" }] },
                    { "text": "" }
                ]
            },
            { "type": "check-list-item", "checked": true, "children": [{ "text": "task" }] }
        ])
    );
    Ok(())
}

#[test]
fn envelope_round_trips_with_its_selection() -> anyhow::Result<()> {
    let selection = Range::new(Point::new(vec![0, 1, 0], 1), Point::new(vec![1, 0], 4));
    let value = DocumentValue::from_document(sample()).with_selection(Some(selection.clone()));

    let text = value.to_json_pretty().context("serialize envelope")?;
    let parsed = DocumentValue::from_json_str(&text).context("parse envelope")?;

    assert_eq!(parsed, value);
    assert_eq!(parsed.schema, "slate");
    assert_eq!(parsed.version, 1);
    assert_eq!(parsed.selection, Some(selection));
    assert_eq!(parsed.into_document(), sample());
    Ok(())
}

#[test]
fn bare_arrays_are_accepted() -> anyhow::Result<()> {
    let parsed = DocumentValue::from_json_str(r#"[{"type":"paragraph","children":[{"text":"x"}]}]"#)?;

    assert_eq!(parsed.schema, "slate");
    assert_eq!(parsed.selection, None);
    assert_eq!(parsed.document, Document::new(vec![Node::paragraph("x")]));
    Ok(())
}

#[test]
fn envelope_fields_default_when_missing() -> anyhow::Result<()> {
    let parsed = DocumentValue::from_json_str(
        r#"{"document":[{"type":"heading-one","children":[{"text":"t"}]}]}"#,
    )?;

    assert_eq!(parsed.version, 1);
    assert_eq!(parsed.document.children[0].kind(), Some("heading-one"));
    Ok(())
}

#[test]
fn malformed_values_are_rejected() {
    assert!(DocumentValue::from_json_str(r#"{"document":3}"#).is_err());
    assert!(DocumentValue::from_json_str("[{\"children\":[]}]").is_err());
    assert!(Document::from_json_str("not json").is_err());
}

#[test]
fn transactions_deserialize_from_tagged_ops() -> anyhow::Result<()> {
    let tx: Transaction = serde_json::from_value(json!({
        "ops": [
            { "op": "insert_text", "path": [0, 0], "offset": 0, "text": "hi" },
            { "op": "set_node", "path": [0], "patch": { "set": { "align": "center" } } }
        ],
        "selection_after": {
            "anchor": { "path": [0, 0], "offset": 2 },
            "focus": { "path": [0, 0], "offset": 2 }
        },
        "meta": { "source": "remote" }
    }))?;

    assert_eq!(
        tx.ops[0],
        Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "hi".to_string(),
        }
    );
    assert_eq!(tx.meta.source.as_deref(), Some("remote"));

    let mut editor = manos_slate_core::Editor::with_richtext_plugins();
    editor.apply(tx)?;
    assert_eq!(
        editor.doc().children,
        vec![ElementNode::new("paragraph", vec![Node::text("hi")])
            .with_attr("align", "center")
            .into()]
    );
    assert_eq!(
        editor.selection(),
        Some(&Range::collapsed(Point::new(vec![0, 0], 2)))
    );
    Ok(())
}

#[test]
fn config_fills_in_defaults() -> anyhow::Result<()> {
    let config = EditorConfig::from_json_str(r#"{"default_block":"","image_extensions":["png"]}"#)?;

    assert_eq!(config.default_block, "paragraph");
    assert_eq!(config.image_extensions, vec!["png".to_string()]);
    assert_eq!(config.max_normalize_iterations, 100);
    assert!(config.is_list_type("bulleted-list"));
    Ok(())
}
