use std::sync::{Arc, Mutex};

use manos_slate_core::{
    ChangeRecord, Document, Editor, ElementNode, InsertOptions, Location, MATH_BLOCK, MATH_MARK,
    MathDrafts, Node, NodeOptions, Point, PluginRegistry, Range,
};

fn math_block(formula: &str) -> Node {
    ElementNode::new(MATH_BLOCK, vec![Node::text("")])
        .with_attr("formula", formula)
        .into()
}

#[test]
fn insert_command_adds_a_void_math_block() {
    let mut editor = Editor::with_richtext_plugins();

    editor
        .run_command("math.insert", Some(serde_json::json!({ "formula": "x^2" })))
        .unwrap();

    assert_eq!(editor.doc().children[1], math_block("x^2"));
    assert_eq!(editor.doc().children.len(), 3);
    assert_eq!(
        editor.run_query::<Option<String>>("math.formula", None).unwrap(),
        None
    );

    editor.select(Point::new(vec![1, 0], 0)).unwrap();
    assert_eq!(
        editor.run_query::<Option<String>>("math.formula", None).unwrap(),
        Some("x^2".to_string())
    );
}

#[test]
fn typing_inside_a_math_block_does_nothing() {
    let doc = Document::new(vec![math_block("a+b")]);
    let selection = Range::collapsed(Point::new(vec![0, 0], 0));
    let mut editor = Editor::new(doc.clone(), Some(selection), PluginRegistry::richtext());

    editor.insert_text("zzz").unwrap();

    assert_eq!(editor.doc(), &doc);
}

#[test]
fn drafts_commit_into_the_formula() {
    let mut editor = Editor::new(
        Document::new(vec![math_block("a")]),
        None,
        PluginRegistry::richtext(),
    );
    let mut drafts = MathDrafts::new();

    let session = drafts.open(&editor, vec![0]).unwrap();
    assert_eq!(session.draft(), "a");
    session.set_draft("a + 1");
    assert!(session.is_dirty());

    drafts.commit(&mut editor, &[0]).unwrap();

    assert!(drafts.is_empty());
    assert_eq!(editor.doc().children, vec![math_block("a + 1")]);
}

#[test]
fn drafts_follow_their_block_and_drop_when_it_is_removed() {
    let history = Arc::new(Mutex::new(Vec::<ChangeRecord>::new()));
    let mut editor = Editor::new(
        Document::new(vec![Node::paragraph("x"), math_block("a"), math_block("b")]),
        None,
        PluginRegistry::richtext(),
    )
    .with_history(Arc::clone(&history));
    let mut drafts = MathDrafts::new();
    drafts.open(&editor, vec![1]).unwrap().set_draft("a2");
    drafts.open(&editor, vec![2]).unwrap().set_draft("b2");
    assert_eq!(drafts.len(), 2);

    editor
        .insert_nodes(
            vec![Node::paragraph("intro")],
            InsertOptions::at(Location::Path(vec![0])),
        )
        .unwrap();
    editor
        .remove_nodes(NodeOptions::at(Location::Path(vec![2])).voids(true))
        .unwrap();
    for record in history.lock().unwrap().iter() {
        drafts.transform(&record.ops);
    }

    assert_eq!(drafts.len(), 1);
    assert!(drafts.get(&[3]).is_none());
    assert_eq!(drafts.get(&[2]).map(|s| s.draft()), Some("b2"));

    drafts.commit(&mut editor, &[2]).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("intro"), Node::paragraph("x"), math_block("b2")]
    );
}

#[test]
fn clean_sessions_commit_nothing() {
    let history = Arc::new(Mutex::new(Vec::<ChangeRecord>::new()));
    let mut editor = Editor::new(
        Document::new(vec![math_block("a")]),
        None,
        PluginRegistry::richtext(),
    )
    .with_history(Arc::clone(&history));
    let mut drafts = MathDrafts::new();
    drafts.open(&editor, vec![0]).unwrap();

    drafts.commit(&mut editor, &[0]).unwrap();

    assert!(history.lock().unwrap().is_empty());
}

#[test]
fn inline_math_toggles_the_math_mark() {
    let doc = Document::new(vec![Node::paragraph("e=mc2")]);
    let selection = Range::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 5));
    let mut editor = Editor::new(doc, Some(selection), PluginRegistry::richtext());

    editor.run_command("math.toggle_inline", None).unwrap();

    let Some(Node::Text(text)) = editor.doc().node(&[0, 0]) else {
        panic!("expected text");
    };
    assert!(text.has_mark(MATH_MARK));
    assert!(editor.is_mark_active(MATH_MARK));
}

#[test]
fn drafts_cannot_open_on_other_blocks() {
    let editor = Editor::new(
        Document::new(vec![Node::paragraph("x")]),
        None,
        PluginRegistry::richtext(),
    );
    let mut drafts = MathDrafts::new();
    assert!(drafts.open(&editor, vec![0]).is_none());
}

#[test]
fn math_blocks_inserted_in_a_list_keep_their_formula() {
    let mut editor = Editor::new(
        Document::new(vec![Node::element(
            "numbered-list",
            vec![Node::element("list-item", vec![Node::text("ab")])],
        )]),
        Some(Range::collapsed(Point::new(vec![0, 0, 0], 2))),
        PluginRegistry::richtext(),
    );

    editor.insert_math_block("x^2").unwrap();

    let Some(Node::Element(list)) = editor.doc().node(&[0]) else {
        panic!("expected list");
    };
    assert_eq!(list.children[1], math_block("x^2"));
    assert!(
        list.children
            .iter()
            .filter_map(Node::as_element)
            .filter(|el| el.kind == "list-item")
            .all(|el| el.attr_str("formula").is_none())
    );
}
