use manos_slate_core::{
    AttrPatch, DeleteOptions, Document, Edge, Editor, ElementNode, InsertOptions, Location, Match,
    MoveOptions, Node, NodeOptions, PluginRegistry, Point, Range, SplitOptions, TextNode, Unit,
};

fn editor(children: Vec<Node>, selection: Option<Range>) -> Editor {
    Editor::new(Document::new(children), selection, PluginRegistry::richtext())
}

fn caret(path: &[usize], offset: usize) -> Option<Range> {
    Some(Range::collapsed(Point::new(path.to_vec(), offset)))
}

fn span(from: (&[usize], usize), to: (&[usize], usize)) -> Range {
    Range::new(
        Point::new(from.0.to_vec(), from.1),
        Point::new(to.0.to_vec(), to.1),
    )
}

#[test]
fn wrap_then_unwrap_is_identity() {
    let children = vec![Node::paragraph("a"), Node::paragraph("b"), Node::paragraph("c")];
    let mut editor = editor(children.clone(), Some(span((&[0, 0], 0), (&[1, 0], 1))));

    editor
        .wrap_nodes(ElementNode::new("block-quote", Vec::new()), NodeOptions::default())
        .unwrap();
    assert_eq!(
        editor.doc().children,
        vec![
            Node::element(
                "block-quote",
                vec![Node::paragraph("a"), Node::paragraph("b")]
            ),
            Node::paragraph("c"),
        ]
    );
    assert_eq!(
        editor.selection(),
        Some(&span((&[0, 0, 0], 0), (&[0, 1, 0], 1)))
    );

    editor
        .unwrap_nodes(NodeOptions::default().matching(Match::kind("block-quote")))
        .unwrap();
    assert_eq!(editor.doc().children, children);
}

#[test]
fn unwrap_with_split_only_lifts_the_covered_children() {
    let mut editor = editor(
        vec![Node::element(
            "block-quote",
            vec![Node::paragraph("a"), Node::paragraph("b"), Node::paragraph("c")],
        )],
        caret(&[0, 1, 0], 0),
    );

    editor
        .unwrap_nodes(
            NodeOptions::default()
                .matching(Match::kind("block-quote"))
                .split(),
        )
        .unwrap();

    assert_eq!(
        editor.doc().children,
        vec![
            Node::element("block-quote", vec![Node::paragraph("a")]),
            Node::paragraph("b"),
            Node::element("block-quote", vec![Node::paragraph("c")]),
        ]
    );
}

#[test]
fn insert_break_splits_and_backspace_merges() {
    let mut editor = editor(vec![Node::paragraph("hello")], caret(&[0, 0], 2));

    editor.insert_break().unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("he"), Node::paragraph("llo")]
    );
    assert_eq!(editor.selection(), caret(&[1, 0], 0).as_ref());

    editor.delete_backward(Unit::Character).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("hello")]);
    assert_eq!(editor.selection(), caret(&[0, 0], 2).as_ref());
}

#[test]
fn delete_forward_at_block_end_pulls_the_next_block_up() {
    let mut editor = editor(
        vec![Node::paragraph("ab"), Node::paragraph("cd")],
        caret(&[0, 0], 2),
    );

    editor.delete_forward(Unit::Character).unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("abcd")]);
    assert_eq!(editor.selection(), caret(&[0, 0], 2).as_ref());
}

#[test]
fn deleting_an_expanded_range_across_blocks_joins_them() {
    let mut editor = editor(
        vec![Node::paragraph("hello"), Node::paragraph("world")],
        Some(span((&[0, 0], 3), (&[1, 0], 2))),
    );

    editor.delete_backward(Unit::Character).unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("helrld")]);
    assert_eq!(editor.selection(), caret(&[0, 0], 3).as_ref());
}

#[test]
fn deleting_a_word_backward() {
    let mut editor = editor(vec![Node::paragraph("hello big world")], caret(&[0, 0], 9));

    editor.delete_backward(Unit::Word).unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("hello  world")]);
    assert_eq!(editor.selection(), caret(&[0, 0], 6).as_ref());
}

#[test]
fn deleting_keeps_grapheme_clusters_whole() {
    let mut editor = editor(vec![Node::paragraph("ae\u{301}")], caret(&[0, 0], 4));

    editor.delete_backward(Unit::Character).unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("a")]);
}

#[test]
fn delete_with_explicit_range_keeps_the_selection() {
    let mut editor = editor(vec![Node::paragraph("abcdef")], caret(&[0, 0], 6));

    editor
        .delete(DeleteOptions::at(span((&[0, 0], 1), (&[0, 0], 3))))
        .unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("adef")]);
    assert_eq!(editor.selection(), caret(&[0, 0], 4).as_ref());
}

#[test]
fn insert_nodes_at_a_path() {
    let mut editor = editor(vec![Node::paragraph("a"), Node::paragraph("b")], caret(&[1, 0], 1));

    editor
        .insert_nodes(
            vec![Node::paragraph("x")],
            InsertOptions::at(Location::Path(vec![1])),
        )
        .unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("x"), Node::paragraph("b")]
    );
    assert_eq!(editor.selection(), caret(&[2, 0], 1).as_ref());
}

#[test]
fn inserting_a_block_mid_text_splits_the_block() {
    let mut editor = editor(vec![Node::paragraph("abcd")], caret(&[0, 0], 2));

    editor
        .insert_nodes(vec![Node::paragraph("new")], InsertOptions::default())
        .unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("ab"), Node::paragraph("new"), Node::paragraph("cd")]
    );
    assert_eq!(editor.selection(), caret(&[1, 0], 3).as_ref());
}

#[test]
fn inserting_text_replaces_an_expanded_selection() {
    let mut editor = editor(vec![Node::paragraph("hello")], Some(span((&[0, 0], 1), (&[0, 0], 4))));

    editor.insert_text("ipp").unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("hippo")]);
    assert_eq!(editor.selection(), caret(&[0, 0], 4).as_ref());
}

#[test]
fn pasted_lines_become_blocks() {
    let mut editor = editor(vec![Node::paragraph("")], caret(&[0, 0], 0));

    editor
        .insert_data(manos_slate_core::DataTransfer::text("one\r\ntwo"))
        .unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("one"), Node::paragraph("two")]
    );
    assert_eq!(editor.selection(), caret(&[1, 0], 3).as_ref());
}

#[test]
fn set_nodes_with_split_only_marks_the_range() {
    let mut editor = editor(vec![Node::paragraph("abcdef")], None);

    editor
        .set_nodes(
            AttrPatch::set("code", true),
            NodeOptions::at(span((&[0, 0], 2), (&[0, 0], 4)))
                .matching(Match::Text)
                .split(),
        )
        .unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::element(
            "paragraph",
            vec![
                Node::text("ab"),
                TextNode::new("cd").with_mark("code", true).into(),
                Node::text("ef"),
            ],
        )]
    );
    assert_eq!(editor.selection(), None);

    editor
        .unset_nodes(["code"], NodeOptions::at(Location::Path(vec![0, 1])))
        .unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("abcdef")]);
}

#[test]
fn move_and_remove_nodes() {
    let mut editor = editor(
        vec![Node::paragraph("a"), Node::paragraph("b"), Node::paragraph("c")],
        caret(&[0, 0], 1),
    );

    editor
        .move_nodes(NodeOptions::at(Location::Path(vec![0])), vec![2])
        .unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("b"), Node::paragraph("c"), Node::paragraph("a")]
    );
    assert_eq!(editor.selection(), caret(&[2, 0], 1).as_ref());

    editor
        .remove_nodes(NodeOptions::at(Location::Path(vec![1])))
        .unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("b"), Node::paragraph("a")]
    );
    assert_eq!(editor.selection(), caret(&[1, 0], 1).as_ref());
}

#[test]
fn split_and_merge_by_path() {
    let mut editor = editor(vec![Node::paragraph("a"), Node::paragraph("b")], None);

    editor
        .merge_nodes(NodeOptions::at(Location::Path(vec![1])))
        .unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);

    editor
        .split_nodes(SplitOptions::at(Point::new(vec![0, 0], 1)).always())
        .unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("b")]
    );
}

#[test]
fn lift_moves_a_middle_child_out_and_splits_the_parent() {
    let mut editor = editor(
        vec![Node::element(
            "block-quote",
            vec![Node::paragraph("a"), Node::paragraph("b"), Node::paragraph("c")],
        )],
        None,
    );

    editor
        .lift_nodes(NodeOptions::at(Location::Path(vec![0, 1])))
        .unwrap();

    assert_eq!(
        editor.doc().children,
        vec![
            Node::element("block-quote", vec![Node::paragraph("a")]),
            Node::paragraph("b"),
            Node::element("block-quote", vec![Node::paragraph("c")]),
        ]
    );
}

#[test]
fn failed_transforms_roll_back() {
    let children = vec![Node::paragraph("a")];
    let mut editor = editor(children.clone(), caret(&[0, 0], 0));

    let err = editor
        .lift_nodes(NodeOptions::at(Location::Path(vec![0])))
        .unwrap_err();

    assert_eq!(err, manos_slate_core::EditorError::Lift(vec![0]));
    assert_eq!(editor.doc().children, children);
    assert_eq!(editor.selection(), caret(&[0, 0], 0).as_ref());
}

#[test]
fn selection_transforms() {
    let mut editor = editor(vec![Node::paragraph("hello world")], caret(&[0, 0], 0));

    editor
        .move_selection(MoveOptions {
            unit: Unit::Word,
            ..MoveOptions::default()
        })
        .unwrap();
    assert_eq!(editor.selection(), caret(&[0, 0], 5).as_ref());

    editor
        .set_point(Point::new(vec![0, 0], 11), Edge::Focus)
        .unwrap();
    assert_eq!(editor.string(&Location::Range(span((&[0, 0], 5), (&[0, 0], 11)))), " world");
    assert_eq!(editor.selection(), Some(&span((&[0, 0], 5), (&[0, 0], 11))));

    editor.collapse(Edge::End).unwrap();
    assert_eq!(editor.selection(), caret(&[0, 0], 11).as_ref());

    editor.select(Location::Path(vec![0])).unwrap();
    assert_eq!(editor.selection(), Some(&span((&[0, 0], 0), (&[0, 0], 11))));

    assert!(editor.select(Point::new(vec![0, 0], 99)).is_err());
    assert!(editor.select(Point::new(vec![3, 0], 0)).is_err());

    editor.deselect().unwrap();
    assert_eq!(editor.selection(), None);
}

#[test]
fn a_selection_outside_the_document_is_dropped() {
    for selection in [caret(&[0, 0], 99), caret(&[5, 0], 0)] {
        let children = vec![Node::paragraph("ab")];
        let mut editor = editor(children.clone(), selection);
        assert_eq!(editor.selection(), None);

        editor.insert_text("x").unwrap();
        editor.delete_backward(Unit::Character).unwrap();
        editor.insert_break().unwrap();
        editor.insert_link("https://x.io").unwrap();
        editor.insert_image("https://x.io/a.png").unwrap();

        assert_eq!(editor.doc().children, children);
    }
}

#[test]
fn removing_the_only_block_moves_the_caret_into_its_replacement() {
    let image: Node = ElementNode::new("image", vec![Node::text("")])
        .with_attr("url", "https://x.io/a.png")
        .into();
    let mut editor = editor(vec![image], caret(&[0, 0], 0));

    editor
        .remove_nodes(NodeOptions::at(Location::Path(vec![0])).voids(true))
        .unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(editor.selection(), caret(&[0, 0], 0).as_ref());

    editor.insert_text("hi").unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("hi")]);
}
