use manos_slate_core::{
    Document, Edge, Editor, ElementNode, IMAGE, Location, Match, Mode, Node, NodesOptions,
    PluginRegistry, Point, Range, Unit,
};

fn editor(children: Vec<Node>) -> Editor {
    Editor::new(Document::new(children), None, PluginRegistry::richtext())
}

fn list_doc() -> Vec<Node> {
    vec![
        Node::element(
            "bulleted-list",
            vec![
                Node::element("list-item", vec![Node::text("a")]),
                Node::element("list-item", vec![Node::text("b")]),
            ],
        ),
        Node::paragraph("c"),
    ]
}

fn paths(editor: &Editor, options: NodesOptions) -> Vec<Vec<usize>> {
    editor.nodes(options).map(|(_, path)| path).collect()
}

#[test]
fn nodes_modes_pick_the_right_level() {
    let editor = editor(list_doc());
    let everywhere = || NodesOptions::at(Location::Path(Vec::new())).matching(Match::Block);

    assert_eq!(
        paths(&editor, everywhere().mode(Mode::Lowest)),
        vec![vec![0, 0], vec![0, 1], vec![1]]
    );
    assert_eq!(
        paths(&editor, everywhere().mode(Mode::Highest)),
        vec![vec![0], vec![1]]
    );
    assert_eq!(
        paths(&editor, everywhere()),
        vec![vec![0], vec![0, 0], vec![0, 1], vec![1]]
    );
}

#[test]
fn nodes_walk_backwards() {
    let editor = editor(list_doc());

    let texts: Vec<String> = editor
        .nodes(
            NodesOptions::at(Location::Path(Vec::new()))
                .matching(Match::Text)
                .reverse(),
        )
        .filter_map(|(node, _)| node.as_text().map(|t| t.text.clone()))
        .collect();

    assert_eq!(texts, vec!["c", "b", "a"]);
}

#[test]
fn nodes_stay_inside_the_range() {
    let editor = editor(list_doc());
    let range = Range::new(Point::new(vec![0, 1, 0], 0), Point::new(vec![1, 0], 1));

    assert_eq!(
        paths(&editor, NodesOptions::at(range).matching(Match::Text)),
        vec![vec![0, 1, 0], vec![1, 0]]
    );
}

#[test]
fn nodes_skip_void_content_unless_asked() {
    let image: Node = ElementNode::new(IMAGE, vec![Node::text("")])
        .with_attr("url", "https://example.com/cat.png")
        .into();
    let editor = editor(vec![Node::paragraph("x"), image, Node::paragraph("y")]);
    let texts = || NodesOptions::at(Location::Path(Vec::new())).matching(Match::Text);

    assert_eq!(paths(&editor, texts()), vec![vec![0, 0], vec![2, 0]]);
    assert_eq!(
        paths(&editor, texts().voids(true)),
        vec![vec![0, 0], vec![1, 0], vec![2, 0]]
    );
    assert_eq!(
        paths(&editor, NodesOptions::at(Location::Path(Vec::new())).matching(Match::Void)),
        vec![vec![1]]
    );
}

#[test]
fn ancestors_and_levels() {
    let editor = editor(list_doc());
    let at = Location::Point(Point::new(vec![0, 1, 0], 0));

    let kinds: Vec<Option<&str>> = editor
        .levels(&[0, 1, 0])
        .into_iter()
        .map(|(node, _)| node.kind())
        .collect();
    assert_eq!(kinds, vec![Some("bulleted-list"), Some("list-item"), None]);

    assert_eq!(editor.above(&at, &Match::Block).map(|(_, p)| p), Some(vec![0, 1]));
    assert_eq!(
        editor.above_highest(&at, &Match::Block).map(|(_, p)| p),
        Some(vec![0])
    );
    assert!(editor.void_above(&at).is_none());
}

#[test]
fn positions_cross_block_boundaries() {
    let editor = editor(list_doc());

    assert_eq!(
        editor.before(&Point::new(vec![1, 0], 0), Unit::Character),
        Some(Point::new(vec![0, 1, 0], 1))
    );
    assert_eq!(
        editor.after(&Point::new(vec![0, 1, 0], 1), Unit::Character),
        Some(Point::new(vec![1, 0], 0))
    );
    assert_eq!(editor.before(&Point::new(vec![0, 0, 0], 0), Unit::Character), None);
    assert_eq!(editor.after(&Point::new(vec![1, 0], 1), Unit::Character), None);

    let whole = Location::Path(Vec::new());
    assert_eq!(editor.start(&whole).unwrap(), Point::new(vec![0, 0, 0], 0));
    assert_eq!(editor.end(&whole).unwrap(), Point::new(vec![1, 0], 1));
    assert_eq!(editor.string(&whole), "abc");
    assert!(editor.is_end(&Point::new(vec![0, 1, 0], 1), &[0]));
    assert!(editor.is_start(&Point::new(vec![0, 0, 0], 0), &[0]));
}

#[test]
fn word_movement_skips_spaces() {
    let editor = editor(vec![Node::paragraph("hello big world")]);

    assert_eq!(
        editor.after(&Point::new(vec![0, 0], 0), Unit::Word),
        Some(Point::new(vec![0, 0], 5))
    );
    assert_eq!(
        editor.after(&Point::new(vec![0, 0], 5), Unit::Word),
        Some(Point::new(vec![0, 0], 9))
    );
    assert_eq!(
        editor.before(&Point::new(vec![0, 0], 15), Unit::Word),
        Some(Point::new(vec![0, 0], 10))
    );
}

#[test]
fn hanging_ranges_are_pulled_back() {
    let editor = editor(vec![Node::paragraph("ab"), Node::paragraph("cd")]);
    let hanging = Range::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 0));

    assert_eq!(
        editor.unhang_range(&hanging),
        Range::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 2))
    );

    let inner = Range::new(Point::new(vec![0, 0], 1), Point::new(vec![1, 0], 0));
    assert_eq!(editor.unhang_range(&inner), inner);
}

#[test]
fn path_locations_resolve_to_ranges() {
    let editor = editor(list_doc());

    assert_eq!(
        editor.range(&Location::Path(vec![0])).unwrap(),
        Range::new(Point::new(vec![0, 0, 0], 0), Point::new(vec![0, 1, 0], 1))
    );
    assert_eq!(
        editor.point(&Location::Path(vec![1]), Edge::End).unwrap(),
        Point::new(vec![1, 0], 1)
    );
    assert!(editor.start(&Location::Path(vec![7])).is_err());
}

#[test]
fn classification_comes_from_the_plugin_chain() {
    let editor = editor(Vec::new());
    let link = ElementNode::new("link", vec![Node::text("x")]);
    let image = ElementNode::new(IMAGE, vec![Node::text("")]);
    let paragraph = ElementNode::new("paragraph", vec![Node::text("")]);

    assert!(editor.is_inline(&link));
    assert!(!editor.is_void(&link));
    assert!(editor.is_void(&image));
    assert!(editor.is_block(&image));
    assert!(editor.is_empty(&paragraph));
    assert!(!editor.is_empty(&image));

    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(editor.marks(), None);
}

#[test]
fn unknown_commands_and_queries_are_reported() {
    let mut editor = Editor::with_core_plugins();

    let err = editor.run_command("nope.nothing", None).unwrap_err();
    assert_eq!(err.message(), "Unknown command: nope.nothing");

    let err = editor.run_query_json("nope.nothing", None).unwrap_err();
    assert_eq!(err.message(), "Unknown query: nope.nothing");

    assert!(editor.run_command("link.insert", None).is_err());
}
