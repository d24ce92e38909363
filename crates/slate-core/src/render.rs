use crate::node::{ElementNode, Node, PARAGRAPH, TextNode};
use crate::path::Path;
use crate::plugins::{CHECK_LIST_ITEM, IMAGE, LINK, MATH_BLOCK, MATH_MARK};

/// Element kinds a renderer knows how to draw. Anything else is `Unknown`
/// and drawn as a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind<'a> {
    Paragraph,
    BlockQuote,
    HeadingOne,
    HeadingTwo,
    BulletedList,
    NumberedList,
    ListItem,
    CheckListItem { checked: bool },
    Link { url: &'a str },
    Image { url: &'a str },
    MathBlock { formula: &'a str },
    Unknown(&'a str),
}

impl<'a> ElementKind<'a> {
    pub fn of(element: &'a ElementNode) -> Self {
        match element.kind.as_str() {
            PARAGRAPH => Self::Paragraph,
            "block-quote" => Self::BlockQuote,
            "heading-one" => Self::HeadingOne,
            "heading-two" => Self::HeadingTwo,
            "bulleted-list" => Self::BulletedList,
            "numbered-list" => Self::NumberedList,
            "list-item" => Self::ListItem,
            CHECK_LIST_ITEM => Self::CheckListItem {
                checked: element
                    .attr("checked")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            },
            LINK => Self::Link {
                url: element.attr_str("url").unwrap_or_default(),
            },
            IMAGE => Self::Image {
                url: element.attr_str("url").unwrap_or_default(),
            },
            MATH_BLOCK => Self::MathBlock {
                formula: element.attr_str("formula").unwrap_or_default(),
            },
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeafMarks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub code: bool,
    pub math: bool,
}

impl LeafMarks {
    pub fn of(text: &TextNode) -> Self {
        Self {
            bold: text.has_mark("bold"),
            italic: text.has_mark("italic"),
            underline: text.has_mark("underline"),
            code: text.has_mark("code"),
            math: text.has_mark(MATH_MARK),
        }
    }
}

/// Rendering collaborator. `element` is called before an element's children
/// and `end_element` after them.
pub trait Renderer {
    fn element(&mut self, kind: ElementKind<'_>, element: &ElementNode, path: &[usize]);

    fn end_element(&mut self, _kind: ElementKind<'_>, _path: &[usize]) {}

    fn leaf(&mut self, text: &str, marks: LeafMarks, path: &[usize]);
}

/// Walk `nodes` in document order, feeding `renderer`.
pub fn render_document(nodes: &[Node], renderer: &mut dyn Renderer) {
    fn walk(children: &[Node], path: &mut Path, renderer: &mut dyn Renderer) {
        for (ix, child) in children.iter().enumerate() {
            path.push(ix);
            match child {
                Node::Text(text) => renderer.leaf(&text.text, LeafMarks::of(text), path),
                Node::Element(el) => {
                    let kind = match ElementKind::of(el) {
                        ElementKind::Unknown(kind) => {
                            tracing::debug!(kind, ?path, "rendering unknown element as paragraph");
                            ElementKind::Paragraph
                        }
                        kind => kind,
                    };
                    renderer.element(kind, el, path);
                    walk(&el.children, path, renderer);
                    renderer.end_element(kind, path);
                }
            }
            path.pop();
        }
    }

    let mut path = Vec::new();
    walk(nodes, &mut path, renderer);
}
