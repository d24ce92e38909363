use serde_json::Value;

use crate::editor::Editor;
use crate::error::EditorError;
use crate::node::{AttrPatch, ElementNode, Node};
use crate::path::Path;
use crate::plugins::{CHECK_LIST_ITEM, IMAGE, LINK, MATH_BLOCK};
use crate::query::{Match, NodesOptions};
use crate::range::{Edge, Location};
use crate::transforms::{InsertOptions, NodeOptions};

/// Block formats that set the `align` attribute instead of the block type.
pub const TEXT_ALIGN_TYPES: [&str; 4] = ["left", "center", "right", "justify"];

fn is_align_type(format: &str) -> bool {
    TEXT_ALIGN_TYPES.contains(&format)
}

impl Editor {
    /// A mark is active when the marks for the next insert carry it as `true`.
    pub fn is_mark_active(&self, format: &str) -> bool {
        self.marks()
            .is_some_and(|marks| marks.get(format) == Some(&Value::Bool(true)))
    }

    pub fn toggle_mark(&mut self, format: &str) -> Result<(), EditorError> {
        if self.is_mark_active(format) {
            self.remove_mark(format)
        } else {
            self.add_mark(format, true)
        }
    }

    /// Whether any element in the selection has the block type (or alignment)
    /// `format`.
    pub fn is_block_active(&self, format: &str) -> bool {
        let Some(selection) = self.selection() else {
            return false;
        };
        let at = self.unhang_range(selection);
        let matches = if is_align_type(format) {
            let format = format.to_string();
            Match::Element.and(Match::custom(move |node, _| {
                node.as_element().and_then(|el| el.attr_str("align")) == Some(format.as_str())
            }))
        } else {
            Match::kind(format)
        };
        self.nodes(NodesOptions::at(at).matching(matches))
            .next()
            .is_some()
    }

    /// Switch the selected blocks to `format`, or back to the default block
    /// when it is already active. List formats unwrap any list first so lists
    /// never nest directly; alignment formats toggle the `align` attribute.
    pub fn toggle_block(&mut self, format: &str) -> Result<(), EditorError> {
        self.transact("toggle_block", |editor| {
            let is_align = is_align_type(format);
            let is_active = editor.is_block_active(format);
            let is_list = editor.config().is_list_type(format);

            if !is_align {
                let list_types = editor.config().list_types.clone();
                editor.unwrap_nodes_inner(
                    NodeOptions::default()
                        .matching(Match::Kinds(list_types))
                        .split(),
                )?;
            }

            let patch = if is_align {
                if is_active {
                    AttrPatch::remove(["align"])
                } else {
                    AttrPatch::set("align", format)
                }
            } else if is_active {
                AttrPatch::set("type", editor.config().default_block.clone())
            } else if is_list {
                AttrPatch::set("type", editor.config().list_item_type.clone())
            } else {
                AttrPatch::set("type", format)
            };
            editor.set_nodes_inner(patch, NodeOptions::default())?;

            if !is_active && is_list {
                editor.wrap_nodes_inner(ElementNode::new(format, Vec::new()), NodeOptions::default())?;
            }
            Ok(())
        })
    }

    pub fn is_link_active(&self) -> bool {
        self.nodes(NodesOptions::default().matching(Match::kind(LINK)))
            .next()
            .is_some()
    }

    pub fn unwrap_link(&mut self) -> Result<(), EditorError> {
        self.transact("unwrap_link", |editor| {
            editor.unwrap_nodes_inner(NodeOptions::default().matching(Match::kind(LINK)))
        })
    }

    /// Link the selected text to `url`, replacing any link already there. A
    /// collapsed selection inserts the url itself as the link text.
    pub fn wrap_link(&mut self, url: &str) -> Result<(), EditorError> {
        self.transact("wrap_link", |editor| {
            if editor.is_link_active() {
                editor.unwrap_nodes_inner(NodeOptions::default().matching(Match::kind(LINK)))?;
            }
            let Some(selection) = editor.selection() else {
                return Ok(());
            };
            if selection.is_collapsed() {
                let link = ElementNode::new(LINK, vec![Node::text(url)]).with_attr("url", url);
                editor.insert_nodes_inner(vec![link.into()], InsertOptions::default())
            } else {
                let link = ElementNode::new(LINK, Vec::new()).with_attr("url", url);
                editor.wrap_nodes_inner(link, NodeOptions::default().split())?;
                editor.collapse_inner(Edge::End)
            }
        })
    }

    pub fn insert_link(&mut self, url: &str) -> Result<(), EditorError> {
        if self.selection().is_none() {
            return Ok(());
        }
        self.wrap_link(url)
    }

    /// Insert an image block at the selection, followed by an empty block to
    /// keep typing in.
    pub fn insert_image(&mut self, url: &str) -> Result<(), EditorError> {
        self.transact("insert_image", |editor| {
            let image = ElementNode::new(IMAGE, vec![Node::text("")]).with_attr("url", url);
            editor.insert_block_with_trailing(image)
        })
    }

    pub fn insert_math_block(&mut self, formula: &str) -> Result<(), EditorError> {
        self.transact("insert_math_block", |editor| {
            let block =
                ElementNode::new(MATH_BLOCK, vec![Node::text("")]).with_attr("formula", formula);
            editor.insert_block_with_trailing(block)
        })
    }

    fn insert_block_with_trailing(&mut self, block: ElementNode) -> Result<(), EditorError> {
        if self.selection().is_none() {
            return Ok(());
        }
        self.insert_nodes_inner(vec![block.into()], InsertOptions::default())?;
        let trailing = Node::element(self.config().default_block.clone(), vec![Node::text("")]);
        self.insert_nodes_inner(vec![trailing], InsertOptions::default())
    }

    pub fn check_list_item(&self) -> Option<(Path, bool)> {
        self.nodes(NodesOptions::default().matching(Match::kind(CHECK_LIST_ITEM)))
            .next()
            .map(|(node, path)| {
                let checked = node
                    .as_element()
                    .and_then(|el| el.attr("checked"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                (path, checked)
            })
    }

    pub fn set_checked(&mut self, path: Path, checked: bool) -> Result<(), EditorError> {
        self.transact("set_checked", |editor| {
            editor.set_nodes_inner(
                AttrPatch::set("checked", checked),
                NodeOptions::at(Location::Path(path)),
            )
        })
    }

    pub fn toggle_checked(&mut self) -> Result<(), EditorError> {
        let Some((path, checked)) = self.check_list_item() else {
            return Ok(());
        };
        self.set_checked(path, !checked)
    }
}
