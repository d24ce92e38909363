use serde_json::Value;

use crate::error::{CommandError, QueryError};
use crate::node::{ElementNode, Node, PARAGRAPH};
use crate::ops::Op;
use crate::plugin::{
    CommandSpec, NodeSpec, NormalizeContext, NormalizePass, Plugin, PluginRegistry, QuerySpec,
};

use super::{command_str_arg, query_str_arg};

/// Structural normalization plus the mark and block commands every editor has.
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn id(&self) -> &'static str {
        "core"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(PARAGRAPH)]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(EnsureNonEmptyDocument), Box::new(NormalizeChildren)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("marks.toggle", "Toggle mark", |editor, args| {
                let format = command_str_arg(&args, "format")?;
                editor.toggle_mark(&format).map_err(|e| {
                    CommandError::new(format!("Failed to toggle mark {format}: {e}"))
                })
            })
            .description("Toggle a boolean mark on the selection or the caret.")
            .keywords(["bold", "italic", "underline", "code", "mark"])
            .args_example(serde_json::json!({ "format": "bold" })),
            CommandSpec::new("block.toggle", "Toggle block type", |editor, args| {
                let format = command_str_arg(&args, "format")?;
                editor.toggle_block(&format).map_err(|e| {
                    CommandError::new(format!("Failed to toggle block {format}: {e}"))
                })
            })
            .description("Switch the selected blocks to a type, list or alignment, or back.")
            .keywords(["heading", "quote", "list", "align", "block"])
            .args_example(serde_json::json!({ "format": "heading-one" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("marks.is_active", |editor, args| {
                let format = query_str_arg(&args, "format")?;
                Ok(Value::Bool(editor.is_mark_active(&format)))
            }),
            QuerySpec::new("marks.get_active", |editor, _args| {
                serde_json::to_value(editor.marks().unwrap_or_default())
                    .map_err(|err| QueryError::new(format!("Failed to encode marks: {err}")))
            }),
            QuerySpec::new("block.is_active", |editor, args| {
                let format = query_str_arg(&args, "format")?;
                Ok(Value::Bool(editor.is_block_active(&format)))
            }),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, cx: &NormalizeContext<'_>) -> Vec<Op> {
        if cx.doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::element(cx.config.default_block.clone(), vec![Node::text("")]),
            }];
        }
        Vec::new()
    }
}

// Voids hold one empty text and containers hold either blocks or inlines.
struct NormalizeChildren;

impl NormalizePass for NormalizeChildren {
    fn id(&self) -> &'static str {
        "core.normalize_children"
    }

    fn run(&self, cx: &NormalizeContext<'_>) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate().rev() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if registry.is_void(el) {
                    fix_void(el, path, ops);
                } else if el.children.is_empty() {
                    ops.push(Op::InsertNode {
                        path: child_path(path, 0),
                        node: Node::text(""),
                    });
                } else {
                    walk(&el.children, path, registry, ops);
                    fix_children(&el.children, path, registry.is_inline(el), registry, ops);
                }
                path.pop();
            }
        }

        walk(&cx.doc.children, &mut Vec::new(), cx.registry, &mut ops);
        if !cx.doc.children.is_empty() {
            fix_children(&cx.doc.children, &[], false, cx.registry, &mut ops);
        }
        ops
    }
}

fn child_path(parent: &[usize], ix: usize) -> Vec<usize> {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

fn fix_void(el: &ElementNode, path: &[usize], ops: &mut Vec<Op>) {
    if let [Node::Text(text)] = el.children.as_slice() {
        if text.text.is_empty() {
            return;
        }
    }
    for ix in (0..el.children.len()).rev() {
        ops.push(Op::RemoveNode {
            path: child_path(path, ix),
        });
    }
    ops.push(Op::InsertNode {
        path: child_path(path, 0),
        node: Node::text(""),
    });
}

fn fix_children(
    children: &[Node],
    path: &[usize],
    parent_is_inline: bool,
    registry: &PluginRegistry,
    ops: &mut Vec<Op>,
) {
    let is_root = path.is_empty();
    let wants_inlines = !is_root
        && (parent_is_inline
            || match children.first() {
                None | Some(Node::Text(_)) => true,
                Some(Node::Element(first)) => registry.is_inline(first),
            });

    let mut current = children.to_vec();
    let total = current.len();
    let mut n = 0;
    for i in 0..total {
        let is_last = i + 1 == total;
        let Some(child) = current.get(n) else {
            break;
        };
        let is_inline = match child {
            Node::Text(_) => true,
            Node::Element(el) => registry.is_inline(el),
        };

        if is_inline != wants_inlines {
            ops.push(Op::RemoveNode {
                path: child_path(path, n),
            });
            current.remove(n);
            continue;
        }

        match child {
            Node::Element(_) if is_inline => {
                let prev_is_text = n > 0 && current[n - 1].is_text();
                if !prev_is_text {
                    ops.push(Op::InsertNode {
                        path: child_path(path, n),
                        node: Node::text(""),
                    });
                    current.insert(n, Node::text(""));
                    n += 2;
                } else if is_last {
                    ops.push(Op::InsertNode {
                        path: child_path(path, n + 1),
                        node: Node::text(""),
                    });
                    current.insert(n + 1, Node::text(""));
                    n += 2;
                } else {
                    n += 1;
                }
            }
            Node::Element(_) => n += 1,
            Node::Text(text) => {
                let Some(Node::Text(prev)) = n.checked_sub(1).and_then(|p| current.get(p)) else {
                    n += 1;
                    continue;
                };
                if prev.marks == text.marks {
                    let position = prev.text.len();
                    ops.push(Op::MergeNode {
                        path: child_path(path, n),
                        position,
                    });
                    let merged = current.remove(n);
                    if let Some(Node::Text(prev)) = current.get_mut(n - 1) {
                        prev.text.push_str(&merged.text_content());
                    }
                } else if prev.text.is_empty() {
                    ops.push(Op::RemoveNode {
                        path: child_path(path, n - 1),
                    });
                    current.remove(n - 1);
                } else if text.text.is_empty() {
                    ops.push(Op::RemoveNode {
                        path: child_path(path, n),
                    });
                    current.remove(n);
                } else {
                    n += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::node::Document;

    fn run_pass(doc: &Document) -> Vec<Op> {
        let registry = PluginRegistry::core();
        let config = EditorConfig::default();
        let cx = NormalizeContext {
            doc,
            registry: &registry,
            config: &config,
        };
        NormalizeChildren.run(&cx)
    }

    #[test]
    fn adjacent_texts_with_equal_marks_merge() {
        let doc = Document::new(vec![Node::element(
            PARAGRAPH,
            vec![Node::text("ab"), Node::text("cd")],
        )]);
        assert_eq!(
            run_pass(&doc),
            vec![Op::MergeNode {
                path: vec![0, 1],
                position: 2
            }]
        );
    }

    #[test]
    fn empty_elements_get_a_text_leaf() {
        let doc = Document::new(vec![Node::element(PARAGRAPH, Vec::new())]);
        assert_eq!(
            run_pass(&doc),
            vec![Op::InsertNode {
                path: vec![0, 0],
                node: Node::text("")
            }]
        );
    }

    #[test]
    fn text_at_the_root_is_removed() {
        let doc = Document::new(vec![Node::paragraph("a"), Node::text("stray")]);
        assert_eq!(run_pass(&doc), vec![Op::RemoveNode { path: vec![1] }]);
    }
}
