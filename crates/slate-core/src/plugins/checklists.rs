use serde_json::Value;

use crate::editor::Editor;
use crate::error::{CommandError, EditorError};
use crate::node::{AttrPatch, Node};
use crate::ops::Op;
use crate::plugin::{CommandSpec, Next, NodeSpec, NormalizeContext, NormalizePass, Plugin, QuerySpec};
use crate::query::{Match, NodesOptions, Unit};
use crate::range::Location;
use crate::transforms::NodeOptions;

pub const CHECK_LIST_ITEM: &str = "check-list-item";

/// Check-list items carry a `checked` flag. Backspace at the start of an
/// item turns it back into a plain block.
pub struct ChecklistsPlugin;

impl Plugin for ChecklistsPlugin {
    fn id(&self) -> &'static str {
        "checklists"
    }

    fn delete_backward(
        &self,
        editor: &mut Editor,
        unit: Unit,
        next: Next<'_>,
    ) -> Result<(), EditorError> {
        let Some(selection) = editor.selection().filter(|s| s.is_collapsed()).cloned() else {
            return next.delete_backward(editor, unit);
        };
        let item = editor
            .nodes(NodesOptions::default().matching(Match::kind(CHECK_LIST_ITEM)))
            .next()
            .map(|(_, path)| path);
        let Some(path) = item else {
            return next.delete_backward(editor, unit);
        };
        if !editor.is_start(&selection.anchor, &path) {
            return next.delete_backward(editor, unit);
        }

        tracing::debug!(?path, "backspace at check-list item start, resetting block");
        let patch = AttrPatch::set("type", editor.config().default_block.clone()).and_remove("checked");
        editor.set_nodes_inner(patch, NodeOptions::at(Location::Path(path)))
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(CHECK_LIST_ITEM)]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(DefaultChecked)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("checklist.toggle_checked", "Toggle checked", |editor, _args| {
                editor
                    .toggle_checked()
                    .map_err(|e| CommandError::new(format!("Failed to toggle checked: {e}")))
            })
            .description("Check or uncheck the check-list item at the selection.")
            .keywords(["todo", "task", "check", "checklist"]),
            CommandSpec::new("checklist.toggle", "Toggle check list", |editor, _args| {
                editor
                    .toggle_block(CHECK_LIST_ITEM)
                    .map_err(|e| CommandError::new(format!("Failed to toggle check list: {e}")))
            })
            .description("Turn the selected blocks into check-list items, or back.")
            .keywords(["todo", "task", "checklist"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("checklist.is_checked", |editor, _args| {
            Ok(editor
                .check_list_item()
                .map_or(Value::Null, |(_, checked)| Value::Bool(checked)))
        })]
    }
}

struct DefaultChecked;

impl NormalizePass for DefaultChecked {
    fn id(&self) -> &'static str {
        "checklists.default_checked"
    }

    fn run(&self, cx: &NormalizeContext<'_>) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind == CHECK_LIST_ITEM && !el.attr("checked").is_some_and(Value::is_boolean) {
                    ops.push(Op::SetNode {
                        path: path.clone(),
                        patch: AttrPatch::set("checked", false),
                    });
                }
                walk(&el.children, path, ops);
                path.pop();
            }
        }

        walk(&cx.doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}
