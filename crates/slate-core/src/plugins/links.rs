use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::data::DataTransfer;
use crate::editor::Editor;
use crate::error::{CommandError, EditorError};
use crate::node::ElementNode;
use crate::plugin::{CommandSpec, Next, NodeSpec, Plugin, QuerySpec};

use super::command_str_arg;

pub const LINK: &str = "link";

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\w+:)?//([^\s.]+\.\S{2}|localhost[:?\d]*)\S*$").expect("valid url regex")
});

/// Whether `text` is a single absolute or protocol-relative URL.
pub fn is_url(text: &str) -> bool {
    URL.is_match(text)
}

/// Inline `link` elements with a `url`. Typing or pasting a bare URL links it.
pub struct LinksPlugin;

impl Plugin for LinksPlugin {
    fn id(&self) -> &'static str {
        "links"
    }

    fn is_inline(&self, element: &ElementNode, next: Next<'_>) -> bool {
        element.kind == LINK || next.is_inline(element)
    }

    fn insert_text(&self, editor: &mut Editor, text: &str, next: Next<'_>) -> Result<(), EditorError> {
        if !text.is_empty() && is_url(text) {
            tracing::debug!(url = text, "auto-linking typed url");
            return editor.wrap_link(text);
        }
        next.insert_text(editor, text)
    }

    fn insert_data(
        &self,
        editor: &mut Editor,
        data: DataTransfer,
        next: Next<'_>,
    ) -> Result<(), EditorError> {
        if let Some(text) = data.text.as_deref().filter(|t| !t.is_empty() && is_url(t)) {
            tracing::debug!(url = text, "auto-linking pasted url");
            return editor.wrap_link(text);
        }
        next.insert_data(editor, data)
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::inline(LINK)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("link.insert", "Insert link", |editor, args| {
                let url = command_str_arg(&args, "url")?;
                editor
                    .insert_link(&url)
                    .map_err(|e| CommandError::new(format!("Failed to insert link: {e}")))
            })
            .description("Link the selection to a url, or insert the url as a link at the caret.")
            .keywords(["link", "url", "hyperlink"])
            .args_example(serde_json::json!({ "url": "https://example.com" })),
            CommandSpec::new("link.remove", "Remove link", |editor, _args| {
                editor
                    .unwrap_link()
                    .map_err(|e| CommandError::new(format!("Failed to remove link: {e}")))
            })
            .description("Unwrap links in the selection, keeping their text.")
            .keywords(["link", "unlink", "url"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("link.is_active", |editor, _args| {
            Ok(Value::Bool(editor.is_link_active()))
        })]
    }
}
