use std::collections::BTreeMap;

use serde_json::Value;

use crate::editor::Editor;
use crate::error::{CommandError, EditorError};
use crate::node::{AttrPatch, ElementNode};
use crate::ops::{Op, transform_path};
use crate::path::Path;
use crate::plugin::{CommandSpec, Next, NodeSpec, Plugin, QuerySpec};
use crate::query::{Match, NodesOptions};
use crate::range::{Affinity, Location};
use crate::transforms::NodeOptions;

pub const MATH_BLOCK: &str = "math-block";

/// Text mark rendered as inline math.
pub const MATH_MARK: &str = "math";

/// Void `math-block` elements holding a `formula`, plus the inline math mark.
pub struct MathPlugin;

impl Plugin for MathPlugin {
    fn id(&self) -> &'static str {
        "math"
    }

    fn is_void(&self, element: &ElementNode, next: Next<'_>) -> bool {
        element.kind == MATH_BLOCK || next.is_void(element)
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(MATH_BLOCK).void()]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("math.insert", "Insert math block", |editor, args| {
                let formula = args
                    .as_ref()
                    .and_then(|v| v.get("formula"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                editor
                    .insert_math_block(&formula)
                    .map_err(|e| CommandError::new(format!("Failed to insert math block: {e}")))
            })
            .description("Insert a math block at the selection.")
            .keywords(["math", "formula", "equation", "latex"])
            .args_example(serde_json::json!({ "formula": "e^{i\\pi} + 1 = 0" })),
            CommandSpec::new("math.toggle_inline", "Toggle inline math", |editor, _args| {
                editor
                    .toggle_mark(MATH_MARK)
                    .map_err(|e| CommandError::new(format!("Failed to toggle inline math: {e}")))
            })
            .keywords(["math", "inline", "formula"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("math.formula", |editor, _args| {
            Ok(math_block_at_selection(editor)
                .and_then(|path| formula_at(editor, &path))
                .map_or(Value::Null, Value::String))
        })]
    }
}

fn math_block_at_selection(editor: &Editor) -> Option<Path> {
    editor
        .nodes(
            NodesOptions::default()
                .matching(Match::kind(MATH_BLOCK))
                .voids(true),
        )
        .next()
        .map(|(_, path)| path)
}

fn formula_at(editor: &Editor, path: &[usize]) -> Option<String> {
    let el = editor.doc().element(path)?;
    if el.kind != MATH_BLOCK {
        return None;
    }
    Some(el.attr_str("formula").unwrap_or_default().to_string())
}

/// Pending formula input of one math block, owned by whoever edits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathEditSession {
    path: Path,
    original: String,
    draft: String,
}

impl MathEditSession {
    pub fn open(editor: &Editor, path: Path) -> Option<Self> {
        let original = formula_at(editor, &path)?;
        Some(Self {
            path,
            draft: original.clone(),
            original,
        })
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.original
    }

    pub fn commit(self, editor: &mut Editor) -> Result<(), EditorError> {
        if !self.is_dirty() {
            return Ok(());
        }
        editor.set_nodes(
            AttrPatch::set("formula", self.draft),
            NodeOptions::at(Location::Path(self.path))
                .matching(Match::kind(MATH_BLOCK))
                .voids(true),
        )
    }
}

/// Open math edit sessions of one editor, keyed by block path.
#[derive(Debug, Default, Clone)]
pub struct MathDrafts {
    sessions: BTreeMap<Path, MathEditSession>,
}

impl MathDrafts {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for the math block at `path`, opening one if needed.
    pub fn open(&mut self, editor: &Editor, path: Path) -> Option<&mut MathEditSession> {
        if !self.sessions.contains_key(&path) {
            let session = MathEditSession::open(editor, path.clone())?;
            self.sessions.insert(path.clone(), session);
        }
        self.sessions.get_mut(&path)
    }

    pub fn get(&self, path: &[usize]) -> Option<&MathEditSession> {
        self.sessions.get(path)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn discard(&mut self, path: &[usize]) -> Option<MathEditSession> {
        self.sessions.remove(path)
    }

    pub fn commit(&mut self, editor: &mut Editor, path: &[usize]) -> Result<(), EditorError> {
        match self.sessions.remove(path) {
            Some(session) => session.commit(editor),
            None => Ok(()),
        }
    }

    /// Re-key open sessions after `ops` were applied. Sessions whose block
    /// was removed are dropped.
    pub fn transform(&mut self, ops: &[Op]) {
        let sessions = std::mem::take(&mut self.sessions);
        for (_, mut session) in sessions {
            let moved = ops.iter().try_fold(session.path.clone(), |path, op| {
                transform_path(&path, op, Some(Affinity::Forward))
            });
            match moved {
                Some(path) => {
                    session.path = path.clone();
                    self.sessions.insert(path, session);
                }
                None => tracing::debug!(path = ?session.path, "math block removed, dropping draft"),
            }
        }
    }
}
