use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::EditorConfig;
use crate::data::DataTransfer;
use crate::error::{ApplyError, CommandError, EditorError, QueryError};
use crate::history::{ChangeRecord, HistorySink};
use crate::node::{Document, Marks, Node};
use crate::ops::{Op, Transaction, apply_op_to, transform_path, transform_point};
use crate::path::Path;
use crate::plugin::PluginRegistry;
use crate::query::Unit;
use crate::range::{Affinity, Location, Point, Range};
use crate::tasks::{BlobLoader, ReadQueue, TaskSpawner};

/// Handle to a point kept up to date while a transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PointRef(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PathRef(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RangeRef {
    anchor: PointRef,
    focus: PointRef,
}

#[derive(Default)]
struct Refs {
    points: Vec<Option<(Option<Point>, Option<Affinity>)>>,
    paths: Vec<Option<Option<Path>>>,
}

impl Refs {
    fn transform(&mut self, op: &Op) {
        for (current, affinity) in self.points.iter_mut().flatten() {
            if let Some(point) = current.take() {
                *current = transform_point(&point, op, *affinity);
            }
        }
        for current in self.paths.iter_mut().flatten() {
            if let Some(path) = current.take() {
                *current = transform_path(&path, op, Some(Affinity::Forward));
            }
        }
    }

    fn compact(&mut self) {
        if self.points.iter().all(Option::is_none) {
            self.points.clear();
        }
        if self.paths.iter().all(Option::is_none) {
            self.paths.clear();
        }
    }
}

#[derive(Default)]
struct Batch {
    ops: Vec<Op>,
    inverse_ops: Vec<Op>,
    selection_before: Option<Range>,
    source: Option<String>,
}

struct Snapshot {
    doc: Document,
    selection: Option<Range>,
    marks: Option<Marks>,
}

/// An editing session over one document.
///
/// All mutation goes through ops. Public transforms are atomic: if any step
/// fails the document, selection and pending marks are restored, and the
/// document is normalized once when the outermost transform finishes.
pub struct Editor {
    doc: Document,
    selection: Option<Range>,
    marks: Option<Marks>,
    registry: Arc<PluginRegistry>,
    config: EditorConfig,
    refs: Refs,
    depth: usize,
    batch: Batch,
    history: Option<Box<dyn HistorySink>>,
    reads: ReadQueue,
}

impl Editor {
    pub fn new(doc: Document, selection: Option<Range>, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Option<Range>,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            marks: None,
            registry: Arc::new(registry),
            config: config.with_defaults(),
            refs: Refs::default(),
            depth: 0,
            batch: Batch::default(),
            history: None,
            reads: ReadQueue::default(),
        };
        if let Err(err) = editor.normalize() {
            tracing::warn!(error = %err, "initial normalization failed");
        }
        if let Some(selection) = &editor.selection {
            let checked = editor
                .check_point(&selection.anchor)
                .and_then(|()| editor.check_point(&selection.focus));
            if let Err(err) = checked {
                tracing::warn!(error = %err, "initial selection does not fit the document");
                editor.selection = None;
            }
        }
        editor.batch = Batch::default();
        editor
    }

    pub fn with_core_plugins() -> Self {
        Self::new(
            Document::new(vec![Node::paragraph("")]),
            Some(Range::collapsed(Point::new(vec![0, 0], 0))),
            PluginRegistry::core(),
        )
    }

    pub fn with_richtext_plugins() -> Self {
        Self::new(
            Document::new(vec![Node::paragraph("")]),
            Some(Range::collapsed(Point::new(vec![0, 0], 0))),
            PluginRegistry::richtext(),
        )
    }

    pub fn with_history(mut self, sink: impl HistorySink + 'static) -> Self {
        self.history = Some(Box::new(sink));
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
        self.reads = ReadQueue::new(spawner);
        self
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn pending_marks(&self) -> Option<&Marks> {
        self.marks.as_ref()
    }

    pub(crate) fn set_pending_marks(&mut self, marks: Option<Marks>) {
        self.marks = marks;
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Apply a batch of ops as one atomic, normalized change.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), EditorError> {
        let Transaction {
            ops,
            selection_after,
            meta,
        } = tx;
        self.transact("apply", |editor| {
            if meta.source.is_some() {
                editor.batch.source = meta.source;
            }
            for op in ops {
                editor.apply_op(op)?;
            }
            if let Some(selection) = selection_after {
                editor.apply_op(Op::SetSelection {
                    selection: Some(selection),
                })?;
            }
            Ok(())
        })
    }

    pub fn without_normalizing<T>(
        &mut self,
        f: impl FnOnce(&mut Editor) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        self.transact("batch", f)
    }

    pub(crate) fn apply_op(&mut self, op: Op) -> Result<(), ApplyError> {
        tracing::trace!(?op, "apply op");
        let inverse = apply_op_to(&mut self.doc, &mut self.selection, &op)?;
        if op.is_selection() {
            self.marks = None;
        } else {
            self.refs.transform(&op);
        }
        self.batch.ops.push(op);
        self.batch.inverse_ops.push(inverse);
        Ok(())
    }

    pub(crate) fn transact<T>(
        &mut self,
        label: &'static str,
        f: impl FnOnce(&mut Editor) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        if self.depth > 0 {
            return f(self);
        }

        tracing::debug!(transform = label, "transform");
        let snapshot = Snapshot {
            doc: self.doc.clone(),
            selection: self.selection.clone(),
            marks: self.marks.clone(),
        };
        self.batch = Batch {
            selection_before: self.selection.clone(),
            ..Batch::default()
        };

        self.depth += 1;
        let result = match f(self) {
            Ok(value) => self
                .normalize()
                .and_then(|()| self.recover_selection())
                .map(|()| value),
            Err(err) => Err(err),
        };
        self.depth -= 1;
        self.refs.compact();

        let batch = std::mem::take(&mut self.batch);
        match result {
            Ok(value) => {
                self.commit(batch);
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(transform = label, error = %err, "transform rolled back");
                self.doc = snapshot.doc;
                self.selection = snapshot.selection;
                self.marks = snapshot.marks;
                self.refs = Refs::default();
                Err(err)
            }
        }
    }

    // Removing the last text under the caret drops the selection.
    fn recover_selection(&mut self) -> Result<(), EditorError> {
        if self.selection.is_some() || self.batch.selection_before.is_none() {
            return Ok(());
        }
        let deselected = self
            .batch
            .ops
            .iter()
            .any(|op| matches!(op, Op::SetSelection { selection: None }));
        if deselected {
            return Ok(());
        }
        let Ok(start) = self.start(&Location::Path(Vec::new())) else {
            return Ok(());
        };
        tracing::debug!(point = ?start, "selection lost, moving to document start");
        self.apply_op(Op::SetSelection {
            selection: Some(Range::collapsed(start)),
        })?;
        Ok(())
    }

    fn commit(&mut self, batch: Batch) {
        if batch.ops.is_empty() {
            return;
        }
        let Some(history) = self.history.as_mut() else {
            return;
        };
        let mut inverse_ops = batch.inverse_ops;
        inverse_ops.reverse();
        history.record(ChangeRecord {
            ops: batch.ops,
            inverse_ops,
            selection_before: batch.selection_before,
            selection_after: self.selection.clone(),
            source: batch.source,
        });
    }

    pub(crate) fn normalize(&mut self) -> Result<(), EditorError> {
        let registry = Arc::clone(&self.registry);
        let max = self.config.max_normalize_iterations;
        for iteration in 0..max {
            let ops = registry.normalize(&self.doc, &self.config);
            if ops.is_empty() {
                if iteration > 0 {
                    tracing::debug!(iterations = iteration, "normalized");
                }
                return Ok(());
            }
            for op in ops {
                self.apply_op(op)?;
            }
        }
        Err(ApplyError::NormalizeDidNotConverge(max).into())
    }

    pub(crate) fn point_ref(&mut self, point: Point, affinity: Option<Affinity>) -> PointRef {
        self.refs.points.push(Some((Some(point), affinity)));
        PointRef(self.refs.points.len() - 1)
    }

    pub(crate) fn point_ref_current(&self, r: PointRef) -> Option<Point> {
        self.refs
            .points
            .get(r.0)
            .and_then(|entry| entry.as_ref())
            .and_then(|(point, _)| point.clone())
    }

    pub(crate) fn unref_point(&mut self, r: PointRef) -> Option<Point> {
        self.refs
            .points
            .get_mut(r.0)
            .and_then(Option::take)
            .and_then(|(point, _)| point)
    }

    pub(crate) fn path_ref(&mut self, path: Path) -> PathRef {
        self.refs.paths.push(Some(Some(path)));
        PathRef(self.refs.paths.len() - 1)
    }

    pub(crate) fn path_ref_current(&self, r: PathRef) -> Option<Path> {
        self.refs.paths.get(r.0).cloned().flatten().flatten()
    }

    pub(crate) fn unref_path(&mut self, r: PathRef) -> Option<Path> {
        self.refs.paths.get_mut(r.0).and_then(Option::take).flatten()
    }

    pub(crate) fn range_ref(&mut self, range: Range) -> RangeRef {
        let (anchor_affinity, focus_affinity) = match (range.is_collapsed(), range.is_backward()) {
            (true, false) => (Affinity::Forward, Affinity::Forward),
            (true, true) => (Affinity::Backward, Affinity::Backward),
            (false, false) => (Affinity::Forward, Affinity::Backward),
            (false, true) => (Affinity::Backward, Affinity::Forward),
        };
        RangeRef {
            anchor: self.point_ref(range.anchor, Some(anchor_affinity)),
            focus: self.point_ref(range.focus, Some(focus_affinity)),
        }
    }

    pub(crate) fn range_ref_current(&self, r: RangeRef) -> Option<Range> {
        Some(Range::new(
            self.point_ref_current(r.anchor)?,
            self.point_ref_current(r.focus)?,
        ))
    }

    pub(crate) fn unref_range(&mut self, r: RangeRef) -> Option<Range> {
        let anchor = self.unref_point(r.anchor);
        let focus = self.unref_point(r.focus);
        Some(Range::new(anchor?, focus?))
    }

    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        let registry = Arc::clone(&self.registry);
        self.transact("insert_text", |editor| {
            registry.chain().insert_text(editor, text)
        })
    }

    pub fn insert_data(&mut self, data: DataTransfer) -> Result<(), EditorError> {
        let registry = Arc::clone(&self.registry);
        self.transact("insert_data", |editor| {
            registry.chain().insert_data(editor, data)
        })
    }

    pub fn delete_backward(&mut self, unit: Unit) -> Result<(), EditorError> {
        let registry = Arc::clone(&self.registry);
        self.transact("delete_backward", |editor| {
            registry.chain().delete_backward(editor, unit)
        })
    }

    pub fn delete_forward(&mut self, unit: Unit) -> Result<(), EditorError> {
        let registry = Arc::clone(&self.registry);
        self.transact("delete_forward", |editor| {
            registry.chain().delete_forward(editor, unit)
        })
    }

    pub fn insert_break(&mut self) -> Result<(), EditorError> {
        let registry = Arc::clone(&self.registry);
        self.transact("insert_break", |editor| registry.chain().insert_break(editor))
    }

    /// Start a background read; `on_load` runs against the live editor when
    /// [`Editor::apply_completed_reads`] picks up the result.
    pub fn spawn_read(
        &mut self,
        label: impl Into<String>,
        load: BlobLoader,
        on_load: impl FnOnce(&mut Editor, Vec<u8>) -> Result<(), EditorError> + Send + 'static,
    ) {
        self.reads.spawn(label.into(), load, Box::new(on_load));
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.pending()
    }

    /// Apply every read that has finished, in completion order. Each one is
    /// its own transform. Returns how many were applied.
    pub fn apply_completed_reads(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completed) = self.reads.try_next() {
            if self.apply_completed(completed) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until `count` reads have completed or `timeout` passes, applying
    /// each as it arrives.
    pub fn wait_for_reads(&mut self, count: usize, timeout: Duration) -> usize {
        let mut applied = 0;
        let deadline = std::time::Instant::now() + timeout;
        while applied < count && self.reads.pending() > 0 {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let Some(completed) = self.reads.next_timeout(remaining) else {
                break;
            };
            if self.apply_completed(completed) {
                applied += 1;
            }
        }
        applied
    }

    fn apply_completed(&mut self, completed: crate::tasks::Completed) -> bool {
        let crate::tasks::Completed { label, outcome } = completed;
        match outcome {
            Ok((bytes, on_load)) => {
                match self.transact("read_complete", |editor| on_load(editor, bytes)) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(read = %label, error = %err, "applying read failed");
                        false
                    }
                }
            }
            Err(err) => {
                tracing::warn!(read = %label, error = %err, "background read failed");
                false
            }
        }
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }
}
