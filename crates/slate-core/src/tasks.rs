use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::editor::Editor;
use crate::error::EditorError;

/// Produces the bytes of a payload, typically by reading a file.
pub type BlobLoader = Box<dyn FnOnce() -> io::Result<Vec<u8>> + Send + 'static>;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub(crate) type OnLoad = Box<dyn FnOnce(&mut Editor, Vec<u8>) -> Result<(), EditorError> + Send>;

/// Runs background work. Reads never touch the editor from the worker; they
/// report back over a channel drained on the editor's thread.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, task: Task);
}

/// One OS thread per task.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl TaskSpawner for ThreadSpawner {
    fn spawn(&self, task: Task) {
        if let Err(err) = std::thread::Builder::new()
            .name("slate-read".to_string())
            .spawn(task)
        {
            tracing::warn!(error = %err, "failed to spawn background read");
        }
    }
}

pub(crate) struct Completed {
    pub label: String,
    pub outcome: io::Result<(Vec<u8>, OnLoad)>,
}

// A task that is dropped unrun still reports, so `pending` drains.
struct Report {
    label: String,
    tx: Sender<Completed>,
    sent: bool,
}

impl Report {
    fn send(mut self, outcome: io::Result<(Vec<u8>, OnLoad)>) {
        self.sent = true;
        self.deliver(outcome);
    }

    fn deliver(&mut self, outcome: io::Result<(Vec<u8>, OnLoad)>) {
        let label = std::mem::take(&mut self.label);
        if self.tx.send(Completed { label, outcome }).is_err() {
            tracing::debug!("editor dropped before a background read finished");
        }
    }
}

impl Drop for Report {
    fn drop(&mut self) {
        if !self.sent {
            self.deliver(Err(io::Error::other("background read was dropped")));
        }
    }
}

pub(crate) struct ReadQueue {
    spawner: Arc<dyn TaskSpawner>,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
    pending: usize,
}

impl Default for ReadQueue {
    fn default() -> Self {
        Self::new(Arc::new(ThreadSpawner))
    }
}

impl ReadQueue {
    pub fn new(spawner: Arc<dyn TaskSpawner>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            spawner,
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn spawn(&mut self, label: String, load: BlobLoader, on_load: OnLoad) {
        tracing::debug!(read = %label, "spawning background read");
        self.pending += 1;
        let report = Report {
            label,
            tx: self.tx.clone(),
            sent: false,
        };
        self.spawner.spawn(Box::new(move || {
            let outcome = load().map(|bytes| (bytes, on_load));
            report.send(outcome);
        }));
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn try_next(&mut self) -> Option<Completed> {
        let completed = self.rx.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(completed)
    }

    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Completed> {
        let completed = self.rx.recv_timeout(timeout).ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(completed)
    }
}
