use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EditorConfig;
use crate::data::DataTransfer;
use crate::editor::Editor;
use crate::error::{CommandError, EditorError, QueryError, RegistryError};
use crate::node::{Document, ElementNode};
use crate::ops::Op;
use crate::plugins::{
    ChecklistsPlugin, CorePlugin, ImagesPlugin, LinksPlugin, ListsPlugin, MathPlugin,
};
use crate::query::Unit;

type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;
type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<Value>,
    pub hidden: bool,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            hidden: false,
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: Value) -> Self {
        self.args_example = Some(args_example);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

/// Declares an element kind a plugin introduces. Classification itself is
/// answered by the plugin chain; specs describe it for tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
}

impl NodeSpec {
    pub fn block(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Block,
            is_void: false,
        }
    }

    pub fn inline(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            role: NodeRole::Inline,
            is_void: false,
        }
    }

    pub fn void(mut self) -> Self {
        self.is_void = true;
        self
    }
}

pub struct NormalizeContext<'a> {
    pub doc: &'a Document,
    pub registry: &'a PluginRegistry,
    pub config: &'a EditorConfig,
}

/// A normalization rule. Returned ops must be valid when applied in order.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, cx: &NormalizeContext<'_>) -> Vec<Op>;
}

/// An editor behavior layer.
///
/// Each extension point receives [`Next`], the behavior of every plugin added
/// before this one. Delegating to it passes the call inward; returning without
/// delegating claims the case. The innermost fallback is the core behavior.
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;

    fn is_void(&self, element: &ElementNode, next: Next<'_>) -> bool {
        next.is_void(element)
    }

    fn is_inline(&self, element: &ElementNode, next: Next<'_>) -> bool {
        next.is_inline(element)
    }

    fn insert_text(&self, editor: &mut Editor, text: &str, next: Next<'_>) -> Result<(), EditorError> {
        next.insert_text(editor, text)
    }

    fn insert_data(
        &self,
        editor: &mut Editor,
        data: DataTransfer,
        next: Next<'_>,
    ) -> Result<(), EditorError> {
        next.insert_data(editor, data)
    }

    fn delete_backward(&self, editor: &mut Editor, unit: Unit, next: Next<'_>) -> Result<(), EditorError> {
        next.delete_backward(editor, unit)
    }

    fn delete_forward(&self, editor: &mut Editor, unit: Unit, next: Next<'_>) -> Result<(), EditorError> {
        next.delete_forward(editor, unit)
    }

    fn insert_break(&self, editor: &mut Editor, next: Next<'_>) -> Result<(), EditorError> {
        next.insert_break(editor)
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }

    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Clone, Copy)]
pub struct Next<'a> {
    inner: &'a [Arc<dyn Plugin>],
}

impl<'a> Next<'a> {
    fn split(self) -> Option<(&'a Arc<dyn Plugin>, Next<'a>)> {
        let (outer, rest) = self.inner.split_last()?;
        Some((outer, Next { inner: rest }))
    }

    pub fn is_void(self, element: &ElementNode) -> bool {
        match self.split() {
            Some((plugin, next)) => plugin.is_void(element, next),
            None => false,
        }
    }

    pub fn is_inline(self, element: &ElementNode) -> bool {
        match self.split() {
            Some((plugin, next)) => plugin.is_inline(element, next),
            None => false,
        }
    }

    pub fn insert_text(self, editor: &mut Editor, text: &str) -> Result<(), EditorError> {
        match self.split() {
            Some((plugin, next)) => plugin.insert_text(editor, text, next),
            None => editor.default_insert_text(text),
        }
    }

    pub fn insert_data(self, editor: &mut Editor, data: DataTransfer) -> Result<(), EditorError> {
        match self.split() {
            Some((plugin, next)) => plugin.insert_data(editor, data, next),
            None => editor.default_insert_data(data),
        }
    }

    pub fn delete_backward(self, editor: &mut Editor, unit: Unit) -> Result<(), EditorError> {
        match self.split() {
            Some((plugin, next)) => plugin.delete_backward(editor, unit, next),
            None => editor.default_delete(unit, true),
        }
    }

    pub fn delete_forward(self, editor: &mut Editor, unit: Unit) -> Result<(), EditorError> {
        match self.split() {
            Some((plugin, next)) => plugin.delete_forward(editor, unit, next),
            None => editor.default_delete(unit, false),
        }
    }

    pub fn insert_break(self, editor: &mut Editor) -> Result<(), EditorError> {
        match self.split() {
            Some((plugin, next)) => plugin.insert_break(editor, next),
            None => editor.default_insert_break(),
        }
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    node_specs: HashMap<String, NodeSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::default()
    }

    /// Registers `plugins` innermost first.
    pub fn new(plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core() -> Self {
        Self::builder()
            .with(CorePlugin)
            .build()
            .expect("core registry must be valid")
    }

    pub fn richtext() -> Self {
        Self::builder()
            .with(CorePlugin)
            .with(ListsPlugin)
            .with(ChecklistsPlugin)
            .with(LinksPlugin)
            .with(ImagesPlugin)
            .with(MathPlugin)
            .build()
            .expect("richtext registry must be valid")
    }

    /// Adds `plugin` as the new outermost layer.
    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        if self.plugins.iter().any(|p| p.id() == plugin.id()) {
            return Err(RegistryError::DuplicatePlugin(plugin.id().to_string()));
        }

        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(RegistryError::DuplicateNodeSpec(spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        self.plugins.push(plugin);
        Ok(())
    }

    pub fn chain(&self) -> Next<'_> {
        Next {
            inner: &self.plugins,
        }
    }

    pub fn plugin_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.id())
    }

    pub fn is_void(&self, element: &ElementNode) -> bool {
        self.chain().is_void(element)
    }

    pub fn is_inline(&self, element: &ElementNode) -> bool {
        self.chain().is_inline(element)
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Ops of the first pass that finds something to fix.
    pub fn normalize(&self, doc: &Document, config: &EditorConfig) -> Vec<Op> {
        let cx = NormalizeContext {
            doc,
            registry: self,
            config,
        };
        for pass in &self.normalize_passes {
            let ops = pass.run(&cx);
            if !ops.is_empty() {
                tracing::trace!(pass = pass.id(), ops = ops.len(), "normalize pass");
                return ops;
            }
        }
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistryBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistryBuilder {
    /// Wraps everything added so far; the last plugin added is asked first.
    pub fn with(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn build(self) -> Result<PluginRegistry, RegistryError> {
        PluginRegistry::new(self.plugins)
    }
}
