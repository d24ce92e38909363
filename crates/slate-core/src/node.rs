use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PathError;
use crate::path::{Path, PathExt};

pub type Attrs = BTreeMap<String, Value>;
pub type Marks = BTreeMap<String, Value>;

pub const PARAGRAPH: &str = "paragraph";

/// A document node. Serialized untagged: elements carry `type` and `children`,
/// text leaves carry `text`; every other key is an attribute or a mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(rename = "type")]
    pub kind: String,
    pub children: Vec<Node>,
    #[serde(flatten)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode::new(text))
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(ElementNode::new(kind, children))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(PARAGRAPH, vec![Node::text(text)])
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&str> {
        self.as_element().map(|el| el.kind.as_str())
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) => &[],
        }
    }

    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self;
        for &ix in path {
            node = node.children().get(ix)?;
        }
        Some(node)
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(text) => text.text.clone(),
            Node::Element(el) => el.children.iter().map(Node::text_content).collect(),
        }
    }

    /// Every property except `children`/`text`, with the element kind under `type`.
    pub fn props(&self) -> Attrs {
        match self {
            Node::Text(text) => text.marks.clone(),
            Node::Element(el) => {
                let mut props = el.attrs.clone();
                props.insert("type".to_string(), Value::String(el.kind.clone()));
                props
            }
        }
    }

    pub(crate) fn apply_patch(&mut self, patch: &AttrPatch) -> Result<AttrPatch, String> {
        match self {
            Node::Text(text) => {
                if let Some(key) = patch
                    .set
                    .keys()
                    .chain(patch.remove.iter())
                    .find(|key| key.as_str() == "text")
                {
                    return Err(key.clone());
                }
                Ok(patch_apply(&mut text.marks, patch))
            }
            Node::Element(el) => {
                let mut attrs_patch = patch.clone();
                if let Some(key) = attrs_patch
                    .set
                    .keys()
                    .chain(attrs_patch.remove.iter())
                    .find(|key| key.as_str() == "children")
                {
                    return Err(key.clone());
                }
                if attrs_patch.remove.iter().any(|key| key == "type") {
                    return Err("type".to_string());
                }
                let new_kind = match attrs_patch.set.remove("type") {
                    Some(Value::String(kind)) => Some(kind),
                    Some(_) => return Err("type".to_string()),
                    None => None,
                };

                let mut inverse = patch_apply(&mut el.attrs, &attrs_patch);
                if let Some(kind) = new_kind {
                    let old = std::mem::replace(&mut el.kind, kind);
                    inverse.set.insert("type".to_string(), Value::String(old));
                }
                Ok(inverse)
            }
        }
    }

    pub(crate) fn empty_like(&self, props: Option<&Attrs>) -> Node {
        match self {
            Node::Text(text) => Node::Text(TextNode {
                text: String::new(),
                marks: props.cloned().unwrap_or_else(|| text.marks.clone()),
            }),
            Node::Element(el) => {
                let Some(props) = props else {
                    return Node::Element(ElementNode {
                        kind: el.kind.clone(),
                        children: Vec::new(),
                        attrs: el.attrs.clone(),
                    });
                };
                let mut attrs = props.clone();
                let kind = match attrs.remove("type") {
                    Some(Value::String(kind)) => kind,
                    _ => el.kind.clone(),
                };
                Node::Element(ElementNode {
                    kind,
                    children: Vec::new(),
                    attrs,
                })
            }
        }
    }
}

impl ElementNode {
    pub fn new(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            kind: kind.into(),
            children,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn has_empty_content(&self) -> bool {
        match self.children.as_slice() {
            [] => true,
            [Node::Text(text)] => text.text.is_empty(),
            _ => false,
        }
    }
}

impl From<ElementNode> for Node {
    fn from(el: ElementNode) -> Self {
        Node::Element(el)
    }
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::new(),
        }
    }

    pub fn with_mark(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.marks.insert(key.into(), value.into());
        self
    }

    pub fn has_mark(&self, key: &str) -> bool {
        self.marks.get(key) == Some(&Value::Bool(true))
    }
}

impl From<TextNode> for Node {
    fn from(text: TextNode) -> Self {
        Node::Text(text)
    }
}

/// The root of the tree. Serializes as the bare array of its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The node at `path`; `None` for the root and for dangling paths.
    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        self.children.get(*first)?.get(rest)
    }

    pub fn text(&self, path: &[usize]) -> Option<&TextNode> {
        self.node(path).and_then(Node::as_text)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        self.node(path).and_then(Node::as_element)
    }

    pub fn children_at(&self, parent: &[usize]) -> Option<&[Node]> {
        if parent.is_empty() {
            return Some(&self.children);
        }
        match self.node(parent)? {
            Node::Element(el) => Some(&el.children),
            Node::Text(_) => None,
        }
    }

    pub(crate) fn children_mut(&mut self, parent: &[usize]) -> Result<&mut Vec<Node>, PathError> {
        let mut children = &mut self.children;
        for (depth, &ix) in parent.iter().enumerate() {
            children = match children.get_mut(ix) {
                Some(Node::Element(el)) => &mut el.children,
                Some(Node::Text(_)) => return Err(PathError::NotElement(parent[..=depth].to_vec())),
                None => return Err(PathError::Missing(parent[..=depth].to_vec())),
            };
        }
        Ok(children)
    }

    pub(crate) fn node_mut(&mut self, path: &[usize]) -> Result<&mut Node, PathError> {
        let (ix, parent) = path.split_last().ok_or(PathError::Root)?;
        self.children_mut(parent)?
            .get_mut(*ix)
            .ok_or_else(|| PathError::Missing(path.to_vec()))
    }

    pub(crate) fn text_mut(&mut self, path: &[usize]) -> Result<&mut TextNode, PathError> {
        match self.node_mut(path)? {
            Node::Text(text) => Ok(text),
            Node::Element(_) => Err(PathError::NotText(path.to_vec())),
        }
    }

    pub(crate) fn insert(&mut self, path: &[usize], node: Node) -> Result<(), PathError> {
        let (ix, parent) = path.split_last().ok_or(PathError::Root)?;
        let children = self.children_mut(parent)?;
        if *ix > children.len() {
            return Err(PathError::Missing(path.to_vec()));
        }
        children.insert(*ix, node);
        Ok(())
    }

    pub(crate) fn remove(&mut self, path: &[usize]) -> Result<Node, PathError> {
        let (ix, parent) = path.split_last().ok_or(PathError::Root)?;
        let children = self.children_mut(parent)?;
        if *ix >= children.len() {
            return Err(PathError::Missing(path.to_vec()));
        }
        Ok(children.remove(*ix))
    }

    pub fn first_text(&self, path: &[usize]) -> Option<Path> {
        self.edge_text(path, false)
    }

    pub fn last_text(&self, path: &[usize]) -> Option<Path> {
        self.edge_text(path, true)
    }

    fn edge_text(&self, path: &[usize], last: bool) -> Option<Path> {
        let mut path = path.to_vec();
        loop {
            let children = match self.node(&path) {
                Some(Node::Text(_)) => return Some(path),
                Some(Node::Element(el)) => &el.children,
                None if path.is_empty() => &self.children,
                None => return None,
            };
            let ix = if last {
                children.len().checked_sub(1)?
            } else if children.is_empty() {
                return None;
            } else {
                0
            };
            path.push(ix);
        }
    }

    /// Concatenated text under `path`; the whole document for `[]`.
    pub fn string(&self, path: &[usize]) -> String {
        if path.is_empty() {
            return self.children.iter().map(Node::text_content).collect();
        }
        self.node(path).map(Node::text_content).unwrap_or_default()
    }

    pub fn texts(&self) -> impl Iterator<Item = (&TextNode, Path)> + '_ {
        self.descendants(Traversal::default())
            .filter_map(|(node, path)| node.as_text().map(|text| (text, path)))
    }

    pub fn descendants<'a>(&'a self, traversal: Traversal<'a>) -> Descendants<'a> {
        Descendants::new(self, traversal)
    }
}

#[derive(Default)]
pub struct Traversal<'a> {
    pub from: Path,
    pub to: Option<Path>,
    pub reverse: bool,
    pub pass: Option<Box<dyn Fn(&Node) -> bool + 'a>>,
}

pub struct Descendants<'a> {
    doc: &'a Document,
    next: Option<Path>,
    traversal: Traversal<'a>,
}

impl<'a> Descendants<'a> {
    fn new(doc: &'a Document, traversal: Traversal<'a>) -> Self {
        let len = doc.children.len();
        let next = match (traversal.from.first(), len) {
            (_, 0) => None,
            (Some(&ix), _) => Some(vec![ix.min(len - 1)]),
            (None, _) if traversal.reverse => Some(vec![len - 1]),
            (None, _) => Some(vec![0]),
        };
        Self {
            doc,
            next,
            traversal,
        }
    }

    fn advance(&self, path: &Path, node: &Node) -> Option<Path> {
        if let Node::Element(el) = node {
            let skip = self.traversal.pass.as_ref().is_some_and(|pass| pass(node));
            if !el.children.is_empty() && !skip {
                let last = el.children.len() - 1;
                let ix = if path.is_ancestor_of(&self.traversal.from) {
                    self.traversal.from[path.len()].min(last)
                } else if self.traversal.reverse {
                    last
                } else {
                    0
                };
                return Some(path.child(ix));
            }
        }

        let mut current = path.clone();
        while let Some((&ix, parent)) = current.split_last() {
            if self.traversal.reverse {
                if ix > 0 {
                    return Some(parent.child(ix - 1));
                }
            } else if ix + 1 < self.doc.children_at(parent)?.len() {
                return Some(parent.child(ix + 1));
            }
            current.pop();
        }
        None
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (&'a Node, Path);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.next.take()?;
        if let Some(to) = &self.traversal.to {
            let past = if self.traversal.reverse {
                path.is_before(to)
            } else {
                path.is_after(to)
            };
            if past {
                return None;
            }
        }
        let doc = self.doc;
        let node = doc.node(&path)?;
        self.next = self.advance(&path, node);
        Some((node, path))
    }
}

/// Property changes for a single node. Keys in `set` overwrite, keys in
/// `remove` are dropped. The element kind is addressed as `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn set(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut patch = Self::default();
        patch.set.insert(key.into(), value.into());
        patch
    }

    pub fn remove<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            set: Attrs::new(),
            remove: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and_set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(key.into(), value.into());
        self
    }

    pub fn and_remove(mut self, key: impl Into<String>) -> Self {
        self.remove.push(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    pub(crate) fn diff(&self, props: &Attrs) -> AttrPatch {
        AttrPatch {
            set: self
                .set
                .iter()
                .filter(|(key, value)| props.get(key.as_str()) != Some(*value))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            remove: self
                .remove
                .iter()
                .filter(|key| props.contains_key(key.as_str()))
                .cloned()
                .collect(),
        }
    }
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut inverse = AttrPatch::default();

    for (key, value) in &patch.set {
        match attrs.insert(key.clone(), value.clone()) {
            Some(prev) => {
                inverse.set.insert(key.clone(), prev);
            }
            None => inverse.remove.push(key.clone()),
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            inverse.set.insert(key.clone(), prev);
        }
    }

    inverse
}
