use std::fmt::{self, Write};

/// Tags serialized without a closing tag.
const VOID_TAGS: &[&str] = &["area", "base", "br", "col", "img", "input", "param"];

/// Handle to a node stored in a [`Document`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    tag: String,
    class: Option<String>,
    attributes: Vec<(String, String)>,
    style: Vec<(String, String)>,
    children: Vec<NodeId>,
}

impl Element {
    pub fn new<T: Into<String>>(tag: T) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn set_class(&mut self, class: String) {
        self.class = Some(class);
    }

    /// Later assignments to the same attribute replace earlier ones.
    pub(crate) fn set_attribute(&mut self, name: String, value: String) {
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub(crate) fn set_style(&mut self, property: String, value: String) {
        match self.style.iter_mut().find(|(key, _)| *key == property) {
            Some((_, existing)) => *existing = value,
            None => self.style.push((property, value)),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Markup inserted as-is.
    Raw(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) | Self::Raw(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(_) | Self::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(markup) => Some(markup),
            Self::Element(_) | Self::Text(_) => None,
        }
    }

    /// The tag name, for elements.
    pub fn tag(&self) -> Option<&str> {
        self.as_element().map(Element::tag)
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Element(element) => element.children(),
            Self::Text(_) | Self::Raw(_) => &[],
        }
    }
}

/// A point in a [`Document`]'s growth that [`Document::rollback`] returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    parent: Option<NodeId>,
    attached: usize,
    nodes: usize,
}

impl Checkpoint {
    /// Ids at or past this index were created after the checkpoint.
    pub(crate) const fn first_new(&self) -> usize {
        self.nodes
    }
}

/// The fragment a render pass accumulates its nodes into.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. A node is
/// either the child of exactly one element or, once its subtree has been
/// closed at the top level, one of the fragment's `roots`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a detached node.
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Appends `child` as the last child of `parent`. Text and raw parents
    /// ignore it.
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(Node::Element(element)) = self.nodes.get_mut(parent.0) {
            element.children.push(child);
        }
    }

    pub(crate) fn append_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    /// Records how far the document has grown below `parent` (or at the top
    /// level when `parent` is `None`).
    pub(crate) fn checkpoint(&self, parent: Option<NodeId>) -> Checkpoint {
        let attached = match parent {
            Some(id) => self.children(id).len(),
            None => self.roots.len(),
        };
        Checkpoint {
            parent,
            attached,
            nodes: self.nodes.len(),
        }
    }

    /// Drops every node created since `checkpoint`.
    ///
    /// Only nodes attached below the checkpoint's parent can reference the
    /// dropped ones, so detaching those keeps every remaining id valid.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        match checkpoint.parent {
            Some(id) => {
                if let Some(Node::Element(element)) = self.nodes.get_mut(id.0) {
                    element.children.truncate(checkpoint.attached);
                }
            }
            None => self.roots.truncate(checkpoint.attached),
        }
        self.nodes.truncate(checkpoint.nodes);
    }

    #[cfg(test)]
    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0) {
            Some(Node::Element(element)) => Some(element),
            Some(Node::Text(_) | Node::Raw(_)) | None => None,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Top-level nodes in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Node::children)
    }

    /// Iterates the nodes under `id` in document order.
    pub fn child_nodes(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.children(id).iter().filter_map(|child| self.get(*child))
    }

    /// Total number of nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Concatenated text of `id` and its descendants. Raw markup is skipped.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        match self.get(id) {
            Some(Node::Text(text)) => output.push_str(text),
            Some(Node::Element(element)) => {
                for child in element.children() {
                    self.collect_text(*child, output);
                }
            }
            Some(Node::Raw(_)) | None => {}
        }
    }

    /// Serializes the subtree rooted at `id` as markup.
    pub fn write_markup<W: Write>(&self, id: NodeId, output: &mut W) -> fmt::Result {
        match self.get(id) {
            Some(Node::Text(text) | Node::Raw(text)) => output.write_str(text),
            Some(Node::Element(element)) => self.write_element(element, output),
            None => Ok(()),
        }
    }

    fn write_element<W: Write>(&self, element: &Element, output: &mut W) -> fmt::Result {
        write!(output, "<{}", element.tag)?;
        if let Some(class) = &element.class {
            write!(output, " class=\"{}\"", class)?;
        }
        for (name, value) in &element.attributes {
            write!(output, " {}=\"{}\"", name, value)?;
        }
        if !element.style.is_empty() {
            output.write_str(" style=\"")?;
            for (property, value) in &element.style {
                write!(output, "{}: {};", kebab_case(property), value)?;
            }
            output.write_char('"')?;
        }
        output.write_char('>')?;

        if element.children.is_empty() && VOID_TAGS.contains(&element.tag.as_str()) {
            return Ok(());
        }

        for child in &element.children {
            self.write_markup(*child, output)?;
        }
        write!(output, "</{}>", element.tag)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            self.write_markup(*root, f)?;
        }
        Ok(())
    }
}

/// `marginTop` becomes `margin-top`; names already in kebab case pass through.
fn kebab_case(property: &str) -> String {
    let mut output = String::with_capacity(property.len());
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            output.push('-');
            output.push(c.to_ascii_lowercase());
        } else {
            output.push(c);
        }
    }
    output
}
