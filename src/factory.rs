//! Construction of single element nodes from the arguments of a tag call.

use crate::interface::Value;
use crate::node::{Document, Element, Node, NodeId};
use crate::output::TemplateCache;

/// Attribute set for a new element.
///
/// `style`, `cache` and `class`/`className` are recognised keys; every other
/// key becomes a plain attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attrs {
    class: Option<String>,
    cache: Option<String>,
    attributes: Vec<(String, String)>,
    style: Vec<(String, String)>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `name`, routing the recognised keys.
    #[must_use]
    pub fn set<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        let name = name.into();
        let value = value.into();
        match name.as_str() {
            "class" | "className" => self.class = Some(value),
            "cache" => self.cache = Some(value),
            _ => self.attributes.push((name, value)),
        }
        self
    }

    #[must_use]
    pub fn id<V: Into<String>>(self, id: V) -> Self {
        self.set("id", id)
    }

    #[must_use]
    pub fn class<V: Into<String>>(self, class: V) -> Self {
        self.set("class", class)
    }

    /// Registers the element in the template cache under `key`.
    #[must_use]
    pub fn cache<V: Into<String>>(self, key: V) -> Self {
        self.set("cache", key)
    }

    #[must_use]
    pub fn style<P: Into<String>, V: Into<String>>(mut self, property: P, value: V) -> Self {
        self.style.push((property.into(), value.into()));
        self
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.cache.as_deref()
    }
}

/// Reads an attribute set out of a map value.
///
/// `false` values are skipped, `style` must itself be a map, and any other
/// value is assigned through its display form.
impl From<&Value> for Attrs {
    fn from(value: &Value) -> Self {
        let mut attrs = Self::new();
        let Value::Map(map) = value else {
            return attrs;
        };

        for (name, value) in map {
            match (name.as_str(), value) {
                (_, Value::Bool(false)) => {}
                ("style", Value::Map(styles)) => {
                    for (property, value) in styles {
                        attrs = attrs.style(property.as_str(), value.to_string());
                    }
                }
                (_, value) => attrs = attrs.set(name.as_str(), value.to_string()),
            }
        }
        attrs
    }
}

/// The arguments of a tag call: an optional attribute set and optional content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementArgs {
    pub attrs: Option<Attrs>,
    pub content: Option<String>,
}

impl ElementArgs {
    pub fn new(attrs: Option<Attrs>, content: Option<String>) -> Self {
        Self { attrs, content }
    }
}

impl From<()> for ElementArgs {
    fn from((): ()) -> Self {
        Self::default()
    }
}

impl From<&str> for ElementArgs {
    fn from(content: &str) -> Self {
        Self::new(None, Some(content.to_owned()))
    }
}

impl From<String> for ElementArgs {
    fn from(content: String) -> Self {
        Self::new(None, Some(content))
    }
}

impl From<&Value> for ElementArgs {
    fn from(value: &Value) -> Self {
        match value {
            Value::Map(_) => Self::new(Some(Attrs::from(value)), None),
            Value::Null => Self::default(),
            Value::Bool(_) | Value::Int(_) | Value::Text(_) | Value::List(_) => {
                Self::new(None, Some(value.to_string()))
            }
        }
    }
}

impl From<Attrs> for ElementArgs {
    fn from(attrs: Attrs) -> Self {
        Self::new(Some(attrs), None)
    }
}

impl From<(Attrs, &str)> for ElementArgs {
    fn from((attrs, content): (Attrs, &str)) -> Self {
        Self::new(Some(attrs), Some(content.to_owned()))
    }
}

impl From<(Attrs, String)> for ElementArgs {
    fn from((attrs, content): (Attrs, String)) -> Self {
        Self::new(Some(attrs), Some(content))
    }
}

/// Builds one detached element for `tag` inside `document`.
///
/// Content becomes a text child of the element. A `cache` attribute records the
/// new node in `cache`, replacing any node previously stored under that key.
pub(crate) fn create_element(
    document: &mut Document,
    cache: &mut TemplateCache,
    tag: &str,
    args: ElementArgs,
) -> NodeId {
    let mut element = Element::new(tag);
    let mut cache_key = None;

    if let Some(attrs) = args.attrs {
        if let Some(class) = attrs.class {
            element.set_class(class);
        }
        for (name, value) in attrs.attributes {
            element.set_attribute(name, value);
        }
        for (property, value) in attrs.style {
            element.set_style(property, value);
        }
        cache_key = attrs.cache;
    }

    let id = document.insert(Node::Element(element));

    if let Some(content) = args.content {
        let text = document.insert(Node::Text(content));
        document.append_child(id, text);
    }

    if let Some(key) = cache_key {
        cache.insert(key, id);
    }

    id
}
