use std::{borrow::Cow, collections::BTreeMap, fmt};

use crate::output::Rendered;
use crate::template::Template;

/// The kind of a [`Value`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueTy {
    Null,
    Boolean,
    Int,
    Text,
    List,
    Map,
}

/// An argument handed to a builder function.
///
/// Lists are iterated by `each` in index order, maps in key order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub const fn ty(&self) -> ValueTy {
        match self {
            Self::Null => ValueTy::Null,
            Self::Bool(_) => ValueTy::Boolean,
            Self::Int(_) => ValueTy::Int,
            Self::Text(_) => ValueTy::Text,
            Self::List(_) => ValueTy::List,
            Self::Map(_) => ValueTy::Map,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::List(_) | Self::Map(_) => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Null | Self::Int(_) | Self::Text(_) | Self::List(_) | Self::Map(_) => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Null | Self::Bool(_) | Self::Text(_) | Self::List(_) | Self::Map(_) => None,
        }
    }

    /// Looks up `key` in a map value.
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(map) => map.get(key),
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Text(_) | Self::List(_) => None,
        }
    }

    /// Builds a map value from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Text rendering used when a value is placed into markup.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Self::Map(map) => {
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(value: Cow<'_, str>) -> Self {
        Self::Text(value.into_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

/// Position of the item an `each` callback is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key<'a> {
    Index(usize),
    Name(&'a str),
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{}", index),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A registered builder function. It receives the template it builds into
/// and the positional arguments of the `render` or `partial` call.
pub type BuilderFn = dyn Fn(&mut Template<'_>, &[Value]) -> crate::MarkerResult<()>;

/// `MarkerInterface` is the registry and render entry point of the Marker
/// markup builder, designed for single-threaded, synchronous use.
pub trait MarkerInterface {
    /// `register` makes a builder function available under `name`, both for
    /// `render` and for `partial` calls made by other builders.
    ///
    /// # Errors
    /// - If the name is already taken. The existing builder is kept.
    fn register<N, F>(&mut self, name: N, builder: F) -> crate::MarkerResult<()>
    where
        N: AsRef<str>,
        F: Fn(&mut Template<'_>, &[Value]) -> crate::MarkerResult<()> + 'static;

    /// `render` runs the builder registered under `name` against a fresh
    /// template and returns the finished tree along with its cache map.
    ///
    /// # Errors
    /// - If the name is not registered.
    /// - If a builder function or `each` callback fails.
    fn render<N: AsRef<str>>(&self, name: N, args: &[Value]) -> crate::MarkerResult<Rendered>;

    /// `contains` reports whether a builder is registered under `name`.
    fn contains<N: AsRef<str>>(&self, name: N) -> bool;
}
