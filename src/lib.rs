mod engine;
mod error;
mod factory;
mod interface;
mod logic;
mod node;
mod output;
mod stack;
mod template;

// Public exports.
pub use engine::Marker;
pub use error::{MarkerError, MarkerResult};
pub use factory::{Attrs, ElementArgs};
pub use interface::{BuilderFn, Key, MarkerInterface, Value, ValueTy};
pub use logic::{Logic, LogicFlags, LogicPatch, LogicState, reduce};
pub use node::{Document, Element, Node, NodeId};
pub use output::{Rendered, TemplateCache, Tree};
pub use stack::Stack;
pub use template::{TAGS, Template};
