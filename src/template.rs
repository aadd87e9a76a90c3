use std::fmt;
use std::mem;
use std::ops::ControlFlow;

use crate::engine::Registry;
use crate::error::{MarkerError, MarkerResult};
use crate::factory::{ElementArgs, create_element};
use crate::interface::{BuilderFn, Key, Value, ValueTy};
use crate::logic::{EndAction, Logic};
use crate::node::{Document, Node, NodeId};
use crate::output::{Rendered, TemplateCache};
use crate::stack::Stack;

/// A builder function taking part in the current render, along with the name
/// it was registered under.
#[derive(Clone, Copy)]
struct Frame<'r> {
    name: &'r str,
    builder: &'r BuilderFn,
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A Template turns a linear sequence of builder calls into a tree of nodes.
///
/// Builder functions receive a `&mut Template` and issue chained calls on it:
/// open an element, add text, open a conditional chain, iterate a value,
/// delegate to a partial and `end` what was opened. The template keeps the
/// stack of open elements, the conditional state machine, the cache map and
/// the stack of builder functions for in-flight partials.
///
/// # Example
///
/// ```
/// use marker::{Marker, MarkerInterface, Value};
///
/// let mut marker = Marker::new();
/// marker
///     .register("list", |t, args| {
///         let items = args.first().cloned().unwrap_or_default();
///         t.ul(()).each(&items, |t, item, _| {
///             t.li(item.to_string()).end();
///             Ok(std::ops::ControlFlow::Continue(()))
///         })?;
///         t.end();
///         Ok(())
///     })
///     .unwrap();
///
/// let rendered = marker.render("list", &[Value::from(vec!["a", "b"])]).unwrap();
/// assert_eq!(rendered.to_string(), "<ul><li>a</li><li>b</li></ul>");
/// ```
pub struct Template<'r> {
    registry: &'r Registry,
    builders: Stack<Frame<'r>>,
    elements: Stack<NodeId>,
    logic: Logic,
    document: Document,
    cache: TemplateCache,
}

impl fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("builders", &self.builders)
            .field("elements", &self.elements)
            .field("logic", &self.logic)
            .field("document", &self.document)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<'r> Template<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            builders: Stack::new(),
            elements: Stack::new(),
            logic: Logic::new(),
            document: Document::new(),
            cache: TemplateCache::default(),
        }
    }

    /// Runs the builder registered under `name` from a clean slate and hands
    /// back the finished tree. All state is reset afterwards, so the template
    /// can be reused for the next render.
    pub(crate) fn render(&mut self, name: &str, args: &[Value]) -> MarkerResult<Rendered> {
        self.reset();
        let frame = self.lookup(name)?;

        log::debug!(target: "marker::template", "rendering template '{name}'");
        self.builders.push(frame);
        let result = self.drive(args);
        self.builders.pop();

        match result {
            Ok(()) => Ok(self.finish()),
            Err(error) => {
                self.reset();
                Err(error)
            }
        }
    }

    fn lookup(&self, name: &str) -> MarkerResult<Frame<'r>> {
        let registry = self.registry;
        registry
            .get_key_value(name)
            .map(|(name, builder)| Frame {
                name: name.as_str(),
                builder: &**builder,
            })
            .ok_or_else(|| MarkerError::MissingTemplate {
                template_name: name.to_string(),
            })
    }

    /// Invokes the active builder function, then closes whatever it left open.
    /// A failing builder leaves nothing behind: its nodes and cache entries
    /// are discarded before the error is returned.
    fn drive(&mut self, args: &[Value]) -> MarkerResult<()> {
        let Some(frame) = self.builders.top().copied() else {
            return Ok(());
        };

        let depth = self.elements.len();
        let level = self.logic.len();
        let checkpoint = self.document.checkpoint(self.elements.top().copied());

        let result = (frame.builder)(self, args);

        self.close_to(frame.name, depth, level);
        if result.is_err() {
            log::debug!(
                target: "marker::template",
                "discarding nodes built by failed template '{}'",
                frame.name
            );
            self.document.rollback(checkpoint);
            self.cache.discard_from(checkpoint.first_new());
        }
        result
    }

    /// Brings the element stack back to `depth` and the logic stack back to
    /// `level`. Elements counted by an open chain are closed through `end` so
    /// the chain's depth stays in step; anything else is popped directly, which
    /// never exits a chain opened below `level`.
    fn close_to(&mut self, name: &str, depth: usize, level: usize) {
        let open = self.elements.len().saturating_sub(depth);
        if open > 0 {
            log::debug!(
                target: "marker::template",
                "closing {open} element(s) left open by '{name}'"
            );
        }

        while self.elements.len() > depth {
            let counted = self.logic.len() > level
                || self.logic.top().is_some_and(|state| state.depth > 0);
            if counted {
                self.end();
            } else {
                self.pop();
            }
        }

        while self.logic.len() > level {
            self.logic.exit();
        }
    }

    fn finish(&mut self) -> Rendered {
        let rendered = Rendered::new(
            mem::take(&mut self.document),
            mem::take(&mut self.cache),
        );
        self.reset();
        rendered
    }

    fn reset(&mut self) {
        self.builders = Stack::new();
        self.elements = Stack::new();
        self.logic = Logic::new();
        self.document = Document::new();
        self.cache = TemplateCache::default();
    }

    /// Makes `node` the current open element, appending it to the previous one.
    pub(crate) fn push(&mut self, node: NodeId) {
        if let Some(parent) = self.elements.top().copied() {
            self.document.append_child(parent, node);
        }
        self.elements.push(node);
    }

    /// Closes the current open element. An element closed at the top level
    /// becomes a root of the fragment.
    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        let node = self.elements.pop()?;
        if self.elements.is_empty() {
            self.document.append_root(node);
        }
        Some(node)
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    /// Whether calls are currently suppressed by a conditional branch.
    pub const fn is_ignoring(&self) -> bool {
        self.logic.ignoring()
    }

    /// Name of the builder function currently running.
    pub fn current_template(&self) -> Option<&'r str> {
        self.builders.top().map(|frame| frame.name)
    }

    /// Opens a `tag` element. Every opened element needs a matching [`end`].
    ///
    /// [`end`]: Template::end
    pub fn open<A: Into<ElementArgs>>(&mut self, tag: &str, args: A) -> &mut Self {
        if self.logic.active() {
            self.logic.descend();
        }

        if !self.logic.ignoring() {
            let node = create_element(&mut self.document, &mut self.cache, tag, args.into());
            log::trace!(target: "marker::template", "open <{tag}>");
            self.push(node);
        }

        self
    }

    /// Opens and immediately closes a `tag` element.
    pub fn leaf<A: Into<ElementArgs>>(&mut self, tag: &str, args: A) -> &mut Self {
        self.open(tag, args).end()
    }

    /// Appends a text node to the current open element.
    pub fn text<T: Into<String>>(&mut self, content: T) -> &mut Self {
        if self.logic.ignoring() {
            return self;
        }

        let node = self.document.insert(Node::Text(content.into()));
        self.attach(node);
        self
    }

    /// Appends `markup` to the current open element as-is. It is written out
    /// unmodified when the tree is serialized.
    pub fn html<T: Into<String>>(&mut self, markup: T) -> &mut Self {
        if self.logic.ignoring() {
            return self;
        }

        let node = self.document.insert(Node::Raw(markup.into()));
        self.attach(node);
        self
    }

    fn attach(&mut self, node: NodeId) {
        match self.elements.top().copied() {
            Some(parent) => self.document.append_child(parent, node),
            None => self.document.append_root(node),
        }
    }

    /// Closes the innermost open scope: an element, or a whole `when` chain
    /// once every scope opened inside the chain has been closed.
    ///
    /// Closing with nothing open does nothing.
    pub fn end(&mut self) -> &mut Self {
        match self.logic.end() {
            EndAction::PopElement => {
                if let Some(node) = self.pop() {
                    log::trace!(target: "marker::template", "close {node:?}");
                }
            }
            EndAction::Skip | EndAction::ExitedChain => {}
        }
        self
    }

    /// Opens a conditional chain whose first branch runs iff `condition`.
    pub fn when(&mut self, condition: bool) -> &mut Self {
        self.logic.enter(condition);
        self
    }

    /// Moves to the next branch of the innermost chain. The branch runs iff
    /// `condition` holds and no earlier branch of the chain has run.
    pub fn else_when(&mut self, condition: bool) -> &mut Self {
        if !self.logic.branch(condition) {
            log::warn!(target: "marker::template", "else_when without an open when chain, ignoring");
        }
        self
    }

    /// Catch-all branch of the innermost chain.
    pub fn otherwise(&mut self) -> &mut Self {
        self.else_when(true)
    }

    /// Calls `f` for each item of `items`: lists in index order, maps in key
    /// order. Returning `ControlFlow::Break` stops the loop early.
    ///
    /// The loop counts as a scope of the innermost chain while it runs, so
    /// stray `end` calls in the callback cannot close the chain.
    ///
    /// # Errors
    /// - `TypeMismatch` if `items` is neither a list nor a map. The error names
    ///   `ValueTy::List` as the expected type for both iterable kinds.
    /// - Any error returned by `f`, unmodified.
    pub fn each<F>(&mut self, items: &Value, mut f: F) -> MarkerResult<&mut Self>
    where
        F: FnMut(&mut Self, &Value, Key<'_>) -> MarkerResult<ControlFlow<()>>,
    {
        let level = self.logic.len();
        self.logic.descend();

        let result = if self.logic.ignoring() {
            Ok(())
        } else {
            self.iterate(items, &mut f)
        };

        self.logic.ascend_at(level);
        result?;
        Ok(self)
    }

    fn iterate<F>(&mut self, items: &Value, f: &mut F) -> MarkerResult<()>
    where
        F: FnMut(&mut Self, &Value, Key<'_>) -> MarkerResult<ControlFlow<()>>,
    {
        match items {
            Value::List(list) => {
                for (index, item) in list.iter().enumerate() {
                    if f(self, item, Key::Index(index))?.is_break() {
                        break;
                    }
                }
            }
            Value::Map(map) => {
                for (key, item) in map {
                    if f(self, item, Key::Name(key))?.is_break() {
                        break;
                    }
                }
            }
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Text(_) => {
                return Err(MarkerError::TypeMismatch {
                    expected: ValueTy::List,
                    found: items.ty(),
                });
            }
        }
        Ok(())
    }

    /// Runs the builder registered under `name` at the current position.
    ///
    /// Elements and chains the partial leaves open are closed when it returns,
    /// so the caller resumes exactly where it was. Does nothing while ignoring.
    ///
    /// # Errors
    /// - `MissingTemplate` if nothing is registered under `name`.
    /// - Any error raised by the partial.
    pub fn partial<N: AsRef<str>>(&mut self, name: N, args: &[Value]) -> MarkerResult<&mut Self> {
        if self.logic.ignoring() {
            return Ok(self);
        }

        let name = name.as_ref();
        let frame = self.lookup(name).inspect_err(|_| {
            log::debug!(target: "marker::template", "partial '{name}' is not registered");
        })?;

        self.builders.push(frame);
        let result = self.drive(args);
        self.builders.pop();

        result?;
        Ok(self)
    }
}

macro_rules! tags {
    ($($tag:ident),* $(,)?) => {
        /// Tag names with a dedicated opening method on [`Template`].
        pub const TAGS: &[&str] = &[$(stringify!($tag)),*];

        impl Template<'_> {
            $(
                #[doc = concat!("Opens a `<", stringify!($tag), ">` element.")]
                pub fn $tag<A: Into<ElementArgs>>(&mut self, args: A) -> &mut Self {
                    self.open(stringify!($tag), args)
                }
            )*
        }
    };
}

tags!(
    p, h1, h2, h3, h4, h5, h6, strong, em, abbr, address, bdo, blockquote, cite, q, code, ins,
    del, dfn, kbd, pre, samp, var, br, div, span, section, header, footer, sidebar, sub, sup, a,
    base, img, area, map, object, param, canvas, ul, ol, li, dl, dt, dd, table, tr, td, th, tbody,
    thead, tfoot, col, colgroup, caption, form, input, textarea, select, option, optgroup, button,
    label, fieldset, legend,
);
