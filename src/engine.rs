use std::collections::HashMap;
use std::fmt;

use crate::error::{MarkerError, MarkerResult};
use crate::interface::{BuilderFn, MarkerInterface, Value};
use crate::output::Rendered;
use crate::template::Template;

/// Builder functions by registered name.
pub(crate) type Registry = HashMap<String, Box<BuilderFn>>;

/// `Marker` is the primary implementation of the `MarkerInterface` trait: a
/// registry of named builder functions that can be rendered into markup trees
/// and called from one another as partials.
///
/// Every render runs against a fresh [`Template`], so no nodes or cache
/// entries carry over from one render to the next.
///
/// # Examples
///
/// ```
/// use marker::{Marker, MarkerInterface, Value};
///
/// // Create a new registry
/// let mut marker = Marker::new();
///
/// // Register a builder
/// marker
///     .register("greeting", |t, args| {
///         let name = args.first().map(ToString::to_string).unwrap_or_default();
///         t.p(format!("Hello, {name}!")).end();
///         Ok(())
///     })
///     .unwrap();
///
/// // Render it
/// let rendered = marker.render("greeting", &[Value::from("World")]).unwrap();
/// assert_eq!(rendered.to_string(), "<p>Hello, World!</p>");
/// ```
#[derive(Default)]
pub struct Marker {
    templates: Registry,
}

impl Marker {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all registered builders, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.templates.keys().map(String::as_str)
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marker")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MarkerInterface for Marker {
    /// Registers `builder` under `name`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the builder was registered
    /// * `Err(MarkerError::TemplateExists)` if the name is already taken; the
    ///   existing builder stays in place
    ///
    /// # Examples
    ///
    /// ```
    /// use marker::{Marker, MarkerError, MarkerInterface};
    ///
    /// let mut marker = Marker::new();
    /// marker.register("empty", |_, _| Ok(())).unwrap();
    ///
    /// let duplicate = marker.register("empty", |_, _| Ok(()));
    /// assert!(matches!(duplicate, Err(MarkerError::TemplateExists { .. })));
    /// ```
    fn register<N, F>(&mut self, name: N, builder: F) -> MarkerResult<()>
    where
        N: AsRef<str>,
        F: Fn(&mut Template<'_>, &[Value]) -> MarkerResult<()> + 'static,
    {
        let name = name.as_ref();

        if self.templates.contains_key(name) {
            log::debug!(target: "marker::engine", "refusing duplicate template '{name}'");
            return Err(MarkerError::TemplateExists {
                template_name: name.to_string(),
            });
        }

        log::debug!(target: "marker::engine", "registered template '{name}'");
        self.templates.insert(name.to_string(), Box::new(builder));

        Ok(())
    }

    /// Renders the builder registered under `name` with `args`.
    ///
    /// # Returns
    ///
    /// * `Ok(Rendered)` holding the tree and the cache map
    /// * `Err(MarkerError::MissingTemplate)` if no builder is registered under the name
    /// * Any error raised while building (a missing partial, a failed callback, ...)
    ///
    /// # Examples
    ///
    /// ```
    /// use marker::{Marker, MarkerInterface, Tree};
    ///
    /// let mut marker = Marker::new();
    /// marker
    ///     .register("pair", |t, _| {
    ///         t.p("a").end().p("b").end();
    ///         Ok(())
    ///     })
    ///     .unwrap();
    ///
    /// let rendered = marker.render("pair", &[]).unwrap();
    /// assert!(matches!(rendered.tree(), Tree::Fragment(roots) if roots.len() == 2));
    /// assert!(marker.render("missing", &[]).is_err());
    /// ```
    fn render<N: AsRef<str>>(&self, name: N, args: &[Value]) -> MarkerResult<Rendered> {
        let name = name.as_ref();
        let mut template = Template::new(&self.templates);
        let rendered = template.render(name, args)?;

        log::debug!(
            target: "marker::engine",
            "rendered template '{name}' into {} node(s)",
            rendered.document().len()
        );

        Ok(rendered)
    }

    fn contains<N: AsRef<str>>(&self, name: N) -> bool {
        self.templates.contains_key(name.as_ref())
    }
}
