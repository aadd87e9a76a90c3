
use std::ops::ControlFlow;

use fixtures::{generate_random_chain, generate_random_depth, get_engine};
use marker::{Attrs, MarkerError, MarkerInterface, Node, NodeId, Rendered, Tree, Value};

fn tag_of(rendered: &Rendered, id: NodeId) -> Option<&str> {
    rendered.document().get(id).and_then(Node::tag)
}

#[test]
#[ntest::timeout(100)]
fn test_basic_tree() {
    let mut engine = get_engine();
    engine
        .register("Template A", |t, _| {
            t.div(()).p("a").end().span("b").end().end();
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("Template A", &[]).unwrap();
    let Tree::Node(root) = rendered.tree() else {
        panic!("expected a single root, got {:?}", rendered.tree());
    };

    let document = rendered.document();
    assert_eq!(tag_of(&rendered, root), Some("div"));

    let children = document.children(root);
    assert_eq!(children.len(), 2, "div should have two children");

    let p = children.first().copied().unwrap();
    let span = children.last().copied().unwrap();
    assert_eq!(tag_of(&rendered, p), Some("p"));
    assert_eq!(document.text_content(p), "a");
    assert_eq!(tag_of(&rendered, span), Some("span"));
    assert_eq!(document.text_content(span), "b");
}

#[test]
#[ntest::timeout(100)]
fn test_when_false_otherwise() {
    let mut engine = get_engine();
    engine
        .register("Choice", |t, _| {
            t.when(false).p(()).end().otherwise().span(()).end().end();
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("Choice", &[]).unwrap();
    match rendered.tree() {
        Tree::Node(root) => assert_eq!(tag_of(&rendered, root), Some("span")),
        Tree::Fragment(roots) => panic!("expected exactly one root, got {}", roots.len()),
    }
}

#[test]
#[ntest::timeout(100)]
fn test_nesting_builds_proper_tree() {
    for _ in 0..10 {
        let depth = generate_random_depth();

        let mut engine = get_engine();
        engine
            .register("Nested", move |t, _| {
                for level in 0..depth {
                    t.div(Attrs::new().id(level.to_string()));
                    t.leaf("i", level.to_string());
                }
                for _ in 0..depth {
                    t.end();
                }
                Ok(())
            })
            .unwrap();

        let rendered = engine.render("Nested", &[]).unwrap();
        let document = rendered.document();
        assert_eq!(document.roots().len(), 1);

        let mut current = document.roots().first().copied();
        for level in 0..depth {
            let id = current.unwrap();
            let element = document.get(id).and_then(Node::as_element).unwrap();
            assert_eq!(element.attribute("id"), Some(level.to_string().as_str()));

            let children = element.children();
            let leaf = children.first().copied().unwrap();
            assert_eq!(document.text_content(leaf), level.to_string());

            if level + 1 == depth {
                assert_eq!(children.len(), 1, "innermost div holds only its leaf");
                current = None;
            } else {
                assert_eq!(children.len(), 2, "div at {level} holds a leaf and a div");
                current = children.get(1).copied();
            }
        }
        assert_eq!(current, None);
    }
}

#[test]
#[ntest::timeout(100)]
fn test_at_most_one_branch_runs() {
    for _ in 0..20 {
        let (conditions, first_true) = generate_random_chain(5);
        let chain = conditions.clone();

        let mut engine = get_engine();
        engine
            .register("Chain", move |t, _| {
                for (i, condition) in chain.iter().enumerate() {
                    if i == 0 {
                        t.when(*condition);
                    } else {
                        t.else_when(*condition);
                    }
                    t.leaf("b", i.to_string());
                }
                t.otherwise().leaf("b", "otherwise").end();
                Ok(())
            })
            .unwrap();

        let rendered = engine.render("Chain", &[]).unwrap();
        let expected = first_true.map_or_else(|| "otherwise".to_string(), |i| i.to_string());
        assert_eq!(
            rendered.to_string(),
            format!("<b>{expected}</b>"),
            "conditions: {conditions:?}"
        );
    }
}

#[test]
#[ntest::timeout(100)]
fn test_nested_chains() {
    let mut engine = get_engine();
    engine
        .register("Nested chains", |t, args| {
            let a = args.first().and_then(Value::as_bool).unwrap_or(false);
            let b = args.get(1).and_then(Value::as_bool).unwrap_or(false);

            t.when(a)
                .when(b)
                .leaf("p", "Both true")
                .otherwise()
                .leaf("p", "One true")
                .end()
                .otherwise()
                .when(b)
                .leaf("p", "One true")
                .otherwise()
                .leaf("p", "None true")
                .end()
                .end();
            Ok(())
        })
        .unwrap();

    let cases = [
        (true, true, "Both true"),
        (true, false, "One true"),
        (false, true, "One true"),
        (false, false, "None true"),
    ];
    for (a, b, expected) in cases {
        let rendered = engine
            .render("Nested chains", &[Value::from(a), Value::from(b)])
            .unwrap();
        assert_eq!(rendered.to_string(), format!("<p>{expected}</p>"));
    }
}

#[test]
#[ntest::timeout(100)]
fn test_inner_true_suppressed_by_outer() {
    let mut engine = get_engine();
    engine
        .register("Suppressed", |t, _| {
            t.section(())
                .when(false)
                .div(())
                .when(true)
                .leaf("p", "inner")
                .end()
                .end()
                .end()
                .end();
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("Suppressed", &[]).unwrap();
    assert_eq!(rendered.to_string(), "<section></section>");
}

#[test]
#[ntest::timeout(100)]
fn test_each_indexable_and_keyed() {
    let mut engine = get_engine();
    engine
        .register("Lists", |t, args| {
            let items = args.first().cloned().unwrap_or_default();
            t.ul(()).each(&items, |t, item, key| {
                t.li(format!("{key}={item}")).end();
                Ok(ControlFlow::Continue(()))
            })?;
            t.end();
            Ok(())
        })
        .unwrap();

    let rendered = engine
        .render("Lists", &[Value::from(vec!["x", "y"])])
        .unwrap();
    assert_eq!(rendered.to_string(), "<ul><li>0=x</li><li>1=y</li></ul>");

    let rendered = engine
        .render("Lists", &[Value::map([("b", 2), ("a", 1), ("c", 3)])])
        .unwrap();
    assert_eq!(
        rendered.to_string(),
        "<ul><li>a=1</li><li>b=2</li><li>c=3</li></ul>"
    );

    let result = engine.render("Lists", &[Value::from(3)]);
    assert!(matches!(result, Err(MarkerError::TypeMismatch { .. })));
}

#[test]
#[ntest::timeout(100)]
fn test_conditionals_inside_loop() {
    let mut engine = get_engine();
    engine
        .register("People", |t, args| {
            let people = args.first().cloned().unwrap_or_default();
            t.ul(()).each(&people, |t, person, _| {
                let name = person.get("name").map(ToString::to_string).unwrap_or_default();
                let admin = person.get("admin").and_then(Value::as_bool).unwrap_or(false);
                t.li(())
                    .when(admin)
                    .leaf("strong", name.clone())
                    .otherwise()
                    .text(name)
                    .end()
                    .end();
                Ok(ControlFlow::Continue(()))
            })?;
            t.end();
            Ok(())
        })
        .unwrap();

    let people = Value::from(vec![
        Value::map([("name", Value::from("Ada")), ("admin", Value::from(true))]),
        Value::map([("name", Value::from("Bob")), ("admin", Value::from(false))]),
    ]);
    let rendered = engine.render("People", &[people]).unwrap();
    assert_eq!(
        rendered.to_string(),
        "<ul><li><strong>Ada</strong></li><li>Bob</li></ul>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_partial_attaches_at_call_site() {
    let mut engine = get_engine();
    engine
        .register("row", |t, args| {
            let label = args.first().map(ToString::to_string).unwrap_or_default();
            t.tr(()).td(label).end().end();
            Ok(())
        })
        .unwrap();
    engine
        .register("table", |t, args| {
            let rows = args.first().cloned().unwrap_or_default();
            t.table(()).thead(()).leaf("th", "Name").end().tbody(());
            t.each(&rows, |t, row, _| {
                t.partial("row", &[row.clone()])?;
                Ok(ControlFlow::Continue(()))
            })?;
            t.end().leaf("caption", "done").end();
            Ok(())
        })
        .unwrap();

    let rendered = engine
        .render("table", &[Value::from(vec!["one", "two"])])
        .unwrap();
    assert_eq!(
        rendered.to_string(),
        "<table><thead><th>Name</th></thead><tbody><tr><td>one</td></tr><tr><td>two</td></tr></tbody><caption>done</caption></table>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_partial_inside_conditional() {
    let mut engine = get_engine();
    engine
        .register("badge", |t, _| {
            t.when(true).leaf("span", "badge").end();
            Ok(())
        })
        .unwrap();
    engine
        .register("card", |t, args| {
            let show = args.first().and_then(Value::as_bool).unwrap_or(false);
            t.div(()).when(show);
            t.partial("badge", &[])?;
            t.otherwise().leaf("em", "hidden").end().leaf("p", "after").end();
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("card", &[Value::from(true)]).unwrap();
    assert_eq!(
        rendered.to_string(),
        "<div><span>badge</span><p>after</p></div>"
    );

    let rendered = engine.render("card", &[Value::from(false)]).unwrap();
    assert_eq!(rendered.to_string(), "<div><em>hidden</em><p>after</p></div>");
}

#[test]
#[ntest::timeout(100)]
fn test_missing_partial_can_be_branched_on() {
    let mut engine = get_engine();
    engine
        .register("page", |t, _| {
            t.div(());
            if t.partial("sidebar", &[]).is_err() {
                t.leaf("p", "no sidebar");
            }
            t.end();
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("page", &[]).unwrap();
    assert_eq!(rendered.to_string(), "<div><p>no sidebar</p></div>");
}

#[test]
#[ntest::timeout(100)]
fn test_failed_partial_leaves_caller_intact() {
    let mut engine = get_engine();
    engine
        .register("broken", |t, _| {
            t.section(Attrs::new().cache("broken")).when(false);
            Err(MarkerError::render("boom"))
        })
        .unwrap();
    engine
        .register("page", |t, _| {
            t.div(());
            if t.partial("broken", &[]).is_err() {
                t.leaf("p", "fallback");
            }
            t.end().leaf("footer", "f");
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("page", &[]).unwrap();
    assert_eq!(
        rendered.to_string(),
        "<div><p>fallback</p></div><footer>f</footer>"
    );
    assert!(!rendered.cache().contains("broken"));
    assert!(
        rendered
            .document()
            .roots()
            .iter()
            .all(|id| tag_of(&rendered, *id) != Some("section"))
    );
}

#[test]
#[ntest::timeout(100)]
fn test_failed_partial_inside_chain() {
    let mut engine = get_engine();
    engine
        .register("broken", |t, _| {
            t.ul(()).li("half built");
            Err(MarkerError::render("boom"))
        })
        .unwrap();
    engine
        .register("page", |t, _| {
            t.when(true).div(());
            let failed = t.partial("broken", &[]).is_err();
            t.leaf("span", if failed { "failed" } else { "ok" })
                .end()
                .otherwise()
                .leaf("p", "never")
                .end();
            t.leaf("hr", ());
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("page", &[]).unwrap();
    assert_eq!(
        rendered.to_string(),
        "<div><span>failed</span></div><hr>"
    );
}

#[test]
#[ntest::timeout(100)]
fn test_missing_partial_propagates() {
    let mut engine = get_engine();
    engine
        .register("page", |t, _| {
            t.partial("sidebar", &[])?;
            Ok(())
        })
        .unwrap();

    let result = engine.render("page", &[]);
    assert!(matches!(
        result,
        Err(MarkerError::MissingTemplate { template_name }) if template_name == "sidebar"
    ));
}

#[test]
#[ntest::timeout(100)]
fn test_render_twice_is_independent() {
    let mut engine = get_engine();
    engine
        .register("profile", |t, args| {
            let name = args.first().map(ToString::to_string).unwrap_or_default();
            t.div(Attrs::new().class("profile").cache(name.clone()))
                .h1(name)
                .end()
                .end();
            Ok(())
        })
        .unwrap();

    let first = engine.render("profile", &[Value::from("Ada")]).unwrap();
    let second = engine.render("profile", &[Value::from("Bob")]).unwrap();

    assert_eq!(first.to_string(), r#"<div class="profile"><h1>Ada</h1></div>"#);
    assert_eq!(second.to_string(), r#"<div class="profile"><h1>Bob</h1></div>"#);
    assert!(first.cache().contains("Ada"));
    assert!(!second.cache().contains("Ada"));
    assert_eq!(second.cache().len(), 1);
    assert_eq!(second.document().roots().len(), 1);
}

#[test]
#[ntest::timeout(100)]
fn test_cache_shared_with_partials() {
    let mut engine = get_engine();
    engine
        .register("field", |t, args| {
            let name = args.first().map(ToString::to_string).unwrap_or_default();
            t.leaf("input", Attrs::new().set("name", name).cache("field"));
            Ok(())
        })
        .unwrap();
    engine
        .register("form", |t, _| {
            t.form(Attrs::new().cache("form"));
            t.partial("field", &[Value::from("first")])?;
            t.partial("field", &[Value::from("second")])?;
            t.end();
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("form", &[]).unwrap();
    assert_eq!(rendered.cache().len(), 2);
    assert_eq!(rendered.cached("form").and_then(Node::tag), Some("form"));

    let field = rendered.cached("field").and_then(Node::as_element).unwrap();
    assert_eq!(field.attribute("name"), Some("second"));
    assert_eq!(
        rendered.to_string(),
        r#"<form><input name="first"><input name="second"></form>"#
    );
}

#[test]
#[ntest::timeout(100)]
fn test_callback_error_propagates() {
    let mut engine = get_engine();
    engine
        .register("failing", |t, _| {
            t.ul(()).each(&Value::from(vec![1, 2, 3]), |_, item, _| {
                if item.as_int() == Some(2) {
                    return Err(MarkerError::render("item 2 is invalid"));
                }
                Ok(ControlFlow::Continue(()))
            })?;
            Ok(())
        })
        .unwrap();

    let result = engine.render("failing", &[]);
    assert_eq!(
        result,
        Err(MarkerError::RenderError {
            message: "item 2 is invalid".to_string()
        })
    );
}

#[test]
#[ntest::timeout(100)]
fn test_unclosed_elements_are_closed() {
    let mut engine = get_engine();
    engine
        .register("sloppy", |t, _| {
            t.div(()).ul(()).li("a");
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("sloppy", &[]).unwrap();
    assert_eq!(rendered.to_string(), "<div><ul><li>a</li></ul></div>");
}

#[test]
#[ntest::timeout(100)]
fn test_extra_end_is_harmless() {
    let mut engine = get_engine();
    engine
        .register("extra", |t, _| {
            t.end().p("a").end().end().end();
            Ok(())
        })
        .unwrap();

    let rendered = engine.render("extra", &[]).unwrap();
    assert_eq!(rendered.to_string(), "<p>a</p>");
}

#[test]
#[ntest::timeout(100)]
fn test_attributes_from_arguments() {
    let mut engine = get_engine();
    engine
        .register("link", |t, args| {
            let attrs = args.first().cloned().unwrap_or_default();
            t.a(&attrs).text("home").end();
            Ok(())
        })
        .unwrap();

    let attrs = Value::map([
        ("href", Value::from("/")),
        ("className", Value::from("nav")),
        ("disabled", Value::from(false)),
        ("style", Value::map([("fontWeight", "bold")])),
    ]);
    let rendered = engine.render("link", &[attrs]).unwrap();
    assert_eq!(
        rendered.to_string(),
        r#"<a class="nav" href="/" style="font-weight: bold;">home</a>"#
    );
}
