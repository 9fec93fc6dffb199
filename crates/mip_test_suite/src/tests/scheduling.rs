//! Resource scheduling scenarios

use crate::harness::{row, Callback, ScenarioHarness};
use crate::runner::TestSuite;
use anyhow::ensure;
use mip_core::Rect;
use std::rc::Rc;
use std::time::Duration;

/// Create the scheduling suite
pub fn suite() -> TestSuite {
    let mut suite = TestSuite::new("scheduling");

    suite.add("classification_with_touching_edges", |h| {
        h.register("mip-img");
        let w = ScenarioHarness::WIDTH;
        let hgt = ScenarioHarness::HEIGHT;
        // Viewport after the scroll spans y 2000..=2000 + HEIGHT
        let cases = [
            ("above", row(1800.0, 100.0), false),
            ("touching_top", row(1900.0, 100.0), true),
            ("inside", Rect::new(20.0, 2100.0, 50.0, 50.0), true),
            ("touching_bottom", row(2000.0 + hgt, 10.0), true),
            ("below", row(2001.0 + hgt, 10.0), false),
            ("touching_right", Rect::new(w, 2100.0, 50.0, 50.0), true),
            ("right", Rect::new(w + 1.0, 2100.0, 50.0, 50.0), false),
        ];
        for (id, rect, _) in &cases {
            h.insert("mip-img", id, *rect, &[])?;
        }
        h.insert("mip-img", "prerender", row(9000.0, 10.0), &[("data-prerender", "")])?;

        h.scroll_and_settle(2000.0);

        for (id, _, expected) in &cases {
            ensure!(h.in_viewport(id)? == *expected, "{id} misclassified");
        }
        ensure!(h.in_viewport("prerender")?);
        Ok(())
    });

    suite.add("burst_collapses_to_one_pass", |h| {
        h.register("mip-img");
        h.insert("mip-img", "a", row(3000.0, 100.0), &[])?;
        let resources = Rc::clone(h.resources()?);
        let before = resources.pass_count();

        for step in 0..50 {
            h.page().set_scroll(0.0, step as f64 * 60.0);
            resources.recompute();
            h.advance(Duration::from_micros(100));
        }
        ensure!(resources.pass_count() == before, "pass ran inside the window");

        h.advance_ms(10);
        ensure!(resources.pass_count() == before + 1);
        // The single pass reads the final scroll position
        ensure!(h.in_viewport("a")?);
        ensure!(h.count("a", Callback::Viewport(true)) == 1);
        Ok(())
    });

    suite.add("late_trigger_runs_immediately", |h| {
        h.register("mip-img");
        let resources = Rc::clone(h.resources()?);
        let before = resources.pass_count();

        // Inside the first window: trailing run
        resources.recompute();
        ensure!(resources.is_recompute_pending());
        h.advance_ms(10);
        ensure!(resources.pass_count() == before + 1);

        // Long after the last pass: runs synchronously
        h.advance_ms(1000);
        resources.recompute();
        ensure!(resources.pass_count() == before + 2, "late trigger was deferred");
        ensure!(!resources.is_recompute_pending());

        // The late run opened a new window
        resources.recompute();
        ensure!(resources.is_recompute_pending());
        h.advance_ms(10);
        ensure!(resources.pass_count() == before + 3);
        Ok(())
    });

    suite.add("failing_build_is_isolated", |h| {
        h.register("mip-img");
        h.insert("mip-img", "broken", row(0.0, 100.0), &[("data-fail-build", "")])?;
        h.insert("mip-img", "sulky", row(100.0, 100.0), &[("data-fail-viewport", "")])?;
        h.insert("mip-img", "healthy", row(200.0, 100.0), &[])?;

        for id in ["broken", "sulky", "healthy"] {
            ensure!(h.element(id)?.is_built(), "{id} not built");
            ensure!(h.in_viewport(id)?, "{id} not classified");
        }
        ensure!(h.count("healthy", Callback::Build) == 1);

        h.scroll_and_settle(5000.0);
        for id in ["broken", "sulky", "healthy"] {
            ensure!(!h.in_viewport(id)?, "{id} stuck in viewport");
        }
        Ok(())
    });

    suite.add("removal_during_pass", |h| {
        h.register("mip-img");
        let context = Rc::downgrade(h.context());
        let victim_node = h.create("mip-img", "victim", row(3100.0, 100.0), &[])?;
        h.on_viewport("remover", move |in_viewport| {
            if let (true, Some(context)) = (in_viewport, context.upgrade()) {
                context.node_removed(victim_node);
            }
        });
        h.insert("mip-img", "remover", row(3000.0, 100.0), &[])?;
        h.connect("victim")?;

        h.scroll_and_settle(2800.0);

        ensure!(h.in_viewport("remover")?);
        ensure!(h.count("victim", Callback::Detached) == 1);
        ensure!(h.count("victim", Callback::Viewport(true)) == 0);
        ensure!(h.count("victim", Callback::FirstInview) == 0);
        ensure!(h.resources()?.len() == 1);
        Ok(())
    });

    suite.add("geometry_failure_is_out_of_viewport", |h| {
        h.register("mip-img");
        let node = h.insert("mip-img", "a", row(0.0, 100.0), &[])?;
        ensure!(h.in_viewport("a")?);

        h.page().break_geometry(node, true);
        h.resources()?.recompute_now();
        ensure!(!h.in_viewport("a")?);

        h.page().break_geometry(node, false);
        h.resources()?.recompute_now();
        ensure!(h.in_viewport("a")?);
        Ok(())
    });

    suite.add("prerender_element", |h| {
        h.register("mip-img");
        h.insert("mip-img", "slide", row(8000.0, 100.0), &[])?;
        let node = h.node("slide")?;

        ensure!(h.context().prerender(node));
        ensure!(!h.context().prerender(node));
        ensure!(h.count("slide", Callback::FirstInview) == 1);
        ensure!(h.count("slide", Callback::Viewport(true)) == 1);
        Ok(())
    });

    suite.add("prerender_ignores_detached_element", |h| {
        h.register("mip-img");
        h.insert("mip-img", "slide", row(8000.0, 100.0), &[])?;
        let node = h.node("slide")?;
        h.disconnect("slide")?;

        ensure!(!h.context().prerender(node), "detached element was prerendered");
        ensure!(h.count("slide", Callback::FirstInview) == 0);
        ensure!(h.count("slide", Callback::Viewport(true)) == 0);
        ensure!(!h.in_viewport("slide")?);
        Ok(())
    });

    suite.add("swipe_delays_recompute", |h| {
        h.register("mip-img");
        h.insert("mip-img", "a", row(1500.0, 100.0), &[])?;
        h.page().set_scroll(0.0, 1200.0);

        h.context().handle_swipe(2.0);
        // 2 px/ms * 600 = 1200ms, capped to 1000ms
        h.advance_ms(999);
        ensure!(!h.in_viewport("a")?);
        h.advance_ms(1);
        ensure!(h.in_viewport("a")?);
        Ok(())
    });

    suite.add("resize_recomputes", |h| {
        h.register("mip-img");
        h.insert("mip-img", "a", row(700.0, 100.0), &[])?;
        ensure!(!h.in_viewport("a")?);

        h.page().set_viewport_size(ScenarioHarness::WIDTH, 800.0);
        h.context().handle_resize();
        h.advance_ms(10);
        ensure!(h.in_viewport("a")?);
        Ok(())
    });

    suite
}
