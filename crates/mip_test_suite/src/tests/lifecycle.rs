//! Lifecycle scenarios

use crate::harness::{row, Callback};
use crate::runner::TestSuite;
use anyhow::ensure;
use mip_runtime::LifecycleState;

/// Create the lifecycle suite
pub fn suite() -> TestSuite {
    let mut suite = TestSuite::new("lifecycle");

    suite.add("insert_order_visible", |h| {
        h.register("mip-img");
        h.insert("mip-img", "hero", row(0.0, 200.0), &[])?;
        let calls = h.calls("hero");
        ensure!(
            calls
                == [
                    Callback::Created,
                    Callback::Attached,
                    Callback::Build,
                    Callback::FirstInview,
                    Callback::Viewport(true),
                ],
            "got {calls:?}"
        );
        Ok(())
    });

    suite.add("insert_order_offscreen", |h| {
        h.register("mip-img");
        h.insert("mip-img", "footer", row(5000.0, 200.0), &[])?;
        let calls = h.calls("footer");
        ensure!(
            calls == [Callback::Created, Callback::Attached, Callback::Build],
            "got {calls:?}"
        );
        ensure!(!h.in_viewport("footer")?);
        Ok(())
    });

    suite.add("build_once_across_reattach", |h| {
        h.register("mip-img");
        h.insert("mip-img", "a", row(0.0, 100.0), &[])?;
        h.insert("mip-img", "b", row(100.0, 100.0), &[("data-fail-build", "")])?;

        for _ in 0..3 {
            for id in ["a", "b"] {
                ensure!(h.disconnect(id)?);
                ensure!(h.element(id)?.state() == LifecycleState::Detached);
                ensure!(h.connect(id)?);
            }
            h.scroll_and_settle(400.0);
            h.scroll_and_settle(0.0);
        }

        for id in ["a", "b"] {
            ensure!(h.count(id, Callback::Build) == 1, "{id} built more than once");
            ensure!(h.count(id, Callback::Attached) == 4);
            ensure!(h.count(id, Callback::Detached) == 3);
            ensure!(h.element(id)?.is_built());
        }
        Ok(())
    });

    suite.add("detach_removes_from_scheduler", |h| {
        h.register("mip-img");
        h.insert("mip-img", "a", row(0.0, 100.0), &[])?;
        let id = h
            .element("a")?
            .resource_id()
            .ok_or_else(|| anyhow::anyhow!("not live"))?;

        ensure!(h.disconnect("a")?);
        ensure!(!h.disconnect("a")?);
        ensure!(!h.resources()?.contains(id));
        ensure!(h.element("a")?.resource_id().is_none());
        ensure!(!h.resources()?.remove(id));
        Ok(())
    });

    suite.add("first_inview_once", |h| {
        h.register("mip-img");
        h.insert("mip-img", "a", row(1000.0, 100.0), &[])?;
        for top in [900.0, 0.0, 950.0, 4000.0, 980.0, 0.0] {
            h.scroll_and_settle(top);
        }
        ensure!(h.count("a", Callback::FirstInview) == 1);
        ensure!(h.count("a", Callback::Viewport(true)) == 3);
        ensure!(h.count("a", Callback::Viewport(false)) == 3);

        let first_inview = h.times("a", Callback::FirstInview)[0];
        let first_visible = h.times("a", Callback::Viewport(true))[0];
        ensure!(first_inview == first_visible);
        Ok(())
    });

    suite.add("attribute_changes_forwarded", |h| {
        h.register("mip-img");
        let node = h.insert("mip-img", "a", row(0.0, 100.0), &[])?;
        ensure!(h.context().attribute_changed(node, "src", None, Some("a.jpg")));
        ensure!(h.context().attribute_changed(node, "alt", Some("x"), None));
        ensure!(h.count("a", Callback::AttributeChanged) == 2);
        Ok(())
    });

    suite
}
