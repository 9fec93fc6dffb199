//! Registration scenarios
//!
//! Definitions are first-wins, stylesheets land after the main sheet, and
//! nodes already in the document are upgraded when their tag is defined.

use crate::harness::{row, Callback};
use crate::runner::TestSuite;
use anyhow::ensure;
use mip_platform::StyleHost;

/// Create the registration suite
pub fn suite() -> TestSuite {
    let mut suite = TestSuite::new("registration");

    suite.add("duplicate_is_ignored", |h| {
        ensure!(h.register_with_style("mip-img", "mip-img { display: block }"));
        ensure!(!h.register_with_style("mip-img", "mip-img { display: none }"));
        ensure!(!h.register_with_style("MIP-IMG", ""));

        let definition = h
            .context()
            .definition("mip-img")
            .ok_or_else(|| anyhow::anyhow!("definition missing"))?;
        ensure!(definition.style() == "mip-img { display: block }");
        ensure!(h.page().style_text("mip-img").as_deref() == Some("mip-img { display: block }"));
        ensure!(h.context().registered_names() == ["mip-img"]);
        Ok(())
    });

    suite.add("styles_follow_main_sheet", |h| {
        h.page().insert_style("mip-main", "body { margin: 0 }", None);
        h.page().insert_style("page", ".page { color: red }", None);
        for tag in ["mip-img", "mip-video"] {
            ensure!(h.register(tag));
        }
        let names = h.page().style_names();
        ensure!(
            names == ["page", "mip-main", "mip-video", "mip-img"],
            "unexpected sheet order {names:?}"
        );
        Ok(())
    });

    suite.add("connected_nodes_upgrade", |h| {
        h.register("mip-img");
        h.insert("mip-carousel", "early", row(0.0, 100.0), &[])?;
        h.create("mip-carousel", "loose", row(200.0, 100.0), &[])?;
        ensure!(h.context().element(h.node("early")?).is_none());

        ensure!(h.register("mip-carousel"));
        ensure!(h.element("early")?.state().is_attached());
        ensure!(h.count("early", Callback::Build) == 1);
        ensure!(h.context().element(h.node("loose")?).is_none());

        // Inserting later still works
        ensure!(h.connect("loose")?);
        ensure!(h.count("loose", Callback::Created) == 1);
        Ok(())
    });

    suite.add("scheduler_created_on_first_registration", |h| {
        ensure!(h.resources().is_err());
        h.register("mip-img");
        ensure!(h.resources()?.is_empty());
        h.register("mip-video");
        ensure!(h.resources()?.is_empty());
        Ok(())
    });

    suite
}
