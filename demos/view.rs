//! Opens a viewer window.
//!
//! ```text
//! cargo run --example view                          # assets/wedge.stl
//! cargo run --example view -- https://host/part.stl
//! cargo run --example view -- viewer.toml           # full config
//! ```

use flow_viewer::config::ViewerConfig;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(arg) if arg.ends_with(".toml") => ViewerConfig::load(&arg)?,
        Some(locator) => ViewerConfig::default().with_model(locator),
        None => ViewerConfig::default().with_model("wedge.stl"),
    };

    flow_viewer::run(config)
}
