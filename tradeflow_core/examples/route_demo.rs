//! Tradeflow Route Demo - a lithium trade route printed to the terminal
//!
//! Flies the bundled route on the real tokio clock with shortened timings
//! and prints every notification the controller pushes.
//!
//! Run: `cargo run -p tradeflow_core --example route_demo`

use std::sync::Arc;
use tradeflow_core::{
    order_exporters_first, parse_route_json, ChoreographyConfig, GeoPoint, HeadlessScene, Role,
    SequenceController, SequenceObserver, SequencePhase, StaticGazetteer,
};
use tradeflow_env::TokioContext;

const ROUTE: &str = include_str!("../../data/lithium_route.json");

mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const CYAN: &str = "\x1b[36m";
    pub const YELLOW: &str = "\x1b[33m";
}

use colors::*;

struct TerminalObserver;

impl SequenceObserver for TerminalObserver {
    fn on_status_changed(&mut self, text: &str) {
        println!("{DIM}status{RESET}  {}", text);
    }

    fn on_step_changed(&mut self, index: usize) {
        println!("{YELLOW}step{RESET}    {}", index);
    }

    fn on_country_highlighted(&mut self, name: &str, role: Role) {
        let color = match role {
            Role::Exporter => GREEN,
            Role::Importer => CYAN,
        };
        println!("{color}highlight{RESET} {} ({})", name, role);
    }

    fn on_label_added(&mut self, point: GeoPoint, text: &str, _color: &str) {
        println!("{DIM}label{RESET}   {} at {}", text, point);
    }

    fn on_phase_changed(&mut self, phase: SequencePhase) {
        println!("── {} ──", phase);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let steps = order_exporters_first(parse_route_json(ROUTE)?);

    // Quick enough to watch in a terminal
    let config = ChoreographyConfig {
        arc_duration_ms: 900,
        dwell_ms: 300,
        initial_dwell_ms: 200,
        fly_in_ms: 600,
        settle_ms: 200,
        ..Default::default()
    };

    let ctx = Arc::new(TokioContext::with_frame_rate(config.frame_rate_hz)?);
    let mut controller = SequenceController::new(
        ctx,
        HeadlessScene::new(),
        TerminalObserver,
        config,
    );
    controller.prepare(steps, &mut StaticGazetteer::builtin())?;
    let outcome = controller.run().await?;

    let scene = controller.scene();
    println!(
        "\n{:?}: {} trails, {} camera updates",
        outcome,
        scene.trails.len(),
        scene.camera_updates
    );
    Ok(())
}
