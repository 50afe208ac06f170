//! PreV engine demo.
//!
//! Opens a window and clears it to a color driven by the keyboard.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p prev-demo -- [OPTIONS]
//! ```
//!
//! ## Controls
//! - `R` / `G` / `B`: raise the red, green or blue channel (hold `Shift` to lower it)
//! - `Space`: reset the color
//! - `Escape`: toggle mouse lock

mod clear_color;

use prev_app::{init_logging, Engine};
use prev_core::EngineConfig;

use crate::clear_color::ClearColorNode;

fn print_help() {
    println!(
        r"PreV Demo

USAGE:
    cargo run -p prev-demo -- [OPTIONS]

OPTIONS:
    --no-vsync              Present with mailbox instead of FIFO
    --validation            Enable Vulkan validation layers
    --fullscreen            Start in borderless fullscreen
    --frames <N>            Frames in flight (default: 3)
    -h, --help              Print this help message
"
    );
}

fn parse_args() -> anyhow::Result<Option<EngineConfig>> {
    let mut config = EngineConfig::new("PreV Demo");
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--no-vsync" => config.scene.vsync = false,
            "--validation" => config.validation = true,
            "--fullscreen" => config.full_screen = true,
            "--frames" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--frames needs a value"))?;
                config.scene.frames_in_flight = value.parse()?;
            }
            other => anyhow::bail!("unknown option: {other} (try --help)"),
        }
    }
    Ok(Some(config))
}

fn main() -> anyhow::Result<()> {
    let Some(config) = parse_args()? else {
        print_help();
        return Ok(());
    };

    init_logging();
    tracing::info!("Starting {}", config.app_name);

    let mut engine = Engine::new(config)?;
    engine.run(Box::new(ClearColorNode::default()))
}
