//! Engine main loop and scene graph for the PreV engine.
//!
//! [`Engine`] opens the window, selects a GPU that can present to it and
//! realizes the logical device. [`Engine::run`] then builds a [`Scene`]
//! around a root [`SceneNode`] and loops:
//! - pump window events and tick the clock
//! - dispatch every queued event
//! - update and render the node graph while the window is focused
//!
//! # Example
//!
//! ```no_run
//! use prev_app::{init_logging, Engine, SceneNode, UpdateContext};
//! use prev_core::EngineConfig;
//!
//! struct Pulse;
//!
//! impl SceneNode for Pulse {
//!     fn update(&mut self, ctx: &mut UpdateContext<'_>) {
//!         ctx.clear_color[2] = (ctx.clear_color[2] + ctx.dt).fract();
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging();
//!     let mut engine = Engine::new(EngineConfig::new("Pulse"))?;
//!     engine.run(Box::new(Pulse))
//! }
//! ```

mod context;
mod engine;
pub mod logging;
mod node;
mod scene;

pub use context::{InitContext, RenderContext, SceneGpu, UpdateContext};
pub use engine::{run_loop, Engine, IDLE_SLEEP};
pub use logging::init_logging;
pub use node::{init_tree, render_tree, shutdown_tree, update_tree, GroupNode, SceneNode};
pub use scene::{Scene, DEFAULT_CLEAR_COLOR};
