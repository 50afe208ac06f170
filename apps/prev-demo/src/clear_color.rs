//! Root node that steers the clear color from the keyboard.

use prev_app::{InitContext, SceneNode, UpdateContext};
use prev_event::events::{Modifiers, SurfaceChangedEvent};
use prev_event::SubscriptionGuard;
use prev_input::KeyCode;

/// Channel change per second while a color key is held.
const COLOR_SPEED: f32 = 0.5;

const CHANNEL_KEYS: [(KeyCode, usize); 3] =
    [(KeyCode::KeyR, 0), (KeyCode::KeyG, 1), (KeyCode::KeyB, 2)];

#[derive(Default)]
pub struct ClearColorNode {
    surface_subscription: Option<SubscriptionGuard<SurfaceChangedEvent>>,
}

impl SceneNode for ClearColorNode {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> anyhow::Result<()> {
        let gpu = ctx.gpu()?;
        tracing::info!(
            "Clear color node ready ({} frames in flight, UBO alignment {})",
            ctx.frames_in_flight,
            gpu.uniform_alignment
        );
        self.surface_subscription = Some(ctx.channel.subscribe_guarded(|e: &SurfaceChangedEvent| {
            tracing::info!("Surface is now {}x{}", e.width, e.height);
        }));
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let keyboard = ctx.inputs.keyboard();

        if keyboard.is_key_just_pressed(KeyCode::Escape) {
            let mouse = ctx.inputs.mouse();
            let lock = !mouse.is_locked();
            mouse.set_locked(lock);
            mouse.set_cursor_visible(!lock);
        }
        if keyboard.is_key_just_pressed(KeyCode::Space) {
            *ctx.clear_color = prev_app::DEFAULT_CLEAR_COLOR;
        }

        let sign = if keyboard.modifiers().contains(Modifiers::SHIFT) {
            -1.0
        } else {
            1.0
        };
        for (key, channel) in CHANNEL_KEYS {
            if keyboard.is_key_pressed(key) {
                let value = ctx.clear_color[channel] + sign * COLOR_SPEED * ctx.dt;
                ctx.clear_color[channel] = value.clamp(0.0, 1.0);
            }
        }
    }

    fn shutdown(&mut self) {
        self.surface_subscription = None;
    }
}
