//! The engine: window, device and the main loop.

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use prev_core::{Clock, EngineConfig, FpsService};
use prev_event::EventChannel;
use prev_gpu::{Device, Instance, PhysicalDevices, Queue, Surface};
use prev_input::Inputs;
use prev_platform::{Window, WindowConfig, WinitWindow};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::node::SceneNode;
use crate::scene::Scene;

/// How long the loop sleeps while the window is unfocused or minimized.
pub const IDLE_SLEEP: Duration = Duration::from_millis(200);

/// Run the main loop until the window closes. Returns the rendered frame count.
///
/// Each iteration pumps window events, ticks the clock and dispatches the
/// queued events of every type. The frame callback only runs while the
/// window is focused and not minimized; otherwise the loop sleeps for
/// `idle`. `frame` receives the delta time in seconds.
pub fn run_loop<W, F>(
    window: &mut W,
    channel: &EventChannel,
    clock: &mut Clock,
    fps: &mut FpsService,
    idle: Duration,
    mut frame: F,
) -> anyhow::Result<u64>
where
    W: Window + ?Sized,
    F: FnMut(f32) -> anyhow::Result<()>,
{
    let mut frames = 0;
    let mut idling = false;

    while window.process_events() {
        let dt = clock.tick();
        channel.dispatch_all();

        if window.is_minimized() || !window.has_focus() {
            if !idling {
                tracing::warn!("No focus, pausing rendering");
                idling = true;
            }
            std::thread::sleep(idle);
            continue;
        }
        if idling {
            tracing::info!("Focus regained, resuming rendering");
            idling = false;
        }

        fps.update(dt);
        frame(dt)?;
        frames += 1;
    }

    Ok(frames)
}

/// Everything one window needs to render: instance, surface, device and
/// the queues the scene submits and presents on.
///
/// ```ignore
/// let mut engine = Engine::new(EngineConfig::new("Demo"))?;
/// engine.run(Box::new(MyRootNode::default()))?;
/// ```
pub struct Engine<W = WinitWindow> {
    inputs: Inputs,
    clock: Clock,
    fps: FpsService,
    device: Device,
    graphics_queue: Arc<Queue>,
    present_queue: Arc<Queue>,
    surface: Arc<Surface>,
    instance: Arc<Instance>,
    window: W,
    channel: EventChannel,
    config: EngineConfig,
}

impl Engine<WinitWindow> {
    /// Open a winit window for `config` and set up the GPU for it.
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let channel = EventChannel::new();
        let window = WinitWindow::new(WindowConfig::from(&config), &channel)?;
        Self::with_window(config, channel, window)
    }
}

impl<W> Engine<W>
where
    W: Window + HasWindowHandle + HasDisplayHandle,
{
    /// Set up the GPU for an existing window whose events go to `channel`.
    pub fn with_window(config: EngineConfig, channel: EventChannel, window: W) -> anyhow::Result<Self> {
        config.validate()?;

        let instance = Arc::new(Instance::new(&config.app_name, config.validation)?);
        let surface = Arc::new(Surface::from_window(&instance, &window)?);

        let gpus = PhysicalDevices::enumerate(&instance)?;
        gpus.log();
        let gpu = gpus.require_presentable(surface.as_ref())?;

        let device = Device::new(instance.clone(), gpu);
        let (graphics_queue, present_queue) = request_queues(&device, &surface)?;
        device.log();
        device.handle()?;

        Ok(Self {
            inputs: Inputs::new(&channel),
            clock: Clock::new(),
            fps: FpsService::default(),
            device,
            graphics_queue,
            present_queue,
            surface,
            instance,
            window,
            channel,
            config,
        })
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn channel(&self) -> &EventChannel {
        &self.channel
    }

    pub const fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub const fn window(&self) -> &W {
        &self.window
    }

    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// Build a scene around `root` and run until the window closes.
    pub fn run(&mut self, root: Box<dyn SceneNode>) -> anyhow::Result<()> {
        let mut scene = Scene::new(
            &self.instance,
            &self.device,
            self.surface.clone(),
            self.graphics_queue.clone(),
            self.present_queue.clone(),
            &self.channel,
            self.config.scene,
            root,
        )?;

        let inputs = &self.inputs;
        self.clock.tick();
        let frames = run_loop(
            &mut self.window,
            &self.channel,
            &mut self.clock,
            &mut self.fps,
            IDLE_SLEEP,
            |dt| {
                scene.update(dt, inputs);
                scene.render()?;
                inputs.end_frame();
                Ok(())
            },
        );

        drop(scene);
        self.device.wait_idle()?;

        let frames = frames?;
        tracing::info!(
            "Main loop finished after {frames} frame(s) in {:.1}s",
            self.clock.elapsed().as_secs_f32()
        );
        Ok(())
    }
}

/// One queue that draws and presents, or a graphics queue plus a separate
/// present queue when no family can do both.
fn request_queues(device: &Device, surface: &Surface) -> anyhow::Result<(Arc<Queue>, Arc<Queue>)> {
    match device.add_queue(vk::QueueFlags::GRAPHICS, Some(surface)) {
        Ok(queue) => Ok((queue.clone(), queue)),
        Err(e) => {
            tracing::warn!("No queue can both draw and present ({e}), using two queues");
            let graphics = device.add_queue(vk::QueueFlags::GRAPHICS, None)?;
            let present = device.add_queue(vk::QueueFlags::empty(), Some(surface))?;
            Ok((graphics, present))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use prev_core::Size;
    use prev_event::events::KeyEvent;
    use prev_input::KeyCode;

    use super::*;

    /// Scripted window: one entry per `process_events` call.
    struct ScriptedWindow {
        script: VecDeque<(Size, bool)>,
        size: Size,
        focused: bool,
        channel: EventChannel,
        queued_key: Option<KeyCode>,
    }

    impl ScriptedWindow {
        fn new(channel: &EventChannel, script: &[(Size, bool)]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                size: Size::new(0, 0),
                focused: false,
                channel: channel.clone(),
                queued_key: None,
            }
        }
    }

    impl Window for ScriptedWindow {
        fn process_events(&mut self) -> bool {
            let Some((size, focused)) = self.script.pop_front() else {
                return false;
            };
            self.size = size;
            self.focused = focused;
            if let Some(key) = self.queued_key.take() {
                self.channel.post_queued(KeyEvent::press(key));
            }
            true
        }

        fn size(&self) -> Size {
            self.size
        }

        fn has_focus(&self) -> bool {
            self.focused
        }

        fn set_title(&mut self, _title: &str) {}
    }

    const VISIBLE: Size = Size::new(800, 600);
    const HIDDEN: Size = Size::new(0, 0);

    fn run(
        window: &mut ScriptedWindow,
        channel: &EventChannel,
        frame: impl FnMut(f32) -> anyhow::Result<()>,
    ) -> u64 {
        let mut clock = Clock::new();
        let mut fps = FpsService::default();
        run_loop(window, channel, &mut clock, &mut fps, Duration::ZERO, frame).unwrap()
    }

    #[test]
    fn frames_render_only_while_focused_and_visible() {
        let channel = EventChannel::new();
        let mut window = ScriptedWindow::new(
            &channel,
            &[
                (VISIBLE, true),
                (VISIBLE, false),
                (HIDDEN, true),
                (VISIBLE, true),
            ],
        );

        let mut calls = 0;
        let frames = run(&mut window, &channel, |_| {
            calls += 1;
            Ok(())
        });
        assert_eq!(frames, 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn queued_events_dispatch_before_the_frame() {
        let channel = EventChannel::new();
        let inputs = Inputs::new(&channel);
        let mut window = ScriptedWindow::new(&channel, &[(VISIBLE, true)]);
        window.queued_key = Some(KeyCode::Space);

        let seen = Mutex::new(false);
        run(&mut window, &channel, |_| {
            *seen.lock() = inputs.keyboard().is_key_pressed(KeyCode::Space);
            Ok(())
        });
        assert!(*seen.lock());
    }

    #[test]
    fn frame_error_stops_the_loop() {
        let channel = EventChannel::new();
        let mut window = ScriptedWindow::new(&channel, &[(VISIBLE, true); 5]);
        let mut clock = Clock::new();
        let mut fps = FpsService::default();

        let mut calls = 0;
        let result = run_loop(
            &mut window,
            &channel,
            &mut clock,
            &mut fps,
            Duration::ZERO,
            |_| {
                calls += 1;
                if calls == 2 {
                    anyhow::bail!("device lost");
                }
                Ok(())
            },
        );
        assert_eq!(result.unwrap_err().to_string(), "device lost");
        assert_eq!(calls, 2);
        assert_eq!(window.script.len(), 3);
    }

    #[test]
    fn closed_window_runs_no_frames() {
        let channel = EventChannel::new();
        let mut window = ScriptedWindow::new(&channel, &[]);
        let frames = run(&mut window, &channel, |_| panic!("no frame expected"));
        assert_eq!(frames, 0);
    }
}
