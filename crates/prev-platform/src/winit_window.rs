//! [`Window`] on winit, driven with `pump_app_events`.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use parking_lot::Mutex;
use prev_core::{Position, Size};
use prev_event::events::{
    KeyEvent, Modifiers, MouseAction, MouseCursorVisibilityRequest, MouseEvent, MouseLockRequest,
    MouseScrollEvent, TextEvent, TouchEvent, WindowChangeEvent, WindowCreatedEvent,
    WindowDestroyedEvent, WindowFocusChangeEvent, WindowMovedEvent, WindowResizeEvent,
};
use prev_event::{EventChannel, SubscriptionGuard};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorGrabMode, WindowId};

use crate::config::WindowConfig;
use crate::error::{PlatformError, Result};
use crate::translate;
use crate::Window;

/// Pumps allowed for the platform to deliver the first `resumed`.
const STARTUP_PUMPS: usize = 64;
const STARTUP_PUMP_TIMEOUT: Duration = Duration::from_millis(5);

#[derive(Debug, Default)]
struct CursorRequests {
    lock: Option<bool>,
    visible: Option<bool>,
}

/// Native window plus the event loop that feeds it.
///
/// Every native event becomes a queued event on the channel, so listeners
/// see them on the engine's next `dispatch_all`. Mouse lock and cursor
/// visibility requests posted on the channel are applied on the next
/// [`Window::process_events`].
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    state: WindowState,
}

struct WindowState {
    config: WindowConfig,
    channel: EventChannel,
    window: Option<winit::window::Window>,
    requests: Arc<Mutex<CursorRequests>>,
    _lock_subscription: SubscriptionGuard<MouseLockRequest>,
    _visibility_subscription: SubscriptionGuard<MouseCursorVisibilityRequest>,
    size: Size,
    focused: bool,
    close_requested: bool,
    modifiers: Modifiers,
    cursor: Vec2,
    error: Option<PlatformError>,
}

impl WinitWindow {
    /// Open a window and wait until the platform has created it.
    pub fn new(config: WindowConfig, channel: &EventChannel) -> Result<Self> {
        let mut event_loop =
            EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;
        let mut state = WindowState::new(config, channel);

        for _ in 0..STARTUP_PUMPS {
            let status = event_loop.pump_app_events(Some(STARTUP_PUMP_TIMEOUT), &mut state);
            if let Some(e) = state.error.take() {
                return Err(e);
            }
            if let PumpStatus::Exit(code) = status {
                return Err(PlatformError::EventLoop(format!(
                    "event loop exited during startup (code {code})"
                )));
            }
            if state.window.is_some() {
                return Ok(Self { event_loop, state });
            }
        }

        Err(PlatformError::WindowCreation(
            "platform never resumed the application".to_string(),
        ))
    }

    /// The underlying winit window.
    pub fn native(&self) -> Option<&winit::window::Window> {
        self.state.window.as_ref()
    }

    pub fn position(&self) -> Option<Position> {
        let pos = self.native()?.outer_position().ok()?;
        Some(Position::new(pos.x, pos.y))
    }
}

impl Window for WinitWindow {
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn process_events(&mut self) -> bool {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);
        self.state.apply_cursor_requests();

        if let PumpStatus::Exit(code) = status {
            tracing::info!("Event loop exited (code {code})");
            return false;
        }
        !self.state.close_requested
    }

    fn size(&self) -> Size {
        self.state.size
    }

    fn has_focus(&self) -> bool {
        self.state.focused
    }

    fn set_title(&mut self, title: &str) {
        if let Some(window) = &self.state.window {
            window.set_title(title);
        }
        self.state.config.title = title.to_string();
    }
}

impl HasWindowHandle for WinitWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        self.native().ok_or(HandleError::Unavailable)?.window_handle()
    }
}

impl HasDisplayHandle for WinitWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        self.native().ok_or(HandleError::Unavailable)?.display_handle()
    }
}

impl WindowState {
    fn new(config: WindowConfig, channel: &EventChannel) -> Self {
        let requests = Arc::new(Mutex::new(CursorRequests::default()));

        let sink = requests.clone();
        let lock_subscription =
            channel.subscribe_guarded(move |r: &MouseLockRequest| sink.lock().lock = Some(r.lock));
        let sink = requests.clone();
        let visibility_subscription = channel
            .subscribe_guarded(move |r: &MouseCursorVisibilityRequest| {
                sink.lock().visible = Some(r.visible);
            });

        Self {
            size: config.size,
            config,
            channel: channel.clone(),
            window: None,
            requests,
            _lock_subscription: lock_subscription,
            _visibility_subscription: visibility_subscription,
            focused: false,
            close_requested: false,
            modifiers: Modifiers::empty(),
            cursor: Vec2::ZERO,
            error: None,
        }
    }

    fn extent(&self) -> Vec2 {
        #[allow(clippy::cast_precision_loss)]
        Vec2::new(self.size.width as f32, self.size.height as f32)
    }

    fn apply_cursor_requests(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let requests = std::mem::take(&mut *self.requests.lock());

        if let Some(lock) = requests.lock {
            let result = if lock {
                window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
            } else {
                window.set_cursor_grab(CursorGrabMode::None)
            };
            if let Err(e) = result {
                tracing::warn!("Could not change cursor grab: {e}");
            }
        }
        if let Some(visible) = requests.visible {
            window.set_cursor_visible(visible);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn handle(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested");
                self.close_requested = true;
                self.channel.post_queued(WindowDestroyedEvent);
            }
            WindowEvent::Resized(size) => {
                self.size = Size::new(size.width, size.height);
                self.channel.post_queued(WindowResizeEvent {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::Moved(pos) => {
                self.channel.post_queued(WindowMovedEvent {
                    position: Position::new(pos.x, pos.y),
                });
            }
            WindowEvent::Focused(has_focus) => {
                self.focused = has_focus;
                self.channel.post_queued(WindowFocusChangeEvent { has_focus });
            }
            WindowEvent::ScaleFactorChanged { .. }
            | WindowEvent::ThemeChanged(_)
            | WindowEvent::Occluded(_) => {
                self.channel.post_queued(WindowChangeEvent);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state().into();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = translate::key_code(event.physical_key) {
                    self.channel.post_queued(KeyEvent {
                        action: translate::key_action(event.state),
                        key,
                        modifiers: self.modifiers,
                    });
                }
                if event.state == ElementState::Pressed {
                    if let Some(text) = event.text {
                        self.channel.post_queued(TextEvent {
                            text: text.to_string(),
                        });
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                self.channel.post_queued(MouseEvent {
                    action: MouseAction::Move,
                    button: None,
                    position: self.cursor,
                    extent: self.extent(),
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = translate::mouse_button(button) {
                    self.channel.post_queued(MouseEvent {
                        action: translate::mouse_action(state),
                        button: Some(button),
                        position: self.cursor,
                        extent: self.extent(),
                    });
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.channel.post_queued(MouseScrollEvent {
                    delta: translate::scroll_lines(delta),
                    position: self.cursor,
                });
            }
            WindowEvent::Touch(touch) => {
                self.channel.post_queued(TouchEvent {
                    action: translate::touch_action(touch.phase),
                    pointer_id: translate::touch_pointer_id(touch.id),
                    position: Vec2::new(touch.location.x as f32, touch.location.y as f32),
                    extent: self.extent(),
                });
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match event_loop.create_window(self.config.attributes()) {
            Ok(window) => {
                let size = window.inner_size();
                self.size = Size::new(size.width, size.height);
                self.focused = window.has_focus();
                tracing::info!(
                    "Window \"{}\" created ({}x{})",
                    self.config.title,
                    size.width,
                    size.height
                );
                self.channel
                    .post_queued(WindowCreatedEvent { size: self.size });
                self.window = Some(window);
            }
            Err(e) => {
                self.error = Some(PlatformError::WindowCreation(e.to_string()));
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.handle(event);
    }
}
