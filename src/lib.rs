pub mod config;
pub mod device;

pub mod effects {
    pub mod emitter;
    pub mod engine;
    pub mod particle;
    pub mod pool;
    pub mod update;
}

pub mod input {
    pub mod mouse;
    pub mod pointer;
}

pub mod graphics {
    pub mod cursor;
    pub mod draw;
    pub mod graphics_context;
}

pub mod utils {
    pub mod clock;
    pub mod geometry;
}

pub(crate) mod window_manager;

use config::EffectsConfig;
use device::{QualityProfile, QualityTier};
use effects::engine::EffectsEngine;
use graphics::graphics_context::{GraphicsContext, OverlayError};
use input::mouse::DoubleClickDetector;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use utils::clock::{default_clock, Clock};
use utils::geometry::Extent;
use window_manager::WindowManagerError;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::error::EventLoopError;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::Window;

/// Logical pixels scrolled per wheel line.
const SCROLL_LINE_HEIGHT: f64 = 40.0;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Failed to create effects window: {0}")]
    WindowError(#[from] WindowManagerError),
    #[error("Failed to create graphics context: {0}")]
    GraphicsError(#[from] OverlayError),
}

/// Window and GPU state, created once the event loop is running.
struct Overlay<'a> {
    window: Arc<Window>,
    /// None when graphics initialization failed; the window is hidden then.
    gfx: Option<GraphicsContext<'a>>,
}

/// The effects application driven by the winit event loop.
///
/// All effect state lives in the [`EffectsEngine`]; this type translates
/// window events into engine calls and forwards the display list to the
/// graphics context on every redraw.
pub struct Application<'a> {
    engine: EffectsEngine,
    overlay: Option<Overlay<'a>>,
    double_click: DoubleClickDetector,
    event_loop_proxy: EventLoopProxy<UserEvent>,
    initial_extent: Extent,
    scale_factor: f64,
    /// Profile last pushed to the scheduler and the window.
    applied_profile: Option<QualityProfile>,
}

impl<'a> Application<'a> {
    pub fn new(input: RenderLoopRunArgs, event_loop_proxy: EventLoopProxy<UserEvent>) -> Self {
        Self::with_clock(input, event_loop_proxy, default_clock())
    }

    pub fn with_clock(
        input: RenderLoopRunArgs,
        event_loop_proxy: EventLoopProxy<UserEvent>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = EffectsEngine::new(input.config, input.extent, clock.clone(), input.seed);
        Self {
            engine,
            overlay: None,
            double_click: DoubleClickDetector::new(clock),
            event_loop_proxy,
            initial_extent: input.extent,
            scale_factor: 1.0,
            applied_profile: None,
        }
    }

    /// Creates the window and its graphics context.
    ///
    /// A window without graphics is kept hidden so the process stays alive
    /// with the effects disabled.
    fn create_overlay(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ApplicationError> {
        let window = window_manager::create_effects_window(event_loop, self.initial_extent)?;
        self.scale_factor = window.scale_factor();
        self.engine
            .resized(window_manager::logical_extent(&window));

        let gfx = GraphicsContext::new(
            window.clone(),
            self.engine.frame_interval(),
            self.event_loop_proxy.clone(),
        );
        match gfx {
            Ok(gfx) => {
                self.overlay = Some(Overlay {
                    window,
                    gfx: Some(gfx),
                });
                self.sync_profile();
                Ok(())
            }
            Err(e) => {
                window.set_visible(false);
                self.overlay = Some(Overlay { window, gfx: None });
                Err(ApplicationError::GraphicsError(e))
            }
        }
    }

    fn effects_enabled(&self) -> bool {
        self.overlay
            .as_ref()
            .is_some_and(|overlay| overlay.gfx.is_some())
    }

    /// Pushes a changed quality profile to the scheduler and the window.
    fn sync_profile(&mut self) {
        let profile = self.engine.profile();
        if self.applied_profile == Some(profile) {
            return;
        }
        let Some(Overlay {
            window,
            gfx: Some(gfx),
        }) = self.overlay.as_ref()
        else {
            return;
        };

        log::info!(
            "Application::sync_profile: {profile:?} flags {:?}",
            self.engine.flags()
        );
        gfx.set_frame_interval(profile.frame_interval);
        /* Without animation, frames are only drawn in response to input. */
        if profile.tier == QualityTier::Still {
            gfx.pause();
        } else {
            gfx.resume();
        }
        window.set_cursor_visible(!profile.show_cursor);
        window.request_redraw();
        self.applied_profile = Some(profile);
    }

    /// Input changes the picture even when the scheduler is paused.
    fn request_input_redraw(&self) {
        if self.engine.profile().tier != QualityTier::Still {
            return;
        }
        if let Some(overlay) = self.overlay.as_ref() {
            overlay.window.request_redraw();
        }
    }

    fn render_frame(&mut self) {
        let Some(Overlay {
            gfx: Some(gfx), ..
        }) = self.overlay.as_mut()
        else {
            return;
        };
        self.engine.tick();
        gfx.draw(self.engine.draw_list());
    }

    fn to_logical(&self, position: PhysicalPosition<f64>) -> (f64, f64) {
        let logical = position.to_logical::<f64>(self.scale_factor);
        (logical.x, logical.y)
    }

    fn mouse_input(&mut self, state: ElementState, button: MouseButton) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                press_primary(&mut self.engine, &mut self.double_click);
            }
            ElementState::Released => self.engine.pointer_released(),
        }
        self.request_input_redraw();
    }

    fn mouse_wheel(&mut self, delta: MouseScrollDelta) {
        /* Positive means scrolling down the content. */
        let delta = match delta {
            MouseScrollDelta::LineDelta(_, y) => -(y as f64) * SCROLL_LINE_HEIGHT,
            MouseScrollDelta::PixelDelta(position) => -self.to_logical(position).1,
        };
        self.engine.scrolled(delta);
    }
}

/// Left button press: a click burst, preceded by hearts when the press
/// completes a double click. Returns true for a double click.
fn press_primary(engine: &mut EffectsEngine, double_click: &mut DoubleClickDetector) -> bool {
    let pointer = engine.pointer();
    let is_double = pointer.has_position() && double_click.press(pointer.current);
    if is_double {
        log::debug!("press_primary: double click at {}", pointer.current);
        engine.double_click();
    }
    engine.pointer_pressed();
    is_double
}

impl<'a> ApplicationHandler<UserEvent> for Application<'a> {
    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::RequestRedraw => {
                if let Some(overlay) = self.overlay.as_ref() {
                    overlay.window.request_redraw();
                }
            }
            UserEvent::ToggleReducedMotion => {
                let reduced_motion = self.engine.toggle_reduced_motion();
                log::info!("user_event: reduced motion {reduced_motion}");
                self.sync_profile();
            }
            UserEvent::Terminate => {
                log::info!("user_event: terminating");
                event_loop.exit();
            }
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.overlay.is_some() {
            return;
        }
        log::info!("Application::resumed: creating effects window");
        if let Err(e) = self.create_overlay(event_loop) {
            log::error!("Application::resumed: effects disabled: {e}");
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            WindowEvent::Resized(size) => {
                if let Some(Overlay {
                    gfx: Some(gfx), ..
                }) = self.overlay.as_mut()
                {
                    gfx.resize(size.width, size.height);
                }
                let logical = size.to_logical::<f64>(self.scale_factor);
                self.engine
                    .resized(Extent::new(logical.width, logical.height));
                self.sync_profile();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("window_event: scale factor changed to {scale_factor}");
                self.scale_factor = scale_factor;
            }
            _ if !self.effects_enabled() => {}
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = self.to_logical(position);
                if let Err(e) = self.engine.pointer_moved(x, y) {
                    log::debug!("window_event: ignoring cursor position: {e}");
                }
                self.request_input_redraw();
            }
            WindowEvent::CursorEntered { .. } => {
                self.engine.pointer_entered();
            }
            WindowEvent::CursorLeft { .. } => {
                self.engine.pointer_left();
                self.double_click.reset();
                self.request_input_redraw();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_input(state, button);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.mouse_wheel(delta);
            }
            WindowEvent::Touch(touch) => {
                let (x, y) = self.to_logical(touch.location);
                let result = match touch.phase {
                    TouchPhase::Started => self.engine.touched(x, y),
                    TouchPhase::Moved => self.engine.touch_moved(x, y),
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        self.engine.touch_ended();
                        Ok(Vec::new())
                    }
                };
                if let Err(e) = result {
                    log::debug!("window_event: ignoring touch {:?}: {e}", touch.phase);
                }
                self.sync_profile();
                self.request_input_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => {
                        let _ = self.event_loop_proxy.send_event(UserEvent::Terminate);
                    }
                    Key::Character(ref c) if c.eq_ignore_ascii_case("r") => {
                        if let Err(e) = self
                            .event_loop_proxy
                            .send_event(UserEvent::ToggleReducedMotion)
                        {
                            log::error!("window_event: error sending reduced motion event: {e:?}");
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub enum UserEvent {
    RequestRedraw,
    /// Flips the reduced motion preference at runtime.
    ToggleReducedMotion,
    Terminate,
}

pub struct RenderEventLoop {
    pub event_loop: EventLoop<UserEvent>,
}

pub struct RenderLoopRunArgs {
    pub config: EffectsConfig,
    /// Initial window size in logical pixels.
    pub extent: Extent,
    /// Seed for the particle randomness, random when absent.
    pub seed: Option<u64>,
}

impl fmt::Display for RenderLoopRunArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extent: {}x{} reduced_motion: {} seed: {:?}",
            self.extent.width, self.extent.height, self.config.reduced_motion, self.seed
        )
    }
}

#[derive(Error, Debug)]
pub enum RenderLoopError {
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] EventLoopError),
}

impl RenderEventLoop {
    pub fn new() -> Result<Self, RenderLoopError> {
        let event_loop = EventLoop::<UserEvent>::with_user_event()
            .build()
            .map_err(|e| {
                log::error!("RenderEventLoop::new: failed to build event loop: {e:?}");
                RenderLoopError::EventLoopError(e)
            })?;
        Ok(Self { event_loop })
    }

    pub fn run(self, input: RenderLoopRunArgs) -> Result<(), RenderLoopError> {
        log::info!("Starting RenderEventLoop: {input}");

        let proxy = self.event_loop.create_proxy();
        let mut application = Application::new(input, proxy);
        self.event_loop.run_app(&mut application).map_err(|e| {
            log::error!("Error running application: {e:?}");
            RenderLoopError::EventLoopError(e)
        })
    }
}
