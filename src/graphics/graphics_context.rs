//! Graphics context and frame scheduling for the effects overlay.
//!
//! This module owns the wgpu surface of the transparent overlay window and the
//! redraw thread that paces frames. Shapes are rasterized by iced on top of a
//! cleared, fully transparent frame.

use crate::graphics::draw::DrawCommand;
use crate::UserEvent;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use winit::event_loop::EventLoopProxy;
use winit::window::Window;

#[path = "iced_renderer.rs"]
pub mod iced_renderer;
use iced_renderer::IcedRenderer;

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub(crate) enum RedrawThreadCommands {
    /// Changes the pacing, effective from the next frame.
    SetInterval(Duration),
    Pause,
    Resume,
    Stop,
}

/// Calls `request_redraw` once per `interval` until stopped.
///
/// `request_redraw` returns false when nobody listens anymore, which ends the
/// thread like a `Stop` command does.
fn redraw_thread<F>(receiver: Receiver<RedrawThreadCommands>, interval: Duration, mut request_redraw: F)
where
    F: FnMut() -> bool,
{
    let mut interval = interval.max(MIN_FRAME_INTERVAL);
    let mut paused = false;
    let mut next_frame = Instant::now() + interval;
    loop {
        let command = if paused {
            match receiver.recv() {
                Ok(command) => Some(command),
                Err(e) => {
                    log::debug!("redraw_thread: channel closed: {e:?}");
                    break;
                }
            }
        } else {
            let timeout = next_frame.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(timeout) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("redraw_thread: channel disconnected");
                    break;
                }
            }
        };

        match command {
            None => {
                if !request_redraw() {
                    log::info!("redraw_thread: event loop is gone, stopping");
                    break;
                }
                next_frame += interval;
                /* Skip missed frames instead of bursting to catch up. */
                let now = Instant::now();
                if next_frame < now {
                    next_frame = now + interval;
                }
            }
            Some(RedrawThreadCommands::Stop) => break,
            Some(RedrawThreadCommands::Pause) => {
                log::debug!("redraw_thread: paused");
                paused = true;
            }
            Some(RedrawThreadCommands::Resume) => {
                if paused {
                    log::debug!("redraw_thread: resumed");
                    paused = false;
                    next_frame = Instant::now() + interval;
                }
            }
            Some(RedrawThreadCommands::SetInterval(new_interval)) => {
                interval = new_interval.max(MIN_FRAME_INTERVAL);
                next_frame = Instant::now() + interval;
                log::debug!("redraw_thread: interval set to {interval:?}");
            }
        }
    }
}

/// Errors that can occur during overlay graphics operations.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Failed to create a graphics surface for rendering.
    #[error("Failed to create graphics surface for rendering")]
    SurfaceCreationError,

    /// Failed to request a graphics adapter from the system.
    #[error("Failed to request graphics adapter")]
    AdapterRequestError,

    /// Failed to request a graphics device from the adapter.
    #[error("Failed to request graphics device")]
    DeviceRequestError,
}

pub type OverlayResult<T = ()> = std::result::Result<T, OverlayError>;

/// GPU state of the overlay window.
///
/// Owns the wgpu surface, device and queue, the iced renderer drawing the
/// effects, and the redraw thread that posts [`UserEvent::RequestRedraw`].
#[derive(Debug)]
pub struct GraphicsContext<'a> {
    /// wgpu surface for rendering to the window
    surface: wgpu::Surface<'a>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    window: Arc<Window>,

    /// Renderer for iced graphics
    iced_renderer: IcedRenderer,

    /// Thread that controls rendering cadence
    redraw_thread: Option<JoinHandle<()>>,
    redraw_thread_sender: Sender<RedrawThreadCommands>,
}

impl<'a> GraphicsContext<'a> {
    /// Creates the surface, device and renderer for `window_arc` and starts the
    /// redraw thread at `frame_interval`.
    ///
    /// # Errors
    ///
    /// - `OverlayError::SurfaceCreationError` - the surface could not be created
    ///   or reports no usable format
    /// - `OverlayError::AdapterRequestError` - no suitable GPU adapter found
    /// - `OverlayError::DeviceRequestError` - failed to create the logical device
    pub fn new(
        window_arc: Arc<Window>,
        frame_interval: Duration,
        event_loop_proxy: EventLoopProxy<UserEvent>,
    ) -> OverlayResult<Self> {
        let size = window_arc.inner_size();
        log::info!(
            "GraphicsContext::new: window size: {size:?}, scale: {}",
            window_arc.scale_factor()
        );
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window_arc.clone()).map_err(|e| {
            log::error!("GraphicsContext::new: {e:?}");
            OverlayError::SurfaceCreationError
        })?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            log::error!("GraphicsContext::new request_adapter: {e:?}");
            OverlayError::AdapterRequestError
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            label: None,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
        }))
        .map_err(|e| {
            log::error!("GraphicsContext::new request_device: {e:?}");
            OverlayError::DeviceRequestError
        })?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities.formats.first().copied().ok_or_else(|| {
            log::error!("GraphicsContext::new: surface reports no formats");
            OverlayError::SurfaceCreationError
        })?;

        /* Premultiplied alpha keeps the window background see-through. */
        let alpha_modes = surface_capabilities.alpha_modes;
        let alpha_mode = alpha_modes
            .iter()
            .find(|mode| {
                **mode == wgpu::CompositeAlphaMode::PreMultiplied
                    || **mode == wgpu::CompositeAlphaMode::PostMultiplied
            })
            .or_else(|| alpha_modes.first())
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let iced_renderer = IcedRenderer::new(&device, &queue, format, &adapter, &window_arc);

        let (sender, receiver) = std::sync::mpsc::channel();
        let redraw_thread = Some(std::thread::spawn(move || {
            redraw_thread(receiver, frame_interval, move || {
                match event_loop_proxy.send_event(UserEvent::RequestRedraw) {
                    Ok(()) => true,
                    Err(e) => {
                        log::error!("redraw_thread: error sending redraw event: {e:?}");
                        false
                    }
                }
            });
        }));

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            window: window_arc,
            iced_renderer,
            redraw_thread,
            redraw_thread_sender: sender,
        })
    }

    fn send_command(&self, command: RedrawThreadCommands) {
        if let Err(e) = self.redraw_thread_sender.send(command) {
            log::error!("GraphicsContext::send_command: redraw thread is gone: {e:?}");
        }
    }

    pub fn set_frame_interval(&self, interval: Duration) {
        self.send_command(RedrawThreadCommands::SetInterval(interval));
    }

    pub fn pause(&self) {
        self.send_command(RedrawThreadCommands::Pause);
    }

    pub fn resume(&self) {
        self.send_command(RedrawThreadCommands::Resume);
    }

    /// Reconfigures the surface for a new physical size. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("GraphicsContext::resize: ignoring empty size {width}x{height}");
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.iced_renderer
            .resize(width, height, self.window.scale_factor());
    }

    /// Renders `commands` on a cleared transparent frame and presents it.
    ///
    /// A frame that cannot be acquired is skipped; the next one retries.
    pub fn draw(&mut self, commands: Vec<DrawCommand>) {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::warn!("GraphicsContext::draw: surface outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(e) => {
                log::error!("GraphicsContext::draw: failed to get current texture: {e:?}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        drop(render_pass);
        self.queue.submit(std::iter::once(encoder.finish()));

        self.iced_renderer.set_commands(commands);
        self.iced_renderer.draw(&output, &view);

        self.window.pre_present_notify();
        output.present();
    }
}

impl Drop for GraphicsContext<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.redraw_thread.take() {
            let _ = self.redraw_thread_sender.send(RedrawThreadCommands::Stop);
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn spawn_counter(
        interval: Duration,
    ) -> (
        Sender<RedrawThreadCommands>,
        Arc<AtomicUsize>,
        JoinHandle<()>,
    ) {
        let (sender, receiver) = std::sync::mpsc::channel();
        let count = Arc::new(AtomicUsize::new(0));
        let thread_count = count.clone();
        let handle = std::thread::spawn(move || {
            redraw_thread(receiver, interval, move || {
                thread_count.fetch_add(1, Ordering::SeqCst);
                true
            });
        });
        (sender, count, handle)
    }

    #[test]
    fn test_redraw_thread_ticks_until_stopped() {
        let (sender, count, handle) = spawn_counter(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(100));
        sender.send(RedrawThreadCommands::Stop).unwrap();
        handle.join().unwrap();

        let ticks = count.load(Ordering::SeqCst);
        assert!(ticks > 0);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), ticks);
    }

    #[test]
    fn test_pause_and_resume() {
        let (sender, count, handle) = spawn_counter(Duration::from_millis(5));
        sender.send(RedrawThreadCommands::Pause).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let paused = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), paused);

        sender.send(RedrawThreadCommands::Resume).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(count.load(Ordering::SeqCst) > paused);

        sender.send(RedrawThreadCommands::Stop).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_set_interval_slows_ticks() {
        let (sender, count, handle) = spawn_counter(Duration::from_millis(5));
        sender
            .send(RedrawThreadCommands::SetInterval(Duration::from_secs(10)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let before = count.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), before);

        sender.send(RedrawThreadCommands::Stop).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_thread_ends_when_listener_is_gone() {
        let (_sender, receiver) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            redraw_thread(receiver, Duration::from_millis(1), || false);
        });
        handle.join().unwrap();
    }

    #[test]
    fn test_thread_ends_when_channel_closes() {
        let (sender, receiver) = std::sync::mpsc::channel::<RedrawThreadCommands>();
        let handle = std::thread::spawn(move || {
            redraw_thread(receiver, Duration::from_secs(10), || true);
        });
        drop(sender);
        handle.join().unwrap();
    }
}
