use std::sync::Arc;

use iced::Renderer;
use iced::{Font, Pixels};
use iced_wgpu::{
    core::mouse,
    graphics::{Shell, Viewport},
    Engine,
};
use iced_winit::core::{renderer, time::Instant, window, Event, Theme};
use iced_winit::{
    core::Size,
    runtime::{user_interface, UserInterface},
    Clipboard,
};
use winit::window::Window;

#[path = "iced_canvas.rs"]
mod iced_canvas;
use iced_canvas::OverlaySurface;

use crate::graphics::draw::DrawCommand;

pub struct IcedRenderer {
    renderer: Renderer,
    viewport: Viewport,
    clipboard: Clipboard,
    overlay_surface: OverlaySurface,
    cursor: mouse::Cursor,
}

impl std::fmt::Debug for IcedRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IcedRenderer")
    }
}

impl IcedRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        adapter: &wgpu::Adapter,
        window: &Arc<Window>,
    ) -> Self {
        let engine = Engine::new(
            adapter,
            device.clone(),
            queue.clone(),
            format,
            None,
            Shell::headless(),
        );
        let physical_size = window.inner_size();
        let viewport = Viewport::with_physical_size(
            Size::new(physical_size.width, physical_size.height),
            window.scale_factor() as f32,
        );
        let clipboard = Clipboard::connect(window.clone());
        let wgpu_renderer = iced_wgpu::Renderer::new(engine, Font::default(), Pixels::from(16));
        let renderer = Renderer::Primary(wgpu_renderer);
        Self {
            renderer,
            viewport,
            clipboard,
            overlay_surface: OverlaySurface::new(),
            cursor: mouse::Cursor::Unavailable,
        }
    }

    /// Replaces the display list drawn on the next frame.
    pub fn set_commands(&mut self, commands: Vec<DrawCommand>) {
        self.overlay_surface.set_commands(commands);
    }

    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        self.viewport =
            Viewport::with_physical_size(Size::new(width, height), scale_factor as f32);
    }

    pub fn draw(&mut self, frame: &wgpu::SurfaceTexture, view: &wgpu::TextureView) {
        let mut interface = UserInterface::build(
            self.overlay_surface.view(),
            self.viewport.logical_size(),
            user_interface::Cache::default(),
            &mut self.renderer,
        );

        let _ = interface.update(
            &[Event::Window(
                window::Event::RedrawRequested(Instant::now()),
            )],
            self.cursor,
            &mut self.renderer,
            &mut self.clipboard,
            &mut Vec::new(),
        );
        interface.draw(
            &mut self.renderer,
            &Theme::Dark,
            &renderer::Style::default(),
            self.cursor,
        );

        let Renderer::Primary(wgpu_renderer) = &mut self.renderer else {
            log::error!("IcedRenderer::draw: expected the wgpu renderer");
            return;
        };
        wgpu_renderer.present(None, frame.texture.format(), view, &self.viewport);
    }
}
