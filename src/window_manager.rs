use std::sync::Arc;
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

use crate::utils::geometry::Extent;

const WINDOW_TITLE: &str = "flourish";
/// Smallest window the effects are laid out for, in logical pixels.
const MIN_WINDOW_SIZE: f64 = 200.0;

fn get_window_attributes(extent: Extent) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(WINDOW_TITLE)
        .with_transparent(true)
        .with_inner_size(LogicalSize::new(
            extent.width.max(MIN_WINDOW_SIZE),
            extent.height.max(MIN_WINDOW_SIZE),
        ))
        .with_min_inner_size(LogicalSize::new(MIN_WINDOW_SIZE, MIN_WINDOW_SIZE))
}

#[derive(Error, Debug)]
pub enum WindowManagerError {
    #[error("Failed to create window: {0}")]
    WindowCreationError(String),
}

/// Creates the transparent window the effects are drawn in.
pub fn create_effects_window(
    event_loop: &ActiveEventLoop,
    extent: Extent,
) -> Result<Arc<Window>, WindowManagerError> {
    log::info!("create_effects_window: {extent:?}");
    let window = event_loop
        .create_window(get_window_attributes(extent))
        .map_err(|e| {
            log::error!("create_effects_window: {e:?}");
            WindowManagerError::WindowCreationError(e.to_string())
        })?;

    #[cfg(target_os = "macos")]
    {
        use winit::platform::macos::WindowExtMacOS;
        window.set_has_shadow(false);
    }

    Ok(Arc::new(window))
}

/// Logical size of the window content, the coordinate space of every effect.
pub fn logical_extent(window: &Window) -> Extent {
    let size = window.inner_size().to_logical::<f64>(window.scale_factor());
    Extent::new(size.width, size.height)
}
