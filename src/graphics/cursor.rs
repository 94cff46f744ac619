//! Custom cursor drawn on the overlay.
//!
//! The cursor is a dot that sits exactly on the pointer and a ring that eases
//! toward it. Pressing a button shrinks the ring.

use crate::config::{parse_hex_color, CursorConfig};
use crate::graphics::draw::{with_alpha, DrawCommand};
use crate::utils::geometry::Position;
use iced::{Color, Point};

/// Cursor display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    Normal,
    /// A mouse button is held down
    Pressed,
}

#[derive(Debug)]
pub struct CursorFollower {
    dot: Option<Position>,
    ring: Option<Position>,
    mode: CursorMode,
    /// Animated ring scale, eases toward the scale of the current mode.
    ring_scale: f32,
    /// Pointer is inside the window.
    inside: bool,
    /// False on touch devices.
    enabled: bool,
    /// Reduced motion: the ring sits on the dot instead of following it.
    snap: bool,
    dot_radius: f32,
    ring_radius: f32,
    ease: f64,
    pressed_scale: f32,
    color: Color,
}

impl CursorFollower {
    pub fn new(config: &CursorConfig) -> Self {
        let color = parse_hex_color(&config.color).unwrap_or_else(|| {
            log::warn!(
                "CursorFollower::new: invalid cursor color {}, using white",
                config.color
            );
            Color::WHITE
        });
        Self {
            dot: None,
            ring: None,
            mode: CursorMode::Normal,
            ring_scale: 1.0,
            inside: true,
            enabled: true,
            snap: false,
            dot_radius: config.dot_radius,
            ring_radius: config.ring_radius,
            ease: config.ease.clamp(0.0, 1.0),
            pressed_scale: config.pressed_scale,
            color,
        }
    }

    /// Moves the dot. The first position also places the ring.
    pub fn set_position(&mut self, position: Option<Position>) {
        self.dot = position;
        match position {
            Some(position) if self.ring.is_none() || self.snap => self.ring = Some(position),
            Some(_) => {}
            None => self.ring = None,
        }
    }

    pub fn set_mode(&mut self, mode: CursorMode) {
        self.mode = mode;
        if self.snap {
            self.ring_scale = self.target_scale();
        }
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    pub fn set_inside(&mut self, inside: bool) {
        self.inside = inside;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_snap(&mut self, snap: bool) {
        self.snap = snap;
        if snap {
            self.ring = self.dot;
            self.ring_scale = self.target_scale();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.enabled && self.inside && self.dot.is_some()
    }

    #[cfg(test)]
    pub fn ring_position(&self) -> Option<Position> {
        self.ring
    }

    pub fn ring_scale(&self) -> f32 {
        self.ring_scale
    }

    fn target_scale(&self) -> f32 {
        match self.mode {
            CursorMode::Normal => 1.0,
            CursorMode::Pressed => self.pressed_scale,
        }
    }

    /// Advances the ring by `frames` reference frames.
    pub fn update(&mut self, frames: f32) {
        let (Some(dot), Some(ring)) = (self.dot, self.ring) else {
            return;
        };

        if self.snap {
            self.ring = Some(dot);
            self.ring_scale = self.target_scale();
            return;
        }

        let t = 1.0 - (1.0 - self.ease).powf(frames as f64);
        self.ring = Some(ring.lerp(&dot, t));
        self.ring_scale += (self.target_scale() - self.ring_scale) * t as f32;
    }

    pub fn draw(&self, out: &mut Vec<DrawCommand>) {
        if !self.is_visible() {
            return;
        }
        let (Some(dot), Some(ring)) = (self.dot, self.ring) else {
            return;
        };

        out.push(DrawCommand::Ring {
            center: Point::new(ring.x as f32, ring.y as f32),
            radius: self.ring_radius * self.ring_scale,
            width: 1.5,
            color: with_alpha(self.color, 0.6),
        });
        out.push(DrawCommand::Circle {
            center: Point::new(dot.x as f32, dot.y as f32),
            radius: self.dot_radius,
            color: self.color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower() -> CursorFollower {
        CursorFollower::new(&CursorConfig::default())
    }

    fn drawn(follower: &CursorFollower) -> Vec<DrawCommand> {
        let mut out = Vec::new();
        follower.draw(&mut out);
        out
    }

    #[test]
    fn test_hidden_before_first_position() {
        let mut follower = follower();
        assert!(!follower.is_visible());
        assert!(drawn(&follower).is_empty());

        follower.set_position(Some(Position::new(10.0, 10.0)));
        assert!(follower.is_visible());
        assert_eq!(drawn(&follower).len(), 2);
    }

    #[test]
    fn test_ring_converges_to_pointer() {
        let mut follower = follower();
        follower.set_position(Some(Position::new(0.0, 0.0)));
        follower.set_position(Some(Position::new(100.0, 0.0)));

        let target = Position::new(100.0, 0.0);
        let mut last = follower.ring_position().unwrap().distance(&target);
        assert_eq!(last, 100.0);
        for _ in 0..60 {
            follower.update(1.0);
            let distance = follower.ring_position().unwrap().distance(&target);
            assert!(distance < last);
            last = distance;
        }
        assert!(last < 0.01);
    }

    #[test]
    fn test_pressed_shrinks_ring() {
        let mut follower = follower();
        follower.set_position(Some(Position::new(50.0, 50.0)));
        follower.set_mode(CursorMode::Pressed);
        for _ in 0..60 {
            follower.update(1.0);
        }
        assert!((follower.ring_scale() - 0.7).abs() < 1e-3);

        follower.set_mode(CursorMode::Normal);
        for _ in 0..60 {
            follower.update(1.0);
        }
        assert!((follower.ring_scale() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_hidden_when_disabled_or_outside() {
        let mut follower = follower();
        follower.set_position(Some(Position::new(50.0, 50.0)));

        follower.set_enabled(false);
        assert!(drawn(&follower).is_empty());
        follower.set_enabled(true);

        follower.set_inside(false);
        assert!(drawn(&follower).is_empty());
        follower.set_inside(true);
        assert!(!drawn(&follower).is_empty());
    }

    #[test]
    fn test_snap_keeps_ring_on_dot() {
        let mut follower = follower();
        follower.set_snap(true);
        follower.set_position(Some(Position::new(10.0, 10.0)));
        follower.set_position(Some(Position::new(300.0, 200.0)));
        assert_eq!(follower.ring_position(), Some(Position::new(300.0, 200.0)));

        follower.set_mode(CursorMode::Pressed);
        assert_eq!(follower.ring_scale(), 0.7);
    }
}
