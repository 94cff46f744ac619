//! Effect coordination.
//!
//! [`EffectsEngine`] owns every piece of effect state: the pointer tracker,
//! the emitter, the particle layers, the cursor follower and the device
//! flags. Input handlers feed it events, the redraw handler calls
//! [`EffectsEngine::tick`] followed by [`EffectsEngine::draw_list`].

use super::emitter::{EffectKind, EmitContext, EmitOptions, Emitter};
use super::particle::ParticleId;
use super::pool::ParticlePool;
use super::update::{update_pool, FrameContext, REFERENCE_FPS};
use crate::config::EffectsConfig;
use crate::device::{DeviceAdapter, DeviceFlags, QualityProfile, QualityTier};
use crate::graphics::cursor::{CursorFollower, CursorMode};
use crate::graphics::draw::{draw_particles, DrawCommand};
use crate::input::pointer::{PositionTracker, TrackerError, TrackerSnapshot};
use crate::utils::clock::{Clock, FrameClock};
use crate::utils::geometry::{Extent, Position};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Particle layers, drawn back to front in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Ambient,
    Trail,
    Click,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Ambient, Layer::Trail, Layer::Click];
}

pub struct EffectsEngine {
    tracker: PositionTracker,
    emitter: Emitter,
    /// Created on first emission into the layer.
    layers: BTreeMap<Layer, ParticlePool>,
    cursor: CursorFollower,
    device: DeviceAdapter,
    profile: QualityProfile,
    frame_clock: FrameClock,
    viewport: Extent,
    trail_spacing: f64,
    ambient_interval: Duration,
    last_ambient: Option<Instant>,
    /// Position of the last trail emission, cleared when the pointer leaves.
    last_trail: Option<Position>,
}

impl EffectsEngine {
    pub fn new(
        config: EffectsConfig,
        viewport: Extent,
        clock: Arc<dyn Clock>,
        seed: Option<u64>,
    ) -> Self {
        let device = DeviceAdapter::new(viewport, config.mobile_breakpoint, config.reduced_motion);
        let profile = QualityProfile::for_flags(device.flags(), &config);
        let mut cursor = CursorFollower::new(&config.cursor);
        cursor.set_enabled(profile.show_cursor);
        cursor.set_snap(device.flags().reduced_motion);

        log::info!(
            "EffectsEngine::new: viewport {viewport:?} profile {:?}",
            profile.tier
        );

        Self {
            tracker: PositionTracker::new(viewport),
            trail_spacing: config.trail.spacing.max(0.0),
            ambient_interval: Duration::from_millis(config.ambient.interval_ms.max(1)),
            emitter: Emitter::new(config, seed),
            layers: BTreeMap::new(),
            cursor,
            device,
            profile,
            frame_clock: FrameClock::new(clock),
            viewport,
            last_ambient: None,
            last_trail: None,
        }
    }

    pub fn profile(&self) -> QualityProfile {
        self.profile
    }

    pub fn flags(&self) -> DeviceFlags {
        self.device.flags()
    }

    pub fn frame_interval(&self) -> Duration {
        self.profile.frame_interval
    }

    pub fn viewport(&self) -> Extent {
        self.viewport
    }

    pub fn pointer(&self) -> TrackerSnapshot {
        self.tracker.current()
    }

    pub fn cursor(&self) -> &CursorFollower {
        &self.cursor
    }

    /// Number of live particles in `layer`, zero when the layer does not exist yet.
    pub fn layer_len(&self, layer: Layer) -> usize {
        self.layers.get(&layer).map_or(0, ParticlePool::len)
    }

    pub fn particle_count(&self) -> usize {
        self.layers.values().map(ParticlePool::len).sum()
    }

    #[cfg(test)]
    pub fn has_layer(&self, layer: Layer) -> bool {
        self.layers.contains_key(&layer)
    }

    fn emit_context(&self) -> EmitContext {
        EmitContext {
            viewport: self.viewport,
            flags: self.device.flags(),
        }
    }

    fn emit(
        &mut self,
        layer: Layer,
        kind: EffectKind,
        position: Position,
        options: &EmitOptions,
    ) -> Vec<ParticleId> {
        if !self.profile.emission_enabled {
            return Vec::new();
        }
        let ctx = self.emit_context();
        let capacity = self.profile.capacity;
        let pool = self.layers.entry(layer).or_insert_with(|| {
            log::debug!("EffectsEngine::emit: creating layer {layer:?} capacity {capacity}");
            ParticlePool::new(capacity)
        });
        self.emitter.emit(pool, kind, position, options, &ctx)
    }

    /// Emits `kind` into `layer` at the current pointer position.
    pub fn emit_at_pointer(&mut self, layer: Layer, kind: EffectKind) -> Vec<ParticleId> {
        let snapshot = self.tracker.current();
        if !snapshot.has_position() {
            log::debug!("EffectsEngine::emit_at_pointer: no pointer position yet");
            return Vec::new();
        }
        self.emit(layer, kind, snapshot.current, &EmitOptions::default())
    }

    pub fn pointer_moved(&mut self, x: f64, y: f64) -> Result<TrackerSnapshot, TrackerError> {
        let snapshot = self.tracker.update(x, y)?;
        self.cursor.set_inside(true);
        self.cursor.set_position(Some(snapshot.current));

        let spaced = self
            .last_trail
            .is_none_or(|last| last.distance(&snapshot.current) >= self.trail_spacing);
        if spaced && !self.emit_at_pointer(Layer::Trail, EffectKind::Trail).is_empty() {
            self.last_trail = Some(snapshot.current);
        }
        Ok(snapshot)
    }

    pub fn pointer_pressed(&mut self) -> Vec<ParticleId> {
        self.cursor.set_mode(CursorMode::Pressed);
        self.emit_at_pointer(Layer::Click, EffectKind::Click)
    }

    pub fn pointer_released(&mut self) {
        self.cursor.set_mode(CursorMode::Normal);
    }

    pub fn double_click(&mut self) -> Vec<ParticleId> {
        self.emit_at_pointer(Layer::Click, EffectKind::Heart)
    }

    pub fn pointer_entered(&mut self) {
        self.cursor.set_inside(true);
    }

    pub fn pointer_left(&mut self) {
        self.cursor.set_inside(false);
        self.tracker.detach();
        self.last_trail = None;
    }

    /// Scroll sparkles spawn at the pointer, or at the bottom center of the
    /// viewport when the pointer was never seen.
    pub fn scrolled(&mut self, delta: f64) -> Vec<ParticleId> {
        let snapshot = self.tracker.current();
        let position = if snapshot.has_position() {
            snapshot.current
        } else {
            Position::new(self.viewport.width / 2.0, self.viewport.height)
        };
        self.emit(
            Layer::Ambient,
            EffectKind::Scroll { delta },
            position,
            &EmitOptions::default(),
        )
    }

    /// A tap: marks the device as touch capable and bursts at the touch point.
    pub fn touched(&mut self, x: f64, y: f64) -> Result<Vec<ParticleId>, TrackerError> {
        if let Some(flags) = self.device.on_touch() {
            self.apply_flags(flags);
        }
        let snapshot = self.tracker.update(x, y)?;
        self.cursor.set_position(Some(snapshot.current));
        Ok(self.emit(
            Layer::Click,
            EffectKind::Click,
            snapshot.current,
            &EmitOptions::default(),
        ))
    }

    /// A finger dragging across the window leaves sparkles instead of bubbles.
    pub fn touch_moved(&mut self, x: f64, y: f64) -> Result<Vec<ParticleId>, TrackerError> {
        let snapshot = self.tracker.update(x, y)?;
        self.cursor.set_position(Some(snapshot.current));

        let spaced = self
            .last_trail
            .is_none_or(|last| last.distance(&snapshot.current) >= self.trail_spacing);
        if !spaced {
            return Ok(Vec::new());
        }
        let ids = self.emit(
            Layer::Trail,
            EffectKind::Sparkle,
            snapshot.current,
            &EmitOptions::default(),
        );
        if !ids.is_empty() {
            self.last_trail = Some(snapshot.current);
        }
        Ok(ids)
    }

    pub fn touch_ended(&mut self) {
        self.tracker.detach();
        self.last_trail = None;
    }

    pub fn resized(&mut self, viewport: Extent) {
        log::debug!("EffectsEngine::resized: {viewport:?}");
        self.viewport = viewport;
        self.tracker.set_viewport(viewport);
        if let Some(flags) = self.device.on_resize(viewport) {
            self.apply_flags(flags);
        }
    }

    /// Returns true when the preference changed the active flags.
    pub fn set_reduced_motion(&mut self, reduced_motion: bool) -> bool {
        match self.device.set_reduced_motion(reduced_motion) {
            Some(flags) => {
                self.apply_flags(flags);
                true
            }
            None => false,
        }
    }

    pub fn toggle_reduced_motion(&mut self) -> bool {
        let reduced_motion = !self.device.flags().reduced_motion;
        self.set_reduced_motion(reduced_motion);
        reduced_motion
    }

    fn apply_flags(&mut self, flags: DeviceFlags) {
        let profile = QualityProfile::for_flags(flags, self.emitter.config());
        log::info!(
            "EffectsEngine::apply_flags: {:?} -> {:?}",
            self.profile.tier,
            profile.tier
        );

        if profile.capacity != self.profile.capacity {
            for pool in self.layers.values_mut() {
                pool.set_capacity(profile.capacity);
            }
        }
        if flags.reduced_motion {
            for pool in self.layers.values_mut() {
                pool.clear();
            }
            self.last_ambient = None;
        }

        /* The scheduler was paused, the gap since the last frame is not motion. */
        if self.profile.tier == QualityTier::Still && profile.tier != QualityTier::Still {
            self.frame_clock.reset();
        }

        self.cursor.set_enabled(profile.show_cursor);
        self.cursor.set_snap(flags.reduced_motion);
        self.profile = profile;
    }

    /// Advances all effects by one frame and returns the step in seconds.
    ///
    /// Order: tracker validation, ambient top up, layer updates, cursor.
    pub fn tick(&mut self) -> f32 {
        let dt = self.frame_clock.tick();

        if self.tracker.validate().is_err() {
            let snapshot = self.tracker.current();
            let position = snapshot.has_position().then_some(snapshot.current);
            self.cursor.set_position(position);
        }

        self.tick_ambient();

        let ctx = FrameContext::new(dt, self.viewport);
        for layer in Layer::ALL {
            if let Some(pool) = self.layers.get_mut(&layer) {
                let removed = update_pool(pool, &ctx);
                if removed > 0 {
                    log::trace!("EffectsEngine::tick: {layer:?} expired {removed}");
                }
            }
        }

        self.cursor.update(dt * REFERENCE_FPS);
        dt
    }

    fn tick_ambient(&mut self) {
        if self.profile.ambient_count == 0 {
            return;
        }
        let now = self.frame_clock.now();
        let due = self
            .last_ambient
            .is_none_or(|last| now.duration_since(last) >= self.ambient_interval);
        if !due {
            return;
        }
        self.last_ambient = Some(now);

        if self.layer_len(Layer::Ambient) >= self.profile.ambient_count {
            return;
        }
        let ctx = self.emit_context();
        let capacity = self.profile.capacity;
        let pool = self
            .layers
            .entry(Layer::Ambient)
            .or_insert_with(|| ParticlePool::new(capacity));
        self.emitter.emit_ambient(pool, &ctx);
    }

    /// Shapes of every live particle back to front, with the cursor on top.
    pub fn draw_list(&self) -> Vec<DrawCommand> {
        let mut commands = Vec::with_capacity(self.particle_count() + 2);
        for pool in self.layers.values() {
            draw_particles(pool.iter(), &mut commands);
        }
        self.cursor.draw(&mut commands);
        commands
    }
}
