//! Particle emission.
//!
//! One emitter creates the particles of every effect. Emission never blocks and
//! never fails loudly: an invalid position or an active reduced motion
//! preference simply produces no particles.

use super::particle::{Particle, ParticleId, ParticleKind};
use super::pool::ParticlePool;
use crate::config::EffectsConfig;
use crate::device::DeviceFlags;
use crate::utils::geometry::{Extent, Position, Velocity};
use iced::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    Trail,
    Sparkle,
    /// Radial sparkles plus one expanding ring and one glow.
    Click,
    Heart,
    Ambient,
    /// Signed scroll distance in logical pixels.
    Scroll { delta: f64 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    /// Overrides the configured particle count of the effect.
    pub count: Option<usize>,
    pub color: Option<Color>,
}

#[cfg(test)]
impl EmitOptions {
    pub fn with_count(count: usize) -> Self {
        Self {
            count: Some(count),
            ..Default::default()
        }
    }
}

/// Read-only state the emitter consults for every emission.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext {
    pub viewport: Extent,
    pub flags: DeviceFlags,
}

#[derive(Debug)]
pub struct Emitter {
    config: EffectsConfig,
    palette: Vec<Color>,
    accent: Color,
    rng: StdRng,
}

impl Emitter {
    pub fn new(config: EffectsConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut palette = config.palette_colors();
        if palette.is_empty() {
            palette.push(Color::WHITE);
        }
        let accent = crate::config::parse_hex_color(&config.cursor.color).unwrap_or(palette[0]);
        Self {
            config,
            palette,
            accent,
            rng,
        }
    }

    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    /// Creates the particles of `kind` at `position` and appends them to `pool`.
    ///
    /// Returns the ids of the inserted particles, empty when nothing was emitted.
    pub fn emit(
        &mut self,
        pool: &mut ParticlePool,
        kind: EffectKind,
        position: Position,
        options: &EmitOptions,
        ctx: &EmitContext,
    ) -> Vec<ParticleId> {
        if ctx.flags.reduced_motion {
            log::trace!("Emitter::emit: reduced motion active, skipping {kind:?}");
            return Vec::new();
        }
        if !position.is_within(ctx.viewport) {
            log::warn!(
                "Emitter::emit: invalid position {position} for {kind:?} viewport {:?}",
                ctx.viewport
            );
            return Vec::new();
        }

        let particles = self.build(kind, position, options, ctx.viewport, pool.capacity());
        log::trace!(
            "Emitter::emit: {kind:?} at {position} -> {} particles",
            particles.len()
        );

        particles
            .into_iter()
            .map(|particle| pool.push(particle).0)
            .collect()
    }

    /// Emits one ambient sparkle at a random position inside the viewport.
    pub fn emit_ambient(&mut self, pool: &mut ParticlePool, ctx: &EmitContext) -> Vec<ParticleId> {
        if ctx.viewport.is_empty() {
            return Vec::new();
        }
        let position = Position::new(
            self.rng.gen_range(0.0..=ctx.viewport.width),
            self.rng.gen_range(0.0..=ctx.viewport.height),
        );
        self.emit(
            pool,
            EffectKind::Ambient,
            position,
            &EmitOptions::default(),
            ctx,
        )
    }

    fn build(
        &mut self,
        kind: EffectKind,
        position: Position,
        options: &EmitOptions,
        viewport: Extent,
        limit: usize,
    ) -> Vec<Particle> {
        /* More particles than the pool holds would be evicted before their first frame. */
        let count_or = |default: usize| options.count.unwrap_or(default).min(limit);
        match kind {
            EffectKind::Trail => {
                let count = count_or(1);
                (0..count)
                    .map(|_| self.trail(position, options.color))
                    .collect()
            }
            EffectKind::Sparkle => {
                let count = count_or(1);
                let (speed_bounds, max_life) = (self.config.sparkle.speed, self.config.sparkle.max_life);
                (0..count)
                    .map(|_| {
                        let angle = self.rng.gen_range(0.0..TAU);
                        let speed = speed_bounds.sample(&mut self.rng);
                        let velocity = polar(angle, speed, -1.0);
                        self.sparkle(position, velocity, max_life, options.color)
                    })
                    .collect()
            }
            EffectKind::Click => {
                let count = count_or(self.config.click.ring_particles);
                self.click(position, count, options.color)
            }
            EffectKind::Heart => {
                let count = count_or(self.config.heart.count);
                (0..count)
                    .map(|_| self.heart(position, options.color))
                    .collect()
            }
            EffectKind::Ambient => {
                let count = count_or(1);
                (0..count)
                    .map(|_| self.ambient(position, options.color))
                    .collect()
            }
            EffectKind::Scroll { delta } => {
                let count = count_or(self.scroll_count(delta));
                /* Sparkles drift against the scroll direction. */
                let direction = if delta > 0.0 { -1.0 } else { 1.0 };
                let (speed_bounds, max_life) = (self.config.sparkle.speed, self.config.sparkle.max_life);
                (0..count)
                    .map(|_| {
                        let speed = speed_bounds.sample(&mut self.rng);
                        let dx = self.rng.gen_range(-0.5..=0.5);
                        let velocity = Velocity::new(dx, direction * speed as f64);
                        let origin = Position::new(
                            position.x + self.rng.gen_range(-20.0..=20.0),
                            position.y.min(viewport.height.max(0.0)),
                        );
                        self.sparkle(origin, velocity, max_life, options.color)
                    })
                    .collect()
            }
        }
    }

    fn scroll_count(&self, delta: f64) -> usize {
        let scroll = &self.config.scroll;
        if delta == 0.0 || !delta.is_finite() {
            return 0;
        }
        let per = scroll.pixels_per_sparkle.max(1.0);
        let count = (delta.abs() / per).ceil() as usize;
        count.clamp(1, scroll.max_per_event.max(1))
    }

    fn pick_color(&mut self, color: Option<Color>) -> Color {
        color.unwrap_or_else(|| self.palette[self.rng.gen_range(0..self.palette.len())])
    }

    fn trail(&mut self, position: Position, color: Option<Color>) -> Particle {
        let trail = &self.config.trail;
        let (size_bounds, speed_bounds, drag, max_life) =
            (trail.size, trail.speed, trail.drag, trail.max_life);
        let angle = self.rng.gen_range(0.0..TAU);
        let speed = speed_bounds.sample(&mut self.rng);
        let size = size_bounds.sample(&mut self.rng);
        let color = self.pick_color(color);
        Particle::new(
            ParticleKind::Trail { drag },
            position,
            polar(angle, speed, 0.0),
            size,
            color,
            max_life,
        )
    }

    fn sparkle(
        &mut self,
        position: Position,
        velocity: Velocity,
        max_life: f32,
        color: Option<Color>,
    ) -> Particle {
        let sparkle = self.config.sparkle.clone();
        let size = sparkle.size.sample(&mut self.rng);
        let color = self.pick_color(color);
        let twinkle_phase = self.rng.gen_range(0.0..TAU);
        let twinkle_speed = sparkle.twinkle_speed.sample(&mut self.rng);
        let rotation = self.rng.gen_range(0.0..TAU);
        let rotation_speed = sparkle.rotation_speed.sample(&mut self.rng);
        Particle::new(
            ParticleKind::Sparkle {
                points: sparkle.points.max(3),
                twinkle_phase,
                twinkle_speed,
                gravity: sparkle.gravity,
                bounce: sparkle.bounce,
            },
            position,
            velocity,
            size,
            color,
            max_life,
        )
        .with_rotation(rotation, rotation_speed)
    }

    fn click(&mut self, position: Position, count: usize, color: Option<Color>) -> Vec<Particle> {
        let click = self.config.click.clone();
        let accent = color.unwrap_or(self.accent);
        let mut particles = Vec::with_capacity(count + 2);

        particles.push(Particle::new(
            ParticleKind::Glow {
                radius: click.glow_radius,
                pulse_phase: 0.0,
                pulse_speed: click.glow_pulse_speed,
            },
            position,
            Velocity::default(),
            click.glow_radius,
            accent,
            click.max_life,
        ));
        particles.push(Particle::new(
            ParticleKind::Ring {
                radius: click.ring_radius,
                start_radius: click.ring_radius,
                growth: click.ring_growth,
                stroke_width: click.ring_stroke,
            },
            position,
            Velocity::default(),
            click.ring_radius,
            accent,
            click.max_life,
        ));

        for i in 0..count {
            let jitter = self.rng.gen_range(-0.15..=0.15);
            let angle = TAU * i as f32 / count as f32 + jitter;
            let speed = click.speed.sample(&mut self.rng);
            let mut sparkle =
                self.sparkle(position, polar(angle, speed, 0.0), click.max_life, color);
            /* Click sparkles spread out evenly instead of falling. */
            if let ParticleKind::Sparkle { gravity, .. } = &mut sparkle.kind {
                *gravity = 0.0;
            }
            particles.push(sparkle);
        }

        particles
    }

    fn heart(&mut self, position: Position, color: Option<Color>) -> Particle {
        let heart = self.config.heart.clone();
        let spread = heart.spread.abs() as f64;
        let dx = if spread > 0.0 {
            self.rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        let rise = heart.rise as f64 * self.rng.gen_range(0.8..=1.2);
        let target = position.offset(dx, -rise);
        let size = heart.size.sample(&mut self.rng);
        let color = self.pick_color(color);
        let tilt = self.rng.gen_range(-0.3..=0.3);
        Particle::new(
            ParticleKind::Heart {
                target,
                ease: heart.ease,
            },
            position,
            Velocity::default(),
            size,
            color,
            heart.max_life,
        )
        .with_rotation(tilt, 0.0)
    }

    fn ambient(&mut self, position: Position, color: Option<Color>) -> Particle {
        let ambient = self.config.ambient.clone();
        let velocity = Velocity::new(
            ambient.drift.sample(&mut self.rng) as f64,
            ambient.drift.sample(&mut self.rng) as f64,
        );
        let size = ambient.size.sample(&mut self.rng);
        let color = self.pick_color(color);
        let twinkle_phase = self.rng.gen_range(0.0..TAU);
        Particle::new(
            ParticleKind::Sparkle {
                points: 4,
                twinkle_phase,
                twinkle_speed: 0.05,
                gravity: 0.0,
                bounce: 0.0,
            },
            position,
            velocity,
            size,
            color,
            ambient.max_life,
        )
    }
}

/// Velocity from an angle and speed, with an extra vertical bias.
fn polar(angle: f32, speed: f32, lift: f32) -> Velocity {
    Velocity::new(
        (angle.cos() * speed) as f64,
        (angle.sin() * speed + lift) as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::particle::ParticleTag;

    const VIEWPORT: Extent = Extent {
        width: 800.0,
        height: 600.0,
    };

    fn emitter() -> Emitter {
        Emitter::new(EffectsConfig::default(), Some(42))
    }

    fn ctx() -> EmitContext {
        EmitContext {
            viewport: VIEWPORT,
            flags: DeviceFlags::default(),
        }
    }

    fn count(pool: &ParticlePool, tag: ParticleTag) -> usize {
        pool.iter().filter(|p| p.tag() == tag).count()
    }

    #[test]
    fn test_click_creates_ring_burst_with_ring_and_glow() {
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(50);
        let ids = emitter.emit(
            &mut pool,
            EffectKind::Click,
            Position::new(100.0, 100.0),
            &EmitOptions::with_count(6),
            &ctx(),
        );

        assert_eq!(ids.len(), 8);
        assert_eq!(count(&pool, ParticleTag::Sparkle), 6);
        assert_eq!(count(&pool, ParticleTag::Ring), 1);
        assert_eq!(count(&pool, ParticleTag::Glow), 1);

        let max_life = EffectsConfig::default().click.max_life;
        assert!(pool.iter().all(|p| p.life == max_life && p.max_life == max_life));
        assert!(pool
            .iter()
            .all(|p| p.position == Position::new(100.0, 100.0)));
    }

    #[test]
    fn test_invalid_positions_create_nothing() {
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(50);
        for position in [
            Position::new(f64::NAN, 50.0),
            Position::new(50.0, f64::INFINITY),
            Position::new(-1.0, 50.0),
            Position::new(50.0, -1.0),
            Position::new(1601.0, 50.0),
            Position::new(50.0, 1201.0),
        ] {
            for kind in [
                EffectKind::Trail,
                EffectKind::Sparkle,
                EffectKind::Click,
                EffectKind::Heart,
                EffectKind::Scroll { delta: 100.0 },
            ] {
                let ids = emitter.emit(&mut pool, kind, position, &EmitOptions::default(), &ctx());
                assert!(ids.is_empty());
            }
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn test_reduced_motion_creates_nothing() {
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(50);
        let ctx = EmitContext {
            viewport: VIEWPORT,
            flags: DeviceFlags {
                reduced_motion: true,
                ..Default::default()
            },
        };
        let ids = emitter.emit(
            &mut pool,
            EffectKind::Click,
            Position::new(100.0, 100.0),
            &EmitOptions::default(),
            &ctx,
        );
        assert!(ids.is_empty());
        assert!(emitter.emit_ambient(&mut pool, &ctx).is_empty());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_emission_respects_pool_capacity() {
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(5);
        let first = emitter.emit(
            &mut pool,
            EffectKind::Click,
            Position::new(100.0, 100.0),
            &EmitOptions::with_count(6),
            &ctx(),
        );
        // Sparkles are capped at the capacity, glow and ring come first
        assert_eq!(first.len(), 7);
        assert_eq!(pool.len(), 5);
        let kept: Vec<_> = pool.iter().map(|p| p.id).collect();
        assert_eq!(kept, first[2..].to_vec());
        assert!(pool.iter().all(|p| p.tag() == ParticleTag::Sparkle));
    }

    #[test]
    fn test_oversized_counts_are_capped_before_building() {
        let mut config = EffectsConfig::default();
        config.click.ring_particles = 10_000_000;
        config.heart.count = usize::MAX;
        let mut emitter = Emitter::new(config, Some(1));
        let mut pool = ParticlePool::new(50);

        let click = emitter.emit(
            &mut pool,
            EffectKind::Click,
            Position::new(100.0, 100.0),
            &EmitOptions::default(),
            &ctx(),
        );
        assert_eq!(click.len(), 52);
        assert_eq!(pool.len(), 50);

        let hearts = emitter.emit(
            &mut pool,
            EffectKind::Heart,
            Position::new(100.0, 100.0),
            &EmitOptions::default(),
            &ctx(),
        );
        assert_eq!(hearts.len(), 50);
        assert!(pool.iter().all(|p| p.tag() == ParticleTag::Heart));
    }

    #[test]
    fn test_jitter_stays_in_configured_bounds() {
        let config = EffectsConfig::default();
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(50);
        emitter.emit(
            &mut pool,
            EffectKind::Trail,
            Position::new(300.0, 300.0),
            &EmitOptions::with_count(30),
            &ctx(),
        );
        for p in pool.iter() {
            assert!(p.size >= config.trail.size.min && p.size <= config.trail.size.max);
            let speed = p.velocity.magnitude() as f32;
            assert!(speed <= config.trail.speed.max + 1e-4);
            assert!(speed >= config.trail.speed.min - 1e-4);
            assert_eq!(p.max_life, config.trail.max_life);
        }
    }

    #[test]
    fn test_hearts_target_above_origin() {
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(50);
        let ids = emitter.emit(
            &mut pool,
            EffectKind::Heart,
            Position::new(200.0, 200.0),
            &EmitOptions::default(),
            &ctx(),
        );
        assert_eq!(ids.len(), EffectsConfig::default().heart.count);
        for p in pool.iter() {
            match p.kind {
                ParticleKind::Heart { target, .. } => assert!(target.y < 200.0),
                _ => panic!("unexpected particle {:?}", p.tag()),
            }
        }
    }

    #[test]
    fn test_scroll_count_is_capped() {
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(50);
        let small = emitter.emit(
            &mut pool,
            EffectKind::Scroll { delta: 10.0 },
            Position::new(100.0, 100.0),
            &EmitOptions::default(),
            &ctx(),
        );
        assert_eq!(small.len(), 1);

        let large = emitter.emit(
            &mut pool,
            EffectKind::Scroll { delta: -5000.0 },
            Position::new(100.0, 100.0),
            &EmitOptions::default(),
            &ctx(),
        );
        assert_eq!(large.len(), EffectsConfig::default().scroll.max_per_event);

        let none = emitter.emit(
            &mut pool,
            EffectKind::Scroll { delta: 0.0 },
            Position::new(100.0, 100.0),
            &EmitOptions::default(),
            &ctx(),
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_ambient_lands_inside_viewport() {
        let mut emitter = emitter();
        let mut pool = ParticlePool::new(50);
        for _ in 0..20 {
            assert_eq!(emitter.emit_ambient(&mut pool, &ctx()).len(), 1);
        }
        for p in pool.iter() {
            assert!(p.position.x >= 0.0 && p.position.x <= VIEWPORT.width);
            assert!(p.position.y >= 0.0 && p.position.y <= VIEWPORT.height);
            assert_eq!(p.tag(), ParticleTag::Sparkle);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let mut a = Emitter::new(EffectsConfig::default(), Some(3));
        let mut b = Emitter::new(EffectsConfig::default(), Some(3));
        let mut pool_a = ParticlePool::new(50);
        let mut pool_b = ParticlePool::new(50);
        let position = Position::new(50.0, 50.0);
        a.emit(&mut pool_a, EffectKind::Sparkle, position, &EmitOptions::with_count(5), &ctx());
        b.emit(&mut pool_b, EffectKind::Sparkle, position, &EmitOptions::with_count(5), &ctx());
        let va: Vec<_> = pool_a.iter().map(|p| p.velocity).collect();
        let vb: Vec<_> = pool_b.iter().map(|p| p.velocity).collect();
        assert_eq!(va, vb);
    }
}
