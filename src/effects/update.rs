//! Per-frame particle update.
//!
//! Life is counted in reference frames (60 per second) and decays with the
//! measured frame time, so the same effect lasts equally long at 30 and 60 Hz.

use super::particle::{Particle, ParticleKind};
use super::pool::ParticlePool;
use crate::utils::clock::clamp_frame_dt;
use crate::utils::geometry::Extent;

pub const REFERENCE_FPS: f32 = 60.0;

#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Frame step in seconds, see [`clamp_frame_dt`].
    pub dt: f32,
    pub viewport: Extent,
}

impl FrameContext {
    pub fn new(dt: f32, viewport: Extent) -> Self {
        Self {
            dt: clamp_frame_dt(dt),
            viewport,
        }
    }

    /// Number of reference frames this step covers, always > 0.
    pub fn frames(&self) -> f32 {
        clamp_frame_dt(self.dt) * REFERENCE_FPS
    }
}

/// Advances one particle. Returns false when the particle expired.
pub fn update_particle(particle: &mut Particle, ctx: &FrameContext) -> bool {
    let frames = ctx.frames();
    particle.life -= frames;
    if particle.life <= 0.0 {
        particle.opacity = 0.0;
        return false;
    }

    let ratio = particle.life_ratio();
    let progress = particle.progress();
    let step = frames as f64;
    particle.rotation += particle.rotation_speed * frames;

    match &mut particle.kind {
        ParticleKind::Trail { drag } => {
            particle.position = particle
                .position
                .offset(particle.velocity.dx * step, particle.velocity.dy * step);
            let damping = drag.powf(frames) as f64;
            particle.velocity.dx *= damping;
            particle.velocity.dy *= damping;
            particle.opacity = ratio;
        }
        ParticleKind::Sparkle {
            twinkle_phase,
            twinkle_speed,
            gravity,
            bounce,
            ..
        } => {
            particle.velocity.dy += (*gravity * frames) as f64;
            particle.position = particle
                .position
                .offset(particle.velocity.dx * step, particle.velocity.dy * step);

            let floor = ctx.viewport.height;
            if !ctx.viewport.is_empty() && particle.position.y > floor && particle.velocity.dy > 0.0
            {
                particle.position.y = floor;
                particle.velocity.dy = -particle.velocity.dy * *bounce as f64;
            }

            *twinkle_phase += *twinkle_speed * frames;
            let twinkle = 0.65 + 0.35 * twinkle_phase.sin();
            particle.opacity = (ratio * twinkle).clamp(0.0, 1.0);
        }
        ParticleKind::Ring {
            radius,
            start_radius,
            growth,
            ..
        } => {
            *radius = *start_radius + *growth * simple_easing::cubic_out(progress);
            particle.opacity = ratio;
        }
        ParticleKind::Glow {
            pulse_phase,
            pulse_speed,
            ..
        } => {
            *pulse_phase += *pulse_speed * frames;
            let pulse = 0.75 + 0.25 * pulse_phase.sin();
            particle.opacity = (ratio * pulse).clamp(0.0, 1.0);
        }
        ParticleKind::Heart { target, ease } => {
            let t = 1.0 - (1.0 - ease.clamp(0.0, 1.0)).powf(frames);
            particle.position = particle.position.lerp(target, t as f64);
            particle.opacity = simple_easing::sine_out(ratio);
        }
    }

    true
}

/// Updates every particle of the pool and drops the expired ones.
///
/// Returns the number of particles removed.
pub fn update_pool(pool: &mut ParticlePool, ctx: &FrameContext) -> usize {
    let before = pool.len();
    pool.retain_mut(|particle| update_particle(particle, ctx));
    before - pool.len()
}
