use crate::utils::geometry::{Position, Velocity};
use iced::Color;

pub type ParticleId = u64;

/// Kind-specific animation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleKind {
    /// Soft bubble left behind the pointer.
    Trail { drag: f32 },
    /// N-pointed twinkling star.
    Sparkle {
        points: u8,
        twinkle_phase: f32,
        twinkle_speed: f32,
        gravity: f32,
        bounce: f32,
    },
    /// Expanding stroked circle.
    Ring {
        radius: f32,
        start_radius: f32,
        growth: f32,
        stroke_width: f32,
    },
    /// Pulsing radial highlight.
    Glow {
        radius: f32,
        pulse_phase: f32,
        pulse_speed: f32,
    },
    /// Heart easing toward a target position.
    Heart { target: Position, ease: f32 },
}

/// Field-less discriminant of [`ParticleKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleTag {
    Trail,
    Sparkle,
    Ring,
    Glow,
    Heart,
}

impl ParticleKind {
    pub fn tag(&self) -> ParticleTag {
        match self {
            ParticleKind::Trail { .. } => ParticleTag::Trail,
            ParticleKind::Sparkle { .. } => ParticleTag::Sparkle,
            ParticleKind::Ring { .. } => ParticleTag::Ring,
            ParticleKind::Glow { .. } => ParticleTag::Glow,
            ParticleKind::Heart { .. } => ParticleTag::Heart,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Assigned by the pool on insertion.
    pub id: ParticleId,
    pub position: Position,
    pub velocity: Velocity,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub size: f32,
    pub color: Color,
    /// Remaining life in reference frames, starts at `max_life`.
    pub life: f32,
    pub max_life: f32,
    /// Derived from `life` by the updater every frame.
    pub opacity: f32,
    pub kind: ParticleKind,
}

impl Particle {
    pub fn new(
        kind: ParticleKind,
        position: Position,
        velocity: Velocity,
        size: f32,
        color: Color,
        max_life: f32,
    ) -> Self {
        Self {
            id: 0,
            position,
            velocity,
            rotation: 0.0,
            rotation_speed: 0.0,
            size,
            color,
            life: max_life,
            max_life,
            opacity: 1.0,
            kind,
        }
    }

    pub fn with_rotation(mut self, rotation: f32, rotation_speed: f32) -> Self {
        self.rotation = rotation;
        self.rotation_speed = rotation_speed;
        self
    }

    pub fn tag(&self) -> ParticleTag {
        self.kind.tag()
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// Remaining life as a fraction in `[0, 1]`.
    pub fn life_ratio(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// Elapsed fraction of the lifetime in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        1.0 - self.life_ratio()
    }
}
