//! Display list generation.
//!
//! Particles are turned into [`DrawCommand`]s, a plain description of shapes.
//! The iced canvas rasterizes the list; nothing here touches the GPU.

use crate::effects::particle::{Particle, ParticleKind};
use iced::{Color, Point};
use std::f32::consts::{FRAC_PI_2, PI};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Circle {
        center: Point,
        radius: f32,
        color: Color,
    },
    /// Circle with a radial falloff from `inner` at the center to `outer` at the edge.
    GradientCircle {
        center: Point,
        radius: f32,
        inner: Color,
        outer: Color,
    },
    Ring {
        center: Point,
        radius: f32,
        width: f32,
        color: Color,
    },
    Polygon {
        points: Vec<Point>,
        color: Color,
    },
    /// Heart outline: a start point followed by two cubic bezier segments
    /// (control, control, end) each.
    Heart {
        outline: [Point; 7],
        color: Color,
    },
}

pub fn with_alpha(color: Color, opacity: f32) -> Color {
    Color {
        a: (color.a * opacity).clamp(0.0, 1.0),
        ..color
    }
}

fn to_point(particle: &Particle) -> Point {
    Point::new(particle.position.x as f32, particle.position.y as f32)
}

/// Brightens a color toward white, used for the highlight of bubbles and glows.
fn highlight(color: Color, amount: f32) -> Color {
    let amount = amount.clamp(0.0, 1.0);
    Color {
        r: color.r + (1.0 - color.r) * amount,
        g: color.g + (1.0 - color.g) * amount,
        b: color.b + (1.0 - color.b) * amount,
        a: color.a,
    }
}

/// Returns the shape of one particle, or `None` when it is not visible.
pub fn draw_particle(particle: &Particle) -> Option<DrawCommand> {
    if !particle.is_alive() || particle.opacity <= 0.0 {
        return None;
    }

    let center = to_point(particle);
    let color = with_alpha(particle.color, particle.opacity);

    let command = match particle.kind {
        ParticleKind::Trail { .. } => DrawCommand::GradientCircle {
            center,
            radius: particle.size * (0.5 + 0.5 * particle.life_ratio()),
            inner: highlight(color, 0.6),
            outer: with_alpha(color, 0.0),
        },
        ParticleKind::Sparkle { points, .. } => DrawCommand::Polygon {
            points: star_points(
                center,
                particle.size * 2.0,
                particle.size * 0.6,
                points,
                particle.rotation,
            ),
            color,
        },
        ParticleKind::Ring {
            radius,
            stroke_width,
            ..
        } => DrawCommand::Ring {
            center,
            radius,
            width: stroke_width * particle.life_ratio().max(0.3),
            color,
        },
        ParticleKind::Glow {
            radius,
            pulse_phase,
            ..
        } => DrawCommand::GradientCircle {
            center,
            radius: radius * (1.0 + 0.15 * pulse_phase.sin()),
            inner: with_alpha(highlight(color, 0.3), 0.6),
            outer: with_alpha(color, 0.0),
        },
        ParticleKind::Heart { .. } => DrawCommand::Heart {
            outline: heart_outline(center, particle.size, particle.rotation),
            color,
        },
    };
    Some(command)
}

pub fn draw_particles<'a, I>(particles: I, out: &mut Vec<DrawCommand>)
where
    I: IntoIterator<Item = &'a Particle>,
{
    out.extend(particles.into_iter().filter_map(draw_particle));
}

/// Vertices of an N-pointed star, alternating outer and inner radius.
/// The first tip points up before rotation.
pub fn star_points(
    center: Point,
    outer_radius: f32,
    inner_radius: f32,
    points: u8,
    rotation: f32,
) -> Vec<Point> {
    let points = points.max(3) as usize;
    let step = PI / points as f32;
    (0..points * 2)
        .map(|i| {
            let radius = if i % 2 == 0 {
                outer_radius
            } else {
                inner_radius
            };
            let angle = rotation - FRAC_PI_2 + step * i as f32;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Heart outline in canvas coordinates (y down), tip at the bottom.
pub fn heart_outline(center: Point, size: f32, rotation: f32) -> [Point; 7] {
    const LOCAL: [(f32, f32); 7] = [
        (0.0, 0.45),
        (-0.55, 0.05),
        (-0.5, -0.45),
        (0.0, -0.2),
        (0.5, -0.45),
        (0.55, 0.05),
        (0.0, 0.45),
    ];
    let (sin, cos) = rotation.sin_cos();
    LOCAL.map(|(x, y)| {
        let (x, y) = (x * size, y * size);
        Point::new(center.x + x * cos - y * sin, center.y + x * sin + y * cos)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::geometry::{Position, Velocity};

    fn particle(kind: ParticleKind) -> Particle {
        Particle::new(
            kind,
            Position::new(10.0, 20.0),
            Velocity::default(),
            4.0,
            Color::from_rgb(1.0, 0.0, 0.0),
            10.0,
        )
    }

    #[test]
    fn test_dead_particles_are_not_drawn() {
        let mut p = particle(ParticleKind::Trail { drag: 0.9 });
        p.life = 0.0;
        assert!(draw_particle(&p).is_none());
        p.life = -1.0;
        assert!(draw_particle(&p).is_none());

        let mut faded = particle(ParticleKind::Trail { drag: 0.9 });
        faded.opacity = 0.0;
        assert!(draw_particle(&faded).is_none());
    }

    #[test]
    fn test_dispatch_by_kind() {
        let trail = draw_particle(&particle(ParticleKind::Trail { drag: 0.9 })).unwrap();
        assert!(matches!(trail, DrawCommand::GradientCircle { .. }));

        let sparkle = draw_particle(&particle(ParticleKind::Sparkle {
            points: 5,
            twinkle_phase: 0.0,
            twinkle_speed: 0.1,
            gravity: 0.0,
            bounce: 0.0,
        }))
        .unwrap();
        match sparkle {
            DrawCommand::Polygon { points, .. } => assert_eq!(points.len(), 10),
            other => panic!("unexpected command {other:?}"),
        }

        let ring = draw_particle(&particle(ParticleKind::Ring {
            radius: 12.0,
            start_radius: 5.0,
            growth: 30.0,
            stroke_width: 2.0,
        }))
        .unwrap();
        match ring {
            DrawCommand::Ring { radius, width, .. } => {
                assert_eq!(radius, 12.0);
                assert_eq!(width, 2.0);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let heart = draw_particle(&particle(ParticleKind::Heart {
            target: Position::new(0.0, 0.0),
            ease: 0.1,
        }))
        .unwrap();
        assert!(matches!(heart, DrawCommand::Heart { .. }));
    }

    #[test]
    fn test_opacity_applies_to_alpha() {
        let mut p = particle(ParticleKind::Ring {
            radius: 5.0,
            start_radius: 5.0,
            growth: 30.0,
            stroke_width: 2.0,
        });
        p.opacity = 0.25;
        match draw_particle(&p).unwrap() {
            DrawCommand::Ring { color, .. } => assert!((color.a - 0.25).abs() < 1e-6),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_star_points_alternate_radius() {
        let center = Point::new(0.0, 0.0);
        let points = star_points(center, 10.0, 4.0, 4, 0.0);
        assert_eq!(points.len(), 8);
        for (i, p) in points.iter().enumerate() {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            let expected = if i % 2 == 0 { 10.0 } else { 4.0 };
            assert!((r - expected).abs() < 1e-4);
        }
        // First tip points up (negative y on the canvas)
        assert!((points[0].x).abs() < 1e-4);
        assert!((points[0].y + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_heart_outline_is_closed() {
        let outline = heart_outline(Point::new(50.0, 50.0), 10.0, 0.0);
        assert_eq!(outline[0], outline[6]);
        assert!((outline[0].y - 54.5).abs() < 1e-4);
    }
}
