use iced::widget::canvas;
use iced::widget::canvas::{Frame, Path, Stroke};
use iced::{mouse, Color, Length, Rectangle, Renderer, Theme};
use iced_wgpu::core::Element;

use crate::graphics::draw::DrawCommand;

/// Upper bound of concentric fills used to approximate a radial gradient.
const MAX_GRADIENT_LAYERS: usize = 10;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Message {}

pub struct OverlaySurfaceCanvas<'a> {
    commands: &'a [DrawCommand],
}

impl<'a> std::fmt::Debug for OverlaySurfaceCanvas<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OverlaySurfaceCanvas({} commands)", self.commands.len())
    }
}

impl<'a> OverlaySurfaceCanvas<'a> {
    pub fn new(commands: &'a [DrawCommand]) -> Self {
        Self { commands }
    }
}

impl<'a, Message> canvas::Program<Message> for OverlaySurfaceCanvas<'a> {
    type State = ();

    fn draw(
        &self,
        _state: &(),
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        for command in self.commands {
            rasterize(&mut frame, command);
        }
        vec![frame.into_geometry()]
    }
}

fn rasterize(frame: &mut Frame, command: &DrawCommand) {
    match command {
        DrawCommand::Circle {
            center,
            radius,
            color,
        } => {
            frame.fill(&Path::circle(*center, *radius), *color);
        }
        DrawCommand::GradientCircle {
            center,
            radius,
            inner,
            outer,
        } => {
            for (radius, color) in gradient_layers(*radius, *inner, *outer) {
                frame.fill(&Path::circle(*center, radius), color);
            }
        }
        DrawCommand::Ring {
            center,
            radius,
            width,
            color,
        } => {
            frame.stroke(
                &Path::circle(*center, *radius),
                Stroke::default().with_color(*color).with_width(*width),
            );
        }
        DrawCommand::Polygon { points, color } => {
            let Some((first, rest)) = points.split_first() else {
                return;
            };
            let path = Path::new(|builder| {
                builder.move_to(*first);
                for point in rest {
                    builder.line_to(*point);
                }
                builder.close();
            });
            frame.fill(&path, *color);
        }
        DrawCommand::Heart { outline, color } => {
            let path = Path::new(|builder| {
                builder.move_to(outline[0]);
                builder.bezier_curve_to(outline[1], outline[2], outline[3]);
                builder.bezier_curve_to(outline[4], outline[5], outline[6]);
                builder.close();
            });
            frame.fill(&path, *color);
        }
    }
}

fn lerp_color(from: Color, to: Color, t: f32) -> Color {
    Color {
        r: from.r + (to.r - from.r) * t,
        g: from.g + (to.g - from.g) * t,
        b: from.b + (to.b - from.b) * t,
        a: from.a + (to.a - from.a) * t,
    }
}

/// Concentric circles, largest first, whose stacked alpha approximates a
/// radial gradient from `inner` at the center to `outer` at `radius`.
fn gradient_layers(radius: f32, inner: Color, outer: Color) -> Vec<(f32, Color)> {
    if radius <= 0.0 {
        return Vec::new();
    }
    let layers = ((radius / 3.0).ceil() as usize).clamp(2, MAX_GRADIENT_LAYERS);
    (0..layers)
        .map(|i| {
            /* t is 1 at the edge and shrinks toward the center. */
            let t = 1.0 - i as f32 / layers as f32;
            let mut color = lerp_color(inner, outer, t);
            color.a /= layers as f32 / 2.0;
            (radius * t, Color { a: color.a.min(1.0), ..color })
        })
        .collect()
}

#[derive(Default)]
pub struct OverlaySurface {
    commands: Vec<DrawCommand>,
}

impl OverlaySurface {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn set_commands(&mut self, commands: Vec<DrawCommand>) {
        self.commands = commands;
    }

    pub fn view(&self) -> Element<'_, Message, Theme, Renderer> {
        canvas(OverlaySurfaceCanvas::new(&self.commands))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
