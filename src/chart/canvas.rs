use crate::core::Rgba;

/// Axis-aligned rectangle in pane pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Drawing target for custom chart primitives
pub trait Canvas {
    fn fill_rect(&mut self, rect: PixelRect, color: Rgba);
    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba, width: f32);
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba, width: f32);
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: PixelRect, color: Rgba },
    StrokeRect { rect: PixelRect, color: Rgba, width: f32 },
    Line { from: (f32, f32), to: (f32, f32), color: Rgba, width: f32 },
}

/// Canvas that records calls instead of rasterizing them
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn filled_rects(&self) -> impl Iterator<Item = (&PixelRect, &Rgba)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::FillRect { rect, color } => Some((rect, color)),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
    }

    /// Replay the recorded calls onto another canvas
    pub fn replay(&self, target: &mut dyn Canvas) {
        for command in &self.commands {
            match *command {
                DrawCommand::FillRect { rect, color } => target.fill_rect(rect, color),
                DrawCommand::StrokeRect { rect, color, width } => target.stroke_rect(rect, color, width),
                DrawCommand::Line { from, to, color, width } => target.line(from, to, color, width),
            }
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Canvas for DrawList {
    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba, width: f32) {
        self.commands.push(DrawCommand::StrokeRect { rect, color, width });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba, width: f32) {
        self.commands.push(DrawCommand::Line { from, to, color, width });
    }
}
