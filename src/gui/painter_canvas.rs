use eframe::egui;

use crate::chart::{Canvas, PixelRect};
use crate::core::Rgba;

pub fn color32(color: Rgba) -> egui::Color32 {
    let alpha = (color.a.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, alpha)
}

/// `Canvas` over an egui painter; pane pixels are offset by `origin`
pub struct PainterCanvas<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
}

impl<'a> PainterCanvas<'a> {
    pub fn new(painter: &'a egui::Painter, origin: egui::Pos2) -> Self {
        Self { painter, origin }
    }

    fn rect(&self, rect: PixelRect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.origin + egui::vec2(rect.x, rect.y),
            egui::vec2(rect.width, rect.height),
        )
    }

    fn point(&self, (x, y): (f32, f32)) -> egui::Pos2 {
        self.origin + egui::vec2(x, y)
    }
}

impl Canvas for PainterCanvas<'_> {
    fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.painter
            .rect_filled(self.rect(rect), egui::Rounding::ZERO, color32(color));
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba, width: f32) {
        self.painter.rect_stroke(
            self.rect(rect),
            egui::Rounding::ZERO,
            egui::Stroke::new(width, color32(color)),
        );
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba, width: f32) {
        self.painter.line_segment(
            [self.point(from), self.point(to)],
            egui::Stroke::new(width, color32(color)),
        );
    }
}
