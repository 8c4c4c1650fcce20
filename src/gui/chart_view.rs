use eframe::egui;
use std::time::{Duration, Instant};

use crate::chart::{
    ChartEngine, CrosshairSnapshot, LegendValue, LinearPriceScale, PriceScale, ProfileRenderer, SeriesGroup,
    TimeRange,
};
use crate::core::{format_time, Candle, MarkerShape, PaneKind, SeriesKind};
use crate::gui::painter_canvas::{color32, PainterCanvas};

const PRICE_MARGIN: f64 = 0.05;
const DEFAULT_STEP: Duration = Duration::from_millis(500);

/// Replay viewer: historical candles shown up to a cursor, the rest fed
/// one by one through the streaming path
pub struct ReplayViewer {
    engine: ChartEngine,
    all: Vec<Candle>,
    cursor: usize,
    playing: bool,
    step_interval: Duration,
    last_step: Instant,
    renderer: ProfileRenderer,
    legend: CrosshairSnapshot,
}

impl ReplayViewer {
    /// `cursor` is the number of candles already loaded into `engine`
    pub fn new(engine: ChartEngine, all: Vec<Candle>, cursor: usize) -> Self {
        let renderer = ProfileRenderer::new(engine.config().volume_profile.clone());
        Self {
            engine,
            cursor: cursor.min(all.len()),
            all,
            playing: false,
            step_interval: DEFAULT_STEP,
            last_step: Instant::now(),
            renderer,
            legend: CrosshairSnapshot::new(),
        }
    }

    fn step(&mut self) -> bool {
        let Some(candle) = self.all.get(self.cursor).cloned() else {
            self.playing = false;
            return false;
        };
        self.engine.apply_record(candle);
        self.cursor += 1;
        true
    }

    /// Restart replay from the clicked bar
    fn seek(&mut self, time: i64) {
        let index = self.engine.seek_index(time);
        let end = (index + 1).min(self.all.len());
        match self.engine.load_dataset(self.all[..end].to_vec()) {
            Ok(()) => {
                self.cursor = end;
                log::info!("Seeked to index {} ({})", index, time);
            }
            Err(e) => log::error!("Seek failed: {}", e),
        }
    }

    fn x_for_index(rect: &egui::Rect, index: usize, count: usize) -> f32 {
        let slot = rect.width() / count.max(1) as f32;
        (index as f32 + 0.5) * slot
    }

    fn draw_primary(&mut self, ui: &mut egui::Ui, height: f32) {
        let width = ui.available_width();
        let (response, painter) = ui.allocate_painter(egui::vec2(width, height), egui::Sense::click());
        let rect = response.rect;
        painter.rect_filled(rect, egui::Rounding::ZERO, egui::Color32::from_gray(18));

        let candles = self.engine.store().candles();
        let Some((first, last)) = self.engine.store().time_range() else {
            return;
        };
        let Some((low, high)) = self.engine.store().price_range(first, last) else {
            return;
        };
        let count = candles.len();
        let scale = LinearPriceScale::with_margin(low, high, PRICE_MARGIN, 0.0, rect.height());
        let style = &self.engine.config().series;
        let body = (rect.width() / count.max(1) as f32 * 0.7).max(1.0);

        for (i, c) in candles.iter().enumerate() {
            let x = rect.left() + Self::x_for_index(&rect, i, count);
            let color = if c.close >= c.open { style.candle_up_color } else { style.candle_down_color };
            let (Some(yh), Some(yl), Some(yo), Some(yc)) = (
                scale.price_to_pixel(c.high),
                scale.price_to_pixel(c.low),
                scale.price_to_pixel(c.open),
                scale.price_to_pixel(c.close),
            ) else {
                continue;
            };
            let stroke = egui::Stroke::new(1.0, color32(color));
            painter.line_segment(
                [egui::pos2(x, rect.top() + yh), egui::pos2(x, rect.top() + yl)],
                stroke,
            );
            let body_rect = egui::Rect::from_min_max(
                egui::pos2(x - body / 2.0, rect.top() + yo.min(yc)),
                egui::pos2(x + body / 2.0, rect.top() + yo.max(yc).max(yo.min(yc) + 1.0)),
            );
            painter.rect_filled(body_rect, egui::Rounding::ZERO, color32(color));
        }

        for group in self.engine.registrar().groups_in(PaneKind::Primary) {
            self.draw_group(&painter, &rect, group, &scale);
        }

        for marker in self.engine.markers() {
            let Some(index) = self.engine.store().index_of(marker.time) else {
                continue;
            };
            let x = rect.left() + Self::x_for_index(&rect, index, count);
            let candle = &candles[index];
            let (price, offset) = match marker.shape {
                MarkerShape::ArrowUp => (candle.low, 8.0),
                MarkerShape::ArrowDown => (candle.high, -8.0),
            };
            if let Some(y) = scale.price_to_pixel(price) {
                painter.circle_filled(egui::pos2(x, rect.top() + y + offset), 3.0, color32(marker.color));
            }
        }

        for (_, profile) in self.engine.registrar().profiles() {
            let mut canvas = PainterCanvas::new(&painter, rect.min);
            self.renderer.render(&profile, &scale, rect.width(), &mut canvas);
        }

        self.engine
            .on_visible_range_changed(PaneKind::Primary, TimeRange::new(first, last));
        self.track_pointer(&response, &painter, PaneKind::Primary);
    }

    fn draw_secondary(&mut self, ui: &mut egui::Ui, height: f32) {
        let width = ui.available_width();
        let (response, painter) = ui.allocate_painter(egui::vec2(width, height), egui::Sense::click());
        let rect = response.rect;
        painter.rect_filled(rect, egui::Rounding::ZERO, egui::Color32::from_gray(24));

        let groups: Vec<&SeriesGroup> = self.engine.registrar().groups_in(PaneKind::Secondary).collect();
        let slot_height = rect.height() / groups.len().max(1) as f32;
        for (slot, group) in groups.iter().enumerate() {
            let values = group.series().into_iter().flat_map(|s| s.points().iter().map(|p| p.value));
            let (low, high) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let scale = LinearPriceScale::with_margin(low, high, PRICE_MARGIN, slot as f32 * slot_height, slot_height);
            self.draw_group(&painter, &rect, group, &scale);
        }

        self.track_pointer(&response, &painter, PaneKind::Secondary);
    }

    fn draw_group(&self, painter: &egui::Painter, rect: &egui::Rect, group: &SeriesGroup, scale: &dyn PriceScale) {
        let store = self.engine.store();
        let count = store.len();
        for series in group.series() {
            let mut points = Vec::with_capacity(series.len());
            for p in series.points() {
                let (Some(index), Some(y)) = (store.index_of(p.time), scale.price_to_pixel(p.value)) else {
                    continue;
                };
                let x = rect.left() + Self::x_for_index(rect, index, count);
                match series.kind() {
                    SeriesKind::Histogram => {
                        let zero = scale.price_to_pixel(0.0).unwrap_or(y);
                        let color = p.color.unwrap_or(series.color());
                        painter.line_segment(
                            [egui::pos2(x, rect.top() + zero), egui::pos2(x, rect.top() + y)],
                            egui::Stroke::new(2.0, color32(color)),
                        );
                    }
                    SeriesKind::Line => points.push(egui::pos2(x, rect.top() + y)),
                }
            }
            if points.len() > 1 {
                painter.add(egui::Shape::line(
                    points,
                    egui::Stroke::new(series.line_width(), color32(series.color())),
                ));
            }
        }
    }

    fn track_pointer(&mut self, response: &egui::Response, painter: &egui::Painter, source: PaneKind) {
        let rect = response.rect;
        let count = self.engine.store().len();
        let hovered = response.hover_pos().and_then(|pos| {
            if count == 0 {
                return None;
            }
            let slot = rect.width() / count as f32;
            let index = (((pos.x - rect.left()) / slot).floor().max(0.0) as usize).min(count - 1);
            self.engine.store().candles().get(index).map(|c| c.time)
        });

        if response.hovered() || self.engine.panes().pane(source).crosshair().is_some() {
            self.legend = self.engine.on_crosshair_moved(source, hovered);
        }
        if let (Some(time), true) = (hovered, response.clicked()) {
            self.seek(time);
        }

        if let Some(index) = self
            .engine
            .panes()
            .pane(source)
            .crosshair()
            .and_then(|t| self.engine.store().index_of(t))
        {
            let x = rect.left() + Self::x_for_index(&rect, index, count);
            painter.vline(x, rect.y_range(), egui::Stroke::new(0.5, egui::Color32::GRAY));
        }
    }

    fn legend_text(&self) -> String {
        self.legend
            .iter()
            .map(|(id, value)| match value {
                LegendValue::Single { val } => format!("{} {:.2}", id, val),
                other => format!("{} {}", id, serde_json::to_string(other).unwrap_or_default()),
            })
            .collect::<Vec<_>>()
            .join("   ")
    }
}

impl eframe::App for ReplayViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.playing && self.last_step.elapsed() >= self.step_interval {
            self.step();
            self.last_step = Instant::now();
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let label = if self.playing { "Pause" } else { "Play" };
                if ui.button(label).clicked() {
                    self.playing = !self.playing;
                }
                if ui.button("Step").clicked() {
                    self.step();
                }
                ui.label(format!("{}/{}", self.cursor, self.all.len()));
                if let Some(latest) = self.engine.store().latest() {
                    let offset = self.engine.config().display.utc_offset_minutes;
                    ui.label(format_time(latest.time, offset));
                }
            });
            ui.label(self.legend_text());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.engine.resize(ui.available_width());
            let layout = self.engine.layout();
            let primary_height = (ui.available_height() - layout.secondary_height).max(100.0);
            self.draw_primary(ui, primary_height);
            if layout.secondary_visible {
                self.draw_secondary(ui, layout.secondary_height);
            }
        });

        if self.playing {
            ctx.request_repaint_after(self.step_interval);
        }
    }
}

/// Open the viewer window
pub fn run(engine: ChartEngine, all: Vec<Candle>, cursor: usize) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Replay Chart"),
        ..Default::default()
    };

    eframe::run_native(
        "Replay Chart",
        options,
        Box::new(move |_cc| Box::new(ReplayViewer::new(engine, all, cursor))),
    )
}
