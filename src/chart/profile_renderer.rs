// Volume profile drawing: price-anchored horizontal bars on the right edge
// of the price pane, plus a reference line at the point of control.

use crate::chart::canvas::{Canvas, PixelRect};
use crate::chart::price_scale::PriceScale;
use crate::config::VolumeProfileConfig;
use crate::core::{AggregatedProfile, Rgba, VolumeProfileBin};

const MIN_BAR_HEIGHT: f32 = 1.0;
const BAR_OUTLINE_WIDTH: f32 = 0.5;

/// Which band a bar was colored for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarBand {
    Poc,
    ValueArea,
    Outside,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileBar {
    pub price: f64,
    pub rect: PixelRect,
    pub band: BarBand,
    pub color: Rgba,
}

/// Geometry of one frame, computed before anything is drawn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileLayout {
    pub bars: Vec<ProfileBar>,
    pub poc_line: Option<((f32, f32), (f32, f32))>,
}

impl ProfileLayout {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty() && self.poc_line.is_none()
    }
}

pub struct ProfileRenderer {
    config: VolumeProfileConfig,
}

impl ProfileRenderer {
    pub fn new(config: VolumeProfileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VolumeProfileConfig {
        &self.config
    }

    /// Bar band by priority: POC, then value area, then the rest
    pub fn band_of(&self, bin: &VolumeProfileBin, poc_price: f64) -> BarBand {
        if (bin.price - poc_price).abs() <= self.config.poc_tolerance {
            BarBand::Poc
        } else if bin.in_value_area {
            BarBand::ValueArea
        } else {
            BarBand::Outside
        }
    }

    fn band_color(&self, band: BarBand) -> Rgba {
        match band {
            BarBand::Poc => self.config.color_poc,
            BarBand::ValueArea => self.config.color_value_area,
            BarBand::Outside => self.config.color_non_value_area,
        }
    }

    /// Compute bar rectangles against `scale`, anchored at `right_edge`.
    ///
    /// Bins whose bounds cannot be placed on the scale are skipped.
    pub fn layout(&self, profile: &AggregatedProfile, scale: &dyn PriceScale, right_edge: f32) -> ProfileLayout {
        if profile.is_empty() {
            return ProfileLayout::default();
        }
        let max_width = self.config.max_width_pixels;

        let bars = profile
            .bins
            .iter()
            .filter_map(|bin| {
                let y_high = scale.price_to_pixel(bin.high_bound)?;
                let y_low = scale.price_to_pixel(bin.low_bound)?;
                let top = y_high.min(y_low);
                let height = (y_low - y_high).abs().max(MIN_BAR_HEIGHT);
                let width = ((bin.volume / profile.max_volume) as f32 * max_width).max(0.0);
                let band = self.band_of(bin, profile.poc_price);
                Some(ProfileBar {
                    price: bin.price,
                    rect: PixelRect::new(right_edge - width, top, width, height),
                    band,
                    color: self.band_color(band).with_alpha_factor(self.config.bar_alpha),
                })
            })
            .collect();

        let poc_line = scale.price_to_pixel(profile.poc_price).map(|y| {
            let length = max_width * self.config.poc_line_extension;
            ((right_edge - length, y), (right_edge, y))
        });

        ProfileLayout { bars, poc_line }
    }

    /// Draw the profile; returns the number of bars drawn
    pub fn render(
        &self,
        profile: &AggregatedProfile,
        scale: &dyn PriceScale,
        right_edge: f32,
        canvas: &mut dyn Canvas,
    ) -> usize {
        let layout = self.layout(profile, scale, right_edge);
        for bar in &layout.bars {
            canvas.fill_rect(bar.rect, bar.color);
            canvas.stroke_rect(bar.rect, self.band_color(bar.band), BAR_OUTLINE_WIDTH);
        }
        if let Some((from, to)) = layout.poc_line {
            canvas.line(from, to, self.config.color_poc, self.config.poc_line_width);
        }
        layout.bars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::canvas::{DrawCommand, DrawList};
    use crate::chart::price_scale::LinearPriceScale;

    fn bin(price: f64, volume: f64, in_va: bool) -> VolumeProfileBin {
        VolumeProfileBin::new(price, volume, price - 0.5, price + 0.5, in_va)
    }

    fn profile() -> AggregatedProfile {
        AggregatedProfile {
            bins: vec![bin(99.0, 4.0, false), bin(100.0, 8.0, true), bin(101.0, 6.0, true)],
            max_volume: 8.0,
            poc_price: 100.0,
        }
    }

    fn scale() -> LinearPriceScale {
        LinearPriceScale::new(90.0, 110.0, 0.0, 200.0)
    }

    #[test]
    fn test_bar_geometry() {
        let renderer = ProfileRenderer::new(VolumeProfileConfig::default());
        let layout = renderer.layout(&profile(), &scale(), 800.0);

        assert_eq!(layout.bars.len(), 3);
        let poc = &layout.bars[1];
        assert_eq!(poc.rect.width, 150.0);
        assert_eq!(poc.rect.right(), 800.0);
        assert_eq!(poc.rect.y, 95.0);
        assert_eq!(poc.rect.height, 10.0);
        assert_eq!(layout.bars[0].rect.width, 75.0);
    }

    #[test]
    fn test_color_priority() {
        let renderer = ProfileRenderer::new(VolumeProfileConfig::default());
        let layout = renderer.layout(&profile(), &scale(), 800.0);
        let bands: Vec<BarBand> = layout.bars.iter().map(|b| b.band).collect();
        assert_eq!(bands, vec![BarBand::Outside, BarBand::Poc, BarBand::ValueArea]);
    }

    #[test]
    fn test_thin_bin_gets_min_height() {
        let renderer = ProfileRenderer::new(VolumeProfileConfig::default());
        let thin = AggregatedProfile {
            bins: vec![VolumeProfileBin::new(100.0, 1.0, 100.0, 100.0001, false)],
            max_volume: 1.0,
            poc_price: 100.0,
        };
        let layout = renderer.layout(&thin, &scale(), 800.0);
        assert_eq!(layout.bars[0].rect.height, 1.0);
    }

    #[test]
    fn test_poc_line_extends_past_bars() {
        let config = VolumeProfileConfig::default();
        let renderer = ProfileRenderer::new(config.clone());
        let mut canvas = DrawList::new();
        assert_eq!(renderer.render(&profile(), &scale(), 800.0, &mut canvas), 3);

        let line = canvas.lines().next().unwrap();
        match line {
            DrawCommand::Line { from, to, color, width } => {
                assert_eq!(*to, (800.0, 100.0));
                assert_eq!(from.0, 800.0 - 225.0);
                assert_eq!(*color, config.color_poc);
                assert_eq!(*width, 2.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_empty_profile_draws_nothing() {
        let renderer = ProfileRenderer::new(VolumeProfileConfig::default());
        let mut canvas = DrawList::new();
        assert_eq!(renderer.render(&AggregatedProfile::default(), &scale(), 800.0, &mut canvas), 0);
        assert!(canvas.is_empty());

        let zero = AggregatedProfile {
            bins: vec![bin(100.0, 0.0, true)],
            max_volume: 0.0,
            poc_price: 100.0,
        };
        assert!(renderer.layout(&zero, &scale(), 800.0).is_empty());
    }
}
