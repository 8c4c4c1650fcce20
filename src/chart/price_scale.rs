/// Price to vertical pixel transform of a pane
pub trait PriceScale {
    /// `None` when the price cannot be placed (degenerate range)
    fn price_to_pixel(&self, price: f64) -> Option<f32>;
}

/// Linear price axis; higher prices map to smaller y
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPriceScale {
    min_price: f64,
    max_price: f64,
    top: f32,
    height: f32,
}

impl LinearPriceScale {
    pub fn new(min_price: f64, max_price: f64, top: f32, height: f32) -> Self {
        Self {
            min_price,
            max_price,
            top,
            height,
        }
    }

    /// Scale covering `[low, high]` with a fractional margin on both ends
    pub fn with_margin(low: f64, high: f64, margin: f64, top: f32, height: f32) -> Self {
        let pad = (high - low).abs() * margin;
        let pad = if pad > 0.0 { pad } else { low.abs().max(1.0) * margin.max(0.01) };
        Self::new(low - pad, high + pad, top, height)
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min_price, self.max_price)
    }

    pub fn pixel_to_price(&self, y: f32) -> Option<f64> {
        let span = self.max_price - self.min_price;
        if !(span > 0.0) || !(self.height > 0.0) {
            return None;
        }
        Some(self.max_price - ((y - self.top) as f64 / self.height as f64) * span)
    }
}

impl PriceScale for LinearPriceScale {
    fn price_to_pixel(&self, price: f64) -> Option<f32> {
        let span = self.max_price - self.min_price;
        if !(span > 0.0) || !price.is_finite() {
            return None;
        }
        let ratio = (self.max_price - price) / span;
        Some(self.top + (ratio * self.height as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_axis() {
        let scale = LinearPriceScale::new(100.0, 200.0, 0.0, 100.0);
        assert_eq!(scale.price_to_pixel(200.0), Some(0.0));
        assert_eq!(scale.price_to_pixel(100.0), Some(100.0));
        assert_eq!(scale.price_to_pixel(150.0), Some(50.0));
        assert_eq!(scale.pixel_to_price(25.0), Some(175.0));
    }

    #[test]
    fn test_degenerate_range() {
        let scale = LinearPriceScale::new(5.0, 5.0, 0.0, 100.0);
        assert_eq!(scale.price_to_pixel(5.0), None);

        let padded = LinearPriceScale::with_margin(5.0, 5.0, 0.1, 0.0, 100.0);
        assert!(padded.price_to_pixel(5.0).is_some());
    }
}
