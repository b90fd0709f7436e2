use eframe::egui::{Pos2, Vec2, pos2, vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransform {
    pub k: f32,
    pub x: f32,
    pub y: f32,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn new(k: f32, x: f32, y: f32) -> Self {
        Self { k, x, y }
    }

    pub fn centered(viewport: Vec2, k: f32) -> Self {
        Self {
            k,
            x: viewport.x * 0.5,
            y: viewport.y * 0.5,
        }
    }

    pub fn log_scale(&self) -> f32 {
        self.k.max(f32::MIN_POSITIVE).ln()
    }

    pub fn translation(&self) -> Vec2 {
        vec2(self.x, self.y)
    }

    pub fn translated(self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisScale {
    domain: (f32, f32),
    range: (f32, f32),
}

impl AxisScale {
    pub const IDENTITY: Self = Self {
        domain: (0.0, 1.0),
        range: (0.0, 1.0),
    };

    pub fn linear(domain: (f32, f32), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    fn is_degenerate(&self) -> bool {
        (self.domain.1 - self.domain.0).abs() <= f32::EPSILON
    }

    pub fn apply(&self, value: f32) -> f32 {
        if self.is_degenerate() {
            return (self.range.0 + self.range.1) * 0.5;
        }
        let t = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, base: f32) -> f32 {
        let span = self.range.1 - self.range.0;
        if self.is_degenerate() || span.abs() <= f32::EPSILON {
            return self.domain.0;
        }
        let t = (base - self.range.0) / span;
        self.domain.0 + t * (self.domain.1 - self.domain.0)
    }
}

/// 0 at gain 0, 1 at gain 1, monotonic in between.
pub fn blend_factor(gain: f32) -> f32 {
    let gain = if gain.is_finite() {
        gain.clamp(0.0, 1.0)
    } else {
        0.0
    };
    1.0 - (1.0 - gain) * (1.0 - gain)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendedAxis {
    pub scale: AxisScale,
    pub participation: f32,
}

impl BlendedAxis {
    pub fn new(scale: AxisScale, participation: f32) -> Self {
        Self {
            scale,
            participation: participation.clamp(0.0, 1.0),
        }
    }

    pub fn effective_scale(&self, k: f32) -> f32 {
        1.0 + self.participation * (k - 1.0)
    }

    pub fn base_to_pixel(&self, k: f32, translate: f32, base: f32) -> f32 {
        base * self.effective_scale(k) + translate
    }

    pub fn pixel_to_base(&self, k: f32, translate: f32, pixel: f32) -> f32 {
        (pixel - translate) / self.effective_scale(k)
    }

    pub fn forward(&self, k: f32, translate: f32, value: f32) -> f32 {
        self.base_to_pixel(k, translate, self.scale.apply(value))
    }

    pub fn inverse(&self, k: f32, translate: f32, pixel: f32) -> f32 {
        self.scale.invert(self.pixel_to_base(k, translate, pixel))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogicalPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub x: BlendedAxis,
    pub y: BlendedAxis,
}

impl Projection {
    pub fn new(
        x_scale: AxisScale,
        y_scale: AxisScale,
        time_participation: f32,
        separation_gain: f32,
    ) -> Self {
        Self {
            x: BlendedAxis::new(x_scale, time_participation),
            y: BlendedAxis::new(y_scale, blend_factor(separation_gain)),
        }
    }

    pub fn forward(&self, transform: ZoomTransform, point: LogicalPoint) -> Pos2 {
        pos2(
            self.x.forward(transform.k, transform.x, point.x),
            self.y.forward(transform.k, transform.y, point.y),
        )
    }

    pub fn inverse(&self, transform: ZoomTransform, pixel: Pos2) -> LogicalPoint {
        LogicalPoint {
            x: self.x.inverse(transform.k, transform.x, pixel.x),
            y: self.y.inverse(transform.k, transform.y, pixel.y),
        }
    }

    pub fn base_to_screen(&self, transform: ZoomTransform, base: Vec2) -> Pos2 {
        pos2(
            self.x.base_to_pixel(transform.k, transform.x, base.x),
            self.y.base_to_pixel(transform.k, transform.y, base.y),
        )
    }

    pub fn base_to_logical(&self, base: Vec2) -> LogicalPoint {
        LogicalPoint {
            x: self.x.scale.invert(base.x),
            y: self.y.scale.invert(base.y),
        }
    }
}

pub fn node_screen_radius(radius: f32, k: f32, exponent: f32) -> f32 {
    radius * k.max(f32::MIN_POSITIVE).powf(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()))
    }

    fn timeline_projection(gain: f32) -> Projection {
        Projection::new(
            AxisScale::linear((1990.0, 2020.0), (-800.0, 800.0)),
            AxisScale::linear((0.0, 6.0), (-270.0, 270.0)),
            1.0,
            gain,
        )
    }

    fn transforms() -> Vec<ZoomTransform> {
        let mut transforms = Vec::new();
        for k in [0.2_f32, 0.5, 1.0, 1.7, 4.0, 12.0] {
            for (x, y) in [(0.0, 0.0), (400.0, 300.0), (-1250.5, 88.25), (3100.0, -640.0)] {
                transforms.push(ZoomTransform::new(k, x, y));
            }
        }
        transforms
    }

    #[test]
    fn inverse_undoes_forward_on_both_axes() {
        for gain in [0.0, 0.5, 1.0] {
            let projection = timeline_projection(gain);
            for transform in transforms() {
                for year in [1990.0_f32, 1997.5, 2008.0, 2020.0, 2031.0] {
                    for lane in [-1.0_f32, 0.0, 2.35, 6.0] {
                        let point = LogicalPoint { x: year, y: lane };
                        let pixel = projection.forward(transform, point);
                        let back = projection.inverse(transform, pixel);
                        assert!(close(back.x, year, 1e-5), "gain {gain} {transform:?}");
                        assert!(close(back.y, lane, 1e-4), "gain {gain} {transform:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn forward_undoes_inverse_for_pixels() {
        let projection = timeline_projection(0.5);
        for transform in transforms() {
            for pixel in [pos2(0.0, 0.0), pos2(412.5, 299.0), pos2(-30.0, 1200.0)] {
                let back = projection.forward(transform, projection.inverse(transform, pixel));
                assert!(close(back.x, pixel.x, 1e-4));
                assert!(close(back.y, pixel.y, 1e-4));
            }
        }
    }

    #[test]
    fn zero_gain_makes_lane_axis_pan_only() {
        let projection = timeline_projection(0.0);
        let point = LogicalPoint { x: 2000.0, y: 3.0 };
        let near = projection.forward(ZoomTransform::new(1.0, 10.0, 20.0), point);
        let far = projection.forward(ZoomTransform::new(5.0, 10.0, 20.0), point);
        assert_eq!(near.y, far.y);
        assert_ne!(near.x, far.x);
    }

    #[test]
    fn full_gain_matches_plain_zoom() {
        let projection = timeline_projection(1.0);
        let transform = ZoomTransform::new(2.5, 40.0, -15.0);
        let base = vec2(120.0, -60.0);
        let pixel = projection.base_to_screen(transform, base);
        assert!(close(pixel.x, 120.0 * 2.5 + 40.0, 1e-6));
        assert!(close(pixel.y, -60.0 * 2.5 - 15.0, 1e-6));
    }

    #[test]
    fn blend_factor_is_monotonic_with_fixed_ends() {
        assert_eq!(blend_factor(0.0), 0.0);
        assert_eq!(blend_factor(1.0), 1.0);
        assert!(blend_factor(0.99) > 0.99);
        let mut previous = -1.0;
        for step in 0..=100 {
            let value = blend_factor(step as f32 / 100.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn degenerate_axis_maps_to_range_middle() {
        let scale = AxisScale::linear((2001.0, 2001.0), (-100.0, 100.0));
        assert_eq!(scale.apply(2001.0), 0.0);
        assert_eq!(scale.invert(0.0), 2001.0);
    }

    #[test]
    fn centered_transform_puts_origin_mid_viewport() {
        let projection = Projection::new(AxisScale::IDENTITY, AxisScale::IDENTITY, 1.0, 0.3);
        let transform = ZoomTransform::centered(vec2(800.0, 600.0), 0.8);
        assert_eq!(projection.base_to_screen(transform, Vec2::ZERO), pos2(400.0, 300.0));
    }
}
