use eframe::egui::epaint::{Hsva, QuadraticBezierShape};
use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use crate::engine::ZoomTransform;
use crate::util::stable_unit;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Grid that follows the rendered transform so panning reads as movement.
pub(super) fn draw_background(painter: &Painter, rect: Rect, transform: ZoomTransform) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(17, 20, 27));

    let step = (64.0 * transform.k.sqrt().clamp(0.6, 1.8)).max(24.0);
    let origin = rect.min + transform.translation();
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(58, 66, 82, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Bounding-box test; a curve bulges at most `bulge` px past its chord.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, bulge: f32) -> bool {
    let bounds = Rect::from_two_pos(start, end).expand(bulge);
    bounds.intersects(rect)
}

/// Citation edge as a shallow arc bending to the left of its direction.
pub(super) fn curved_edge(start: Pos2, end: Pos2, stroke: Stroke) -> QuadraticBezierShape {
    let chord = end - start;
    let normal = vec2(-chord.y, chord.x) * 0.12;
    let control = start + chord * 0.5 + normal;
    QuadraticBezierShape::from_points_stroke(
        [start, control, end],
        false,
        Color32::TRANSPARENT,
        stroke,
    )
}

pub(super) fn local_to_screen(rect: Rect, local: Pos2) -> Pos2 {
    rect.min + local.to_vec2()
}

pub(super) fn screen_to_local(rect: Rect, screen: Pos2) -> Pos2 {
    Pos2::ZERO + (screen - rect.min)
}

fn normalize_log(value: f32, min: f32, max: f32) -> f32 {
    let min = min.max(1.0);
    let max = max.max(min);
    let value = value.max(1.0);

    let denominator = max.ln() - min.ln();
    if denominator.abs() < f32::EPSILON {
        return 0.5;
    }

    ((value.ln() - min.ln()) / denominator).clamp(0.0, 1.0)
}

/// Paper color along a cool-to-warm ramp by citation count.
pub(super) fn citation_color(citations: f32, min: f32, max: f32) -> Color32 {
    let t = normalize_log(citations, min, max);
    let r = (70.0 + (180.0 * t)) as u8;
    let g = (160.0 - (60.0 * t)) as u8;
    let b = (225.0 - (150.0 * t)) as u8;
    Color32::from_rgb(r, g, b)
}

/// Stable hue per group key.
pub(super) fn group_color(key: &str) -> Color32 {
    Hsva::new(stable_unit(key), 0.5, 0.82, 1.0).into()
}

pub(super) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

pub(super) fn label_offset(radius: f32) -> Vec2 {
    vec2(radius + 5.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::pos2;

    #[test]
    fn local_and_screen_coordinates_round_trip() {
        let rect = Rect::from_min_size(pos2(320.0, 40.0), vec2(800.0, 600.0));
        let local = pos2(12.0, 30.0);
        let screen = local_to_screen(rect, local);
        assert_eq!(screen, pos2(332.0, 70.0));
        assert_eq!(screen_to_local(rect, screen), local);
    }

    #[test]
    fn offscreen_edges_are_culled() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0));
        assert!(edge_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 50.0), 4.0));
        assert!(!edge_visible(rect, pos2(-50.0, -50.0), pos2(-10.0, -20.0), 4.0));
    }

    #[test]
    fn citation_color_is_monotonic_in_warmth() {
        let low = citation_color(1.0, 1.0, 1000.0);
        let high = citation_color(1000.0, 1.0, 1000.0);
        assert!(high.r() > low.r());
        assert!(high.b() < low.b());
        assert_eq!(citation_color(5.0, 3.0, 3.0), citation_color(9.0, 3.0, 3.0));
    }

    #[test]
    fn group_color_is_stable() {
        assert_eq!(group_color("field:Physics"), group_color("field:Physics"));
    }
}
