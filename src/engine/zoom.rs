use eframe::egui::{Pos2, Vec2};

use super::transform::ZoomTransform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomEventKind {
    Start,
    Zoom,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomEvent {
    pub kind: ZoomEventKind,
    pub transform: ZoomTransform,
}

/// Owner of the live zoom transform, the raw value user input drives.
#[derive(Clone, Debug)]
pub struct ZoomBehavior {
    transform: ZoomTransform,
    min_scale: f32,
    max_scale: f32,
}

impl ZoomBehavior {
    pub fn new(transform: ZoomTransform, min_scale: f32, max_scale: f32) -> Self {
        let mut behavior = Self {
            transform,
            min_scale,
            max_scale,
        };
        behavior.transform.k = behavior.clamp_scale(transform.k);
        behavior
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    fn clamp_scale(&self, k: f32) -> f32 {
        if k.is_finite() {
            k.clamp(self.min_scale, self.max_scale)
        } else {
            self.transform.k
        }
    }

    /// Multiplies the scale by `factor`, keeping `point` under the pointer.
    pub fn scale_at(&mut self, factor: f32, point: Pos2) -> ZoomTransform {
        let current = self.transform;
        let k = self.clamp_scale(current.k * factor);
        let ratio = k / current.k;
        self.transform = ZoomTransform {
            k,
            x: point.x - (point.x - current.x) * ratio,
            y: point.y - (point.y - current.y) * ratio,
        };
        self.transform
    }

    pub fn translate_by(&mut self, delta: Vec2) -> ZoomTransform {
        self.transform = self.transform.translated(delta);
        self.transform
    }

    /// Replaces the transform without emitting events.
    pub fn replace(&mut self, transform: ZoomTransform) {
        self.transform = ZoomTransform {
            k: self.clamp_scale(transform.k),
            ..transform
        };
    }

    /// Programmatic change. Like any zoom change it produces a full
    /// start/zoom/end sequence that the caller must route through the
    /// gesture handlers.
    pub fn set_transform(&mut self, transform: ZoomTransform) -> [ZoomEvent; 3] {
        let before = self.transform;
        self.replace(transform);
        [
            ZoomEvent {
                kind: ZoomEventKind::Start,
                transform: before,
            },
            ZoomEvent {
                kind: ZoomEventKind::Zoom,
                transform: self.transform,
            },
            ZoomEvent {
                kind: ZoomEventKind::End,
                transform: self.transform,
            },
        ]
    }
}
