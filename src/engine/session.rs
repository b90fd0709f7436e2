use std::collections::HashMap;

use eframe::egui::{Pos2, Vec2};

use super::transform::{LogicalPoint, Projection, ZoomTransform};

/// Below this change in `ln(scale)` a gesture still counts as a pure pan.
const SCALE_EPSILON: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Wheel,
    Drag,
    Pinch,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnchorSource {
    Locked(String),
    Pointer,
}

/// The one reference point a gesture keeps visually fixed.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    pub logical: LogicalPoint,
    /// Where the anchor rendered when the gesture started.
    pub screen: Pos2,
    pub source: AnchorSource,
    pub track: Option<NodeTrack>,
}

/// Layout position of a locked node plus its separation displacement at
/// scale 1. The displacement shrinks with `1/sqrt(k)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeTrack {
    pub position: Vec2,
    pub spread: Vec2,
}

impl NodeTrack {
    pub fn base_at(&self, k: f32) -> Vec2 {
        self.position + self.spread / k.max(f32::MIN_POSITIVE).sqrt()
    }
}

impl Anchor {
    /// A locked node wins over the pointer.
    pub fn resolve(
        projection: &Projection,
        transform: ZoomTransform,
        locked: Option<(&str, NodeTrack)>,
        pointer: Option<Pos2>,
    ) -> Option<Self> {
        let anchor = match (locked, pointer) {
            (Some((id, track)), _) => {
                let logical = projection.base_to_logical(track.base_at(transform.k));
                Self {
                    logical,
                    screen: projection.forward(transform, logical),
                    source: AnchorSource::Locked(id.to_owned()),
                    track: Some(track),
                }
            }
            (None, Some(pointer)) => Self {
                logical: projection.inverse(transform, pointer),
                screen: pointer,
                source: AnchorSource::Pointer,
                track: None,
            },
            (None, None) => return None,
        };

        let finite = anchor.logical.x.is_finite()
            && anchor.logical.y.is_finite()
            && anchor.screen.is_finite();
        finite.then_some(anchor)
    }

    /// Logical point to hold at `anchor.screen` for a frame at scale `k`. A
    /// locked node is followed through its scale-dependent displacement.
    pub fn logical_at(&self, projection: &Projection, k: f32) -> LogicalPoint {
        match &self.track {
            Some(track) => projection.base_to_logical(track.base_at(k)),
            None => self.logical,
        }
    }

    pub fn locked_id(&self) -> Option<&str> {
        match &self.source {
            AnchorSource::Locked(id) => Some(id),
            AnchorSource::Pointer => None,
        }
    }
}

/// Per-frame view of a node as the gesture logic sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeSample<'a> {
    pub id: &'a str,
    pub screen: Pos2,
    pub width_px: f32,
}

#[derive(Clone, Debug)]
pub struct GestureSession {
    pub kind: GestureKind,
    pub anchor: Option<Anchor>,
    pub start_transform: ZoomTransform,
    start_log_scale: f32,
    last_log_scale: f32,
    scaled: bool,
    locality: HashMap<String, f32>,
    /// Glue-corrected transform of the latest frame, the commit candidate.
    pub corrected: Option<ZoomTransform>,
}

impl GestureSession {
    /// `locality_radius_px` is the falloff radius at scale 1; it shrinks
    /// with `1/sqrt(scale)`.
    pub fn start(
        kind: GestureKind,
        anchor: Option<Anchor>,
        transform: ZoomTransform,
        nodes: &[NodeSample<'_>],
        locality_radius_px: f32,
    ) -> Self {
        let log_scale = transform.log_scale();
        let radius = (locality_radius_px / transform.k.max(f32::MIN_POSITIVE).sqrt()).max(1.0);

        let locality = match &anchor {
            Some(anchor) => nodes
                .iter()
                .map(|node| {
                    let distance = (node.screen - anchor.screen).length() / radius;
                    (node.id.to_owned(), (-0.5 * distance * distance).exp())
                })
                .collect(),
            None => HashMap::new(),
        };

        Self {
            kind,
            anchor,
            start_transform: transform,
            start_log_scale: log_scale,
            last_log_scale: log_scale,
            scaled: false,
            locality,
            corrected: None,
        }
    }

    /// Moves the session to `log_scale` and returns the change since the
    /// previous frame.
    pub fn advance(&mut self, log_scale: f32) -> f32 {
        let delta = log_scale - self.last_log_scale;
        self.last_log_scale = log_scale;
        if (log_scale - self.start_log_scale).abs() > SCALE_EPSILON {
            self.scaled = true;
        }
        delta
    }

    pub fn delta_since_start(&self) -> f32 {
        self.last_log_scale - self.start_log_scale
    }

    /// True once the gesture changed the scale at all; pure pans stay false.
    pub fn is_scale_gesture(&self) -> bool {
        self.scaled
    }

    /// Nodes that were not on screen at gesture start do not separate.
    pub fn locality_weight(&self, id: &str) -> f32 {
        self.locality.get(id).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transform::AxisScale;
    use eframe::egui::{pos2, vec2};

    fn projection() -> Projection {
        Projection::new(
            AxisScale::linear((2000.0, 2020.0), (-500.0, 500.0)),
            AxisScale::linear((0.0, 4.0), (-200.0, 200.0)),
            1.0,
            0.5,
        )
    }

    #[test]
    fn locked_node_wins_over_pointer() {
        let transform = ZoomTransform::new(1.5, 300.0, 200.0);
        let anchor = Anchor::resolve(
            &projection(),
            transform,
            Some((
                "W1",
                NodeTrack {
                    position: vec2(250.0, -100.0),
                    spread: Vec2::ZERO,
                },
            )),
            Some(pos2(10.0, 10.0)),
        )
        .expect("anchor");

        assert_eq!(anchor.source, AnchorSource::Locked("W1".to_owned()));
        assert!((anchor.logical.x - 2015.0).abs() < 1e-3);
        assert!((anchor.logical.y - 1.0).abs() < 1e-4);
        let expected = projection().base_to_screen(transform, vec2(250.0, -100.0));
        assert!((anchor.screen - expected).length() < 1e-3);
    }

    #[test]
    fn locked_anchor_follows_shrinking_displacement() {
        let transform = ZoomTransform::new(1.0, 300.0, 200.0);
        let track = NodeTrack {
            position: vec2(100.0, 40.0),
            spread: vec2(60.0, -20.0),
        };
        let anchor = Anchor::resolve(&projection(), transform, Some(("W2", track)), None)
            .expect("anchor");
        assert_eq!(anchor.locked_id(), Some("W2"));

        let start = projection().base_to_logical(vec2(160.0, 20.0));
        assert!((anchor.logical.x - start.x).abs() < 1e-3);
        let at_four = anchor.logical_at(&projection(), 4.0);
        let expected = projection().base_to_logical(vec2(130.0, 30.0));
        assert!((at_four.x - expected.x).abs() < 1e-3);
        assert!((at_four.y - expected.y).abs() < 1e-4);
    }

    #[test]
    fn pointer_anchor_uses_inverse_at_start_transform() {
        let transform = ZoomTransform::new(2.0, -40.0, 90.0);
        let pointer = pos2(412.0, 305.0);
        let anchor = Anchor::resolve(&projection(), transform, None, Some(pointer)).expect("anchor");
        assert_eq!(anchor.screen, pointer);
        let back = projection().forward(transform, anchor.logical);
        assert!((back - pointer).length() < 1e-3);
    }

    #[test]
    fn no_lock_and_no_pointer_has_no_anchor() {
        assert!(Anchor::resolve(&projection(), ZoomTransform::IDENTITY, None, None).is_none());
    }

    #[test]
    fn locality_falls_off_with_distance_and_shrinks_with_scale() {
        let anchor = Anchor {
            logical: LogicalPoint { x: 0.0, y: 0.0 },
            screen: pos2(0.0, 0.0),
            source: AnchorSource::Pointer,
            track: None,
        };
        let nodes = [
            NodeSample {
                id: "near",
                screen: pos2(10.0, 0.0),
                width_px: 10.0,
            },
            NodeSample {
                id: "far",
                screen: pos2(600.0, 0.0),
                width_px: 10.0,
            },
        ];

        let zoomed_out = GestureSession::start(
            GestureKind::Wheel,
            Some(anchor.clone()),
            ZoomTransform::IDENTITY,
            &nodes,
            320.0,
        );
        assert!(zoomed_out.locality_weight("near") > 0.99);
        assert!(zoomed_out.locality_weight("far") < zoomed_out.locality_weight("near"));
        assert_eq!(zoomed_out.locality_weight("missing"), 0.0);

        let zoomed_in = GestureSession::start(
            GestureKind::Wheel,
            Some(anchor),
            ZoomTransform::new(4.0, 0.0, 0.0),
            &nodes,
            320.0,
        );
        assert!(zoomed_in.locality_weight("far") < zoomed_out.locality_weight("far"));
    }

    #[test]
    fn advance_reports_incremental_log_delta() {
        let mut session =
            GestureSession::start(GestureKind::Pinch, None, ZoomTransform::IDENTITY, &[], 320.0);
        assert!(!session.is_scale_gesture());
        assert_eq!(session.advance(0.0), 0.0);
        assert!(!session.is_scale_gesture());

        let first = session.advance(0.2);
        let second = session.advance(0.5);
        assert!((first - 0.2).abs() < 1e-6);
        assert!((second - 0.3).abs() < 1e-6);
        assert!((session.delta_since_start() - 0.5).abs() < 1e-6);
        assert!(session.is_scale_gesture());
    }
}
