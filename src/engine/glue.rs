use eframe::egui::Vec2;

use super::session::GestureSession;
use super::transform::{Projection, ZoomTransform};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GlueOutcome {
    Corrected {
        transform: ZoomTransform,
        /// Translation removed from the raw transform.
        drift: Vec2,
    },
    /// No usable anchor; the raw transform renders unchanged.
    PassThrough(ZoomTransform),
}

impl GlueOutcome {
    pub fn transform(&self) -> ZoomTransform {
        match self {
            Self::Corrected { transform, .. } | Self::PassThrough(transform) => *transform,
        }
    }
}

/// Re-centers `raw` so the session anchor renders exactly where it did at
/// gesture start. With `freeze_vertical` the vertical translation stays at
/// its gesture-start value.
pub fn glue_correct(
    projection: &Projection,
    session: &GestureSession,
    raw: ZoomTransform,
    freeze_vertical: bool,
) -> GlueOutcome {
    let Some(anchor) = &session.anchor else {
        return GlueOutcome::PassThrough(raw);
    };

    let drift = projection.forward(raw, anchor.logical_at(projection, raw.k)) - anchor.screen;
    if !drift.is_finite() {
        return GlueOutcome::PassThrough(raw);
    }

    let mut corrected = raw.translated(-drift);
    if freeze_vertical {
        corrected.y = session.start_transform.y;
    }

    GlueOutcome::Corrected {
        transform: corrected,
        drift: raw.translation() - corrected.translation(),
    }
}

/// A correction is only worth a real transform change once the drift is
/// visible; smaller ones would show up as micro-jumps.
pub fn should_commit(drift: Vec2, separation_gain: f32, epsilon_px: f32) -> bool {
    drift.length() > epsilon_px * (1.0 + separation_gain.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::{Anchor, GestureKind, NodeTrack};
    use crate::engine::transform::AxisScale;
    use crate::engine::zoom::ZoomBehavior;
    use eframe::egui::{pos2, vec2};

    fn projection(gain: f32) -> Projection {
        Projection::new(
            AxisScale::linear((1995.0, 2025.0), (-800.0, 800.0)),
            AxisScale::linear((0.0, 8.0), (-360.0, 360.0)),
            1.0,
            gain,
        )
    }

    fn run_gesture(gain: f32, frames: usize, locked: Option<(&str, NodeTrack)>) {
        let projection = projection(gain);
        let start = ZoomTransform::new(1.3, 420.0, 260.0);
        let mut zoom = ZoomBehavior::new(start, 0.2, 12.0);
        let pointer = pos2(530.0, 340.0);
        let anchor = Anchor::resolve(&projection, start, locked, Some(pointer));
        let session = GestureSession::start(GestureKind::Wheel, anchor, start, &[], 320.0);
        let Some(anchor) = session.anchor.clone() else {
            panic!("anchor should resolve");
        };

        for frame in 0..frames {
            // The pointer wanders a little, as it does under a real wheel.
            let wander = vec2((frame as f32 * 0.9).sin() * 6.0, frame as f32 * 0.5);
            let raw = zoom.scale_at(1.07, pointer + wander);
            let corrected = glue_correct(&projection, &session, raw, false).transform();
            let rendered = match anchor.track {
                Some(track) => projection.base_to_screen(corrected, track.base_at(corrected.k)),
                None => projection.forward(corrected, anchor.logical),
            };
            assert!(
                (rendered - anchor.screen).length() < 1e-2,
                "gain {gain} frame {frame}: {rendered:?} vs {:?}",
                anchor.screen
            );
        }
    }

    #[test]
    fn anchor_stays_put_through_zoom_in() {
        for gain in [0.0, 0.35, 1.0] {
            for frames in [1, 3, 12, 30] {
                run_gesture(gain, frames, None);
                let resting = NodeTrack {
                    position: vec2(-120.0, 45.0),
                    spread: Vec2::ZERO,
                };
                let spread = NodeTrack {
                    position: vec2(-120.0, 45.0),
                    spread: vec2(90.0, -35.0),
                };
                run_gesture(gain, frames, Some(("W9", resting)));
                run_gesture(gain, frames, Some(("W9", spread)));
            }
        }
    }

    #[test]
    fn missing_anchor_passes_raw_through() {
        let session =
            GestureSession::start(GestureKind::Wheel, None, ZoomTransform::IDENTITY, &[], 320.0);
        let raw = ZoomTransform::new(2.0, 15.0, -8.0);
        assert_eq!(
            glue_correct(&projection(0.5), &session, raw, false),
            GlueOutcome::PassThrough(raw)
        );
    }

    #[test]
    fn frozen_vertical_keeps_start_translation() {
        let projection = projection(0.0);
        let start = ZoomTransform::new(1.0, 100.0, 80.0);
        let anchor = Anchor::resolve(&projection, start, None, Some(pos2(300.0, 200.0)));
        let session = GestureSession::start(GestureKind::Pinch, anchor, start, &[], 320.0);

        let mut zoom = ZoomBehavior::new(start, 0.2, 12.0);
        let raw = zoom.scale_at(1.5, pos2(300.0, 200.0));
        let corrected = glue_correct(&projection, &session, raw, true).transform();
        assert_eq!(corrected.y, start.y);
    }

    #[test]
    fn commit_threshold_scales_with_gain() {
        assert!(!should_commit(vec2(0.5, 0.5), 0.0, 0.75));
        assert!(should_commit(vec2(1.0, 0.0), 0.0, 0.75));
        assert!(!should_commit(vec2(1.0, 0.0), 1.0, 0.75));
        assert!(should_commit(vec2(1.6, 0.0), 1.0, 0.75));
    }
}
