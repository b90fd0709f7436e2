use super::glue::{GlueOutcome, glue_correct, should_commit};
use super::separation::SeparationState;
use super::session::{GestureKind, GestureSession, NodeSample};
use super::transform::{Projection, ZoomTransform};
use crate::config::EngineConfig;

/// Gesture lifecycle. `Committing` covers the synthetic start/zoom/end
/// sequence of a programmatic transform change; nothing reacts to input in
/// that phase.
#[derive(Clone, Debug, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    Active(Box<GestureSession>),
    Committing {
        target: ZoomTransform,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameOutcome {
    /// Transform to render this frame.
    pub rendered: ZoomTransform,
    pub delta_inc: f32,
}

#[derive(Debug, Default)]
pub struct GestureController {
    phase: GesturePhase,
    pending_raw: Option<ZoomTransform>,
    frame_scheduled: bool,
}

impl GestureController {
    pub fn phase(&self) -> &GesturePhase {
        &self.phase
    }

    pub fn session(&self) -> Option<&GestureSession> {
        match &self.phase {
            GesturePhase::Active(session) => Some(session.as_ref()),
            _ => None,
        }
    }

    pub fn active_kind(&self) -> Option<GestureKind> {
        self.session().map(|session| session.kind)
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.phase, GesturePhase::Committing { .. })
    }

    pub fn frame_scheduled(&self) -> bool {
        self.frame_scheduled
    }

    /// Starts a fresh session. Ignored while committing; returns whether the
    /// session was accepted.
    pub fn on_gesture_start(&mut self, session: GestureSession) -> bool {
        if self.is_committing() {
            return false;
        }
        self.phase = GesturePhase::Active(Box::new(session));
        self.pending_raw = None;
        true
    }

    /// Records the latest raw transform. Returns true only when a frame must
    /// be scheduled; further input before that frame just replaces the
    /// pending value.
    pub fn on_gesture_input(&mut self, raw: ZoomTransform) -> bool {
        if self.is_committing() {
            return false;
        }
        self.pending_raw = Some(raw);
        if self.frame_scheduled {
            return false;
        }
        self.frame_scheduled = true;
        true
    }

    /// Runs the once-per-frame separation and glue step over the pending raw
    /// transform. `sample_nodes` yields the node samples at a transform.
    pub fn on_gesture_frame<'n, F>(
        &mut self,
        projection: &Projection,
        separation: &mut SeparationState,
        config: &EngineConfig,
        sample_nodes: F,
    ) -> Option<FrameOutcome>
    where
        F: FnOnce(ZoomTransform, &SeparationState) -> Vec<NodeSample<'n>>,
    {
        if !std::mem::take(&mut self.frame_scheduled) {
            return None;
        }
        let raw = self.pending_raw.take()?;

        let GesturePhase::Active(session) = &mut self.phase else {
            return Some(FrameOutcome {
                rendered: raw,
                delta_inc: 0.0,
            });
        };

        let delta_inc = session.advance(raw.log_scale());
        if !session.is_scale_gesture() {
            return Some(FrameOutcome {
                rendered: raw,
                delta_inc: 0.0,
            });
        }

        let freeze = config.glue.freeze_vertical_at_zero_gain && config.separation_gain <= 0.0;
        let rendered = match glue_correct(projection, session, raw, freeze) {
            GlueOutcome::Corrected { transform, .. } => {
                session.corrected = Some(transform);
                transform
            }
            GlueOutcome::PassThrough(transform) => transform,
        };

        let nodes = sample_nodes(rendered, separation);
        separation.accumulate(session, &nodes, delta_inc, &config.separation);

        Some(FrameOutcome {
            rendered,
            delta_inc,
        })
    }

    /// Ends the active gesture. Returns the transform to commit when the
    /// accumulated correction is large enough; the controller is then in
    /// `Committing` until [`Self::finish_commit`].
    pub fn on_gesture_end(
        &mut self,
        raw: ZoomTransform,
        config: &EngineConfig,
    ) -> Option<ZoomTransform> {
        if !matches!(self.phase, GesturePhase::Active(_)) {
            return None;
        }
        let GesturePhase::Active(session) = std::mem::take(&mut self.phase) else {
            return None;
        };
        self.pending_raw = None;
        self.frame_scheduled = false;

        let target = session.corrected?;
        let drift = raw.translation() - target.translation();
        if should_commit(drift, config.separation_gain, config.glue.commit_epsilon_px) {
            tracing::debug!(dx = drift.x, dy = drift.y, "committing glue correction");
            self.phase = GesturePhase::Committing { target };
            Some(target)
        } else {
            tracing::debug!(drift = drift.length(), "discarding negligible glue correction");
            None
        }
    }

    /// Enters `Committing` for a programmatic change, dropping any gesture
    /// in flight.
    pub fn begin_commit(&mut self, target: ZoomTransform) {
        self.pending_raw = None;
        self.frame_scheduled = false;
        self.phase = GesturePhase::Committing { target };
    }

    pub fn finish_commit(&mut self) {
        if self.is_committing() {
            self.phase = GesturePhase::Idle;
        }
    }

    /// Drops the active gesture and any scheduled frame without committing.
    pub fn cancel(&mut self) {
        if !self.is_committing() {
            self.phase = GesturePhase::Idle;
        }
        self.pending_raw = None;
        self.frame_scheduled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::Anchor;
    use crate::engine::transform::AxisScale;
    use crate::engine::zoom::{ZoomBehavior, ZoomEventKind};
    use eframe::egui::pos2;

    fn projection() -> Projection {
        Projection::new(
            AxisScale::linear((2000.0, 2020.0), (-600.0, 600.0)),
            AxisScale::linear((0.0, 5.0), (-200.0, 200.0)),
            1.0,
            0.6,
        )
    }

    fn start_session(controller: &mut GestureController, transform: ZoomTransform) {
        let anchor = Anchor::resolve(&projection(), transform, None, Some(pos2(500.0, 300.0)));
        let session = GestureSession::start(GestureKind::Wheel, anchor, transform, &[], 320.0);
        assert!(controller.on_gesture_start(session));
    }

    fn no_nodes<'n>(_: ZoomTransform, _: &SeparationState) -> Vec<NodeSample<'n>> {
        Vec::new()
    }

    #[test]
    fn input_between_frames_coalesces_into_one_frame() {
        let config = EngineConfig::default();
        let mut controller = GestureController::default();
        let mut separation = SeparationState::default();
        start_session(&mut controller, ZoomTransform::IDENTITY);

        assert!(controller.on_gesture_input(ZoomTransform::new(1.1, 0.0, 0.0)));
        assert!(!controller.on_gesture_input(ZoomTransform::new(1.2, 0.0, 0.0)));
        assert!(!controller.on_gesture_input(ZoomTransform::new(1.3, 0.0, 0.0)));

        let outcome = controller
            .on_gesture_frame(&projection(), &mut separation, &config, no_nodes)
            .expect("one frame");
        assert!((outcome.delta_inc - 1.3_f32.ln()).abs() < 1e-5);
        assert!(
            controller
                .on_gesture_frame(&projection(), &mut separation, &config, no_nodes)
                .is_none()
        );
        assert!(controller.on_gesture_input(ZoomTransform::new(1.4, 0.0, 0.0)));
    }

    #[test]
    fn pure_pan_renders_raw_and_skips_separation() {
        let config = EngineConfig::default();
        let mut controller = GestureController::default();
        let mut separation = SeparationState::default();
        start_session(&mut controller, ZoomTransform::IDENTITY);

        let raw = ZoomTransform::new(1.0, 40.0, -25.0);
        controller.on_gesture_input(raw);
        let outcome = controller
            .on_gesture_frame(&projection(), &mut separation, &config, |_, _| {
                vec![NodeSample {
                    id: "a",
                    screen: pos2(520.0, 300.0),
                    width_px: 90.0,
                }]
            })
            .expect("frame");
        assert_eq!(outcome.rendered, raw);
        assert!(separation.is_empty());
        assert_eq!(controller.on_gesture_end(raw, &config), None);
    }

    #[test]
    fn synthetic_events_during_commit_are_ignored() {
        let config = EngineConfig::default();
        let mut controller = GestureController::default();
        let mut separation = SeparationState::default();
        let mut zoom = ZoomBehavior::new(ZoomTransform::new(1.0, 400.0, 300.0), 0.2, 12.0);
        start_session(&mut controller, zoom.transform());

        for _ in 0..10 {
            let raw = zoom.scale_at(1.1, pos2(560.0, 340.0));
            controller.on_gesture_input(raw);
            controller.on_gesture_frame(&projection(), &mut separation, &config, no_nodes);
        }
        let target = controller
            .on_gesture_end(zoom.transform(), &config)
            .expect("drift is large enough to commit");
        assert!(controller.is_committing());

        let mut restarted = 0;
        for event in zoom.set_transform(target) {
            match event.kind {
                ZoomEventKind::Start => {
                    let session = GestureSession::start(
                        GestureKind::Wheel,
                        None,
                        event.transform,
                        &[],
                        320.0,
                    );
                    if controller.on_gesture_start(session) {
                        restarted += 1;
                    }
                }
                ZoomEventKind::Zoom => assert!(!controller.on_gesture_input(event.transform)),
                ZoomEventKind::End => {
                    assert_eq!(controller.on_gesture_end(event.transform, &config), None);
                }
            }
        }
        assert_eq!(restarted, 0);
        assert!(controller.is_committing());

        controller.finish_commit();
        assert!(matches!(controller.phase(), GesturePhase::Idle));
        assert_eq!(zoom.transform(), target);
    }

    #[test]
    fn cancel_drops_scheduled_frame() {
        let config = EngineConfig::default();
        let mut controller = GestureController::default();
        let mut separation = SeparationState::default();
        start_session(&mut controller, ZoomTransform::IDENTITY);
        controller.on_gesture_input(ZoomTransform::new(2.0, 0.0, 0.0));
        controller.cancel();

        assert!(!controller.frame_scheduled());
        assert!(controller.session().is_none());
        assert!(
            controller
                .on_gesture_frame(&projection(), &mut separation, &config, no_nodes)
                .is_none()
        );
    }
}
