use std::collections::{HashMap, HashSet};

use eframe::egui::Vec2;

use super::session::{Anchor, GestureSession, NodeSample};
use crate::config::SeparationConfig;

const NEGLIGIBLE_OFFSET: f32 = 1e-4;
/// Nodes this close to the anchor, in pixels, have no push direction.
const ANCHOR_DEAD_ZONE_PX: f32 = 0.5;

#[derive(Clone, Debug, Default)]
struct IdleTracker {
    home_since: Option<f64>,
    last_step: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct SeparationState {
    offsets: HashMap<String, Vec2>,
    idle: IdleTracker,
}

pub fn acceleration(width_px: f32, config: &SeparationConfig) -> f32 {
    if width_px <= config.accel_threshold_px || config.accel_threshold_px <= 0.0 {
        return 1.0;
    }
    (width_px / config.accel_threshold_px)
        .powf(config.accel_power)
        .min(config.max_accel)
        .max(1.0)
}

impl SeparationState {
    pub fn offset(&self, id: &str) -> Vec2 {
        self.offsets.get(id).copied().unwrap_or(Vec2::ZERO)
    }

    pub fn displacement(&self, id: &str, k: f32, unit_px: f32) -> Vec2 {
        self.offset(id) * (unit_px / k.max(f32::MIN_POSITIVE).sqrt())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn max_magnitude(&self) -> f32 {
        self.offsets
            .values()
            .map(|offset| offset.length())
            .fold(0.0, f32::max)
    }

    /// `delta_inc` is the change in `ln(scale)` since the previous frame. A
    /// locked anchor node keeps its offset for the whole gesture.
    pub fn accumulate(
        &mut self,
        session: &GestureSession,
        nodes: &[NodeSample<'_>],
        delta_inc: f32,
        config: &SeparationConfig,
    ) {
        if !delta_inc.is_finite() || delta_inc == 0.0 {
            return;
        }
        let pinned = session.anchor.as_ref().and_then(Anchor::locked_id);
        if delta_inc < 0.0 {
            self.retract(delta_inc, pinned, config);
            return;
        }

        let Some(anchor) = &session.anchor else {
            return;
        };
        let step = (delta_inc * config.push_gain).min(config.max_step);

        for node in nodes {
            let weight = session.locality_weight(node.id);
            if weight <= 0.0 || pinned == Some(node.id) {
                continue;
            }
            let away = node.screen - anchor.screen;
            if away.length_sq() < ANCHOR_DEAD_ZONE_PX * ANCHOR_DEAD_ZONE_PX {
                continue;
            }

            let push = away.normalized() * (step * weight * acceleration(node.width_px, config));
            let offset = self.offsets.entry(node.id.to_owned()).or_default();
            *offset = clamp_radius(*offset + push, config.max_radius);
        }
    }

    pub fn retract(&mut self, delta_inc: f32, pinned: Option<&str>, config: &SeparationConfig) {
        let shrink = (-delta_inc * config.shrink_rate).clamp(0.0, config.max_shrink_per_frame);
        if shrink <= 0.0 {
            return;
        }
        for (id, offset) in &mut self.offsets {
            if pinned != Some(id.as_str()) {
                *offset *= 1.0 - shrink;
            }
        }
        self.offsets
            .retain(|_, offset| offset.length() > NEGLIGIBLE_OFFSET);
    }

    pub fn retain_ids(&mut self, ids: &HashSet<&str>) {
        self.offsets.retain(|id, _| ids.contains(id.as_str()));
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
        self.idle = IdleTracker::default();
    }

    /// Relaxes offsets while the view rests near the home scale. Returns true
    /// when offsets changed.
    pub fn relax_idle(
        &mut self,
        now: f64,
        log_scale: f32,
        gesture_active: bool,
        pinned: Option<&str>,
        gain: f32,
        config: &SeparationConfig,
    ) -> bool {
        let home = config.home_scale.max(f32::MIN_POSITIVE).ln();
        if gesture_active || (log_scale - home).abs() > config.home_band {
            self.idle = IdleTracker::default();
            return false;
        }

        let home_since = *self.idle.home_since.get_or_insert(now);
        let last_step = self.idle.last_step.replace(now).unwrap_or(now);
        if now - home_since < f64::from(config.idle_delay_secs)
            || gain <= 0.0
            || self.offsets.is_empty()
        {
            return false;
        }

        let half_life = f64::from(config.idle_half_life_secs / gain);
        let elapsed = (now - last_step.max(home_since + f64::from(config.idle_delay_secs))).max(0.0);
        if elapsed <= 0.0 || half_life <= 0.0 {
            return false;
        }
        let factor = 0.5_f64.powf(elapsed / half_life) as f32;
        for (id, offset) in &mut self.offsets {
            if pinned != Some(id.as_str()) {
                *offset *= factor;
            }
        }
        self.offsets
            .retain(|_, offset| offset.length() > NEGLIGIBLE_OFFSET);
        true
    }
}

fn clamp_radius(offset: Vec2, max_radius: f32) -> Vec2 {
    let length = offset.length();
    if !length.is_finite() {
        return Vec2::ZERO;
    }
    if length > max_radius {
        offset * (max_radius / length)
    } else {
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::{Anchor, AnchorSource, GestureKind};
    use crate::engine::transform::{LogicalPoint, ZoomTransform};
    use eframe::egui::pos2;

    fn anchor() -> Anchor {
        Anchor {
            logical: LogicalPoint { x: 0.0, y: 0.0 },
            screen: pos2(0.0, 0.0),
            source: AnchorSource::Pointer,
            track: None,
        }
    }

    fn sample(id: &str, x: f32, y: f32, width_px: f32) -> NodeSample<'_> {
        NodeSample {
            id,
            screen: pos2(x, y),
            width_px,
        }
    }

    fn session(nodes: &[NodeSample<'_>]) -> GestureSession {
        GestureSession::start(
            GestureKind::Wheel,
            Some(anchor()),
            ZoomTransform::IDENTITY,
            nodes,
            320.0,
        )
    }

    #[test]
    fn zoom_in_grows_large_node_offset_up_to_cap() {
        let config = SeparationConfig::default();
        let nodes = [sample("big", 100.0, 0.0, 60.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();

        let mut previous = 0.0;
        for _ in 0..200 {
            state.accumulate(&session, &nodes, 0.01, &config);
            let magnitude = state.offset("big").length();
            let at_cap = (magnitude - config.max_radius).abs() < 1e-4;
            assert!(magnitude > previous || at_cap, "{magnitude} after {previous}");
            assert!(magnitude <= config.max_radius + 1e-5);
            previous = magnitude;
        }
        assert!((previous - config.max_radius).abs() < 1e-4);
        assert!(state.offset("big").x > 0.0);
    }

    #[test]
    fn zoom_out_shrinks_toward_zero_without_crossing() {
        let config = SeparationConfig::default();
        let nodes = [sample("big", 100.0, 0.0, 60.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        for _ in 0..20 {
            state.accumulate(&session, &nodes, 0.02, &config);
        }

        let mut previous = state.offset("big").length();
        let direction = state.offset("big").normalized();
        for _ in 0..50 {
            state.accumulate(&session, &nodes, -0.02, &config);
            let offset = state.offset("big");
            assert!(offset.length() < previous);
            assert!(offset.dot(direction) >= 0.0);
            previous = offset.length();
        }
    }

    #[test]
    fn single_frame_shrink_is_capped() {
        let config = SeparationConfig::default();
        let nodes = [sample("big", 100.0, 0.0, 60.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        state.accumulate(&session, &nodes, 0.1, &config);
        let before = state.offset("big").length();

        state.accumulate(&session, &nodes, -5.0, &config);
        let after = state.offset("big").length();
        assert!((after - before * (1.0 - config.max_shrink_per_frame)).abs() < 1e-5);
    }

    #[test]
    fn large_nodes_separate_more_than_small_ones() {
        let config = SeparationConfig::default();
        let nodes = [
            sample("small", 100.0, 0.0, 8.0),
            sample("large", -100.0, 0.0, 80.0),
        ];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        state.accumulate(&session, &nodes, 0.01, &config);
        assert!(state.offset("large").length() > state.offset("small").length() * 5.0);
    }

    #[test]
    fn offsets_stay_bounded_over_mixed_gestures() {
        let config = SeparationConfig::default();
        let ids = (0..40).map(|index| format!("n{index}")).collect::<Vec<_>>();
        let nodes = ids
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let angle = index as f32 * 0.7;
                sample(id, angle.cos() * 80.0, angle.sin() * 80.0, 20.0 + index as f32 * 4.0)
            })
            .collect::<Vec<_>>();
        let session = session(&nodes);
        let mut state = SeparationState::default();

        for frame in 0..500 {
            let delta = if frame % 7 < 5 { 0.3 } else { -0.05 };
            state.accumulate(&session, &nodes, delta, &config);
            assert!(state.max_magnitude() <= config.max_radius + 1e-5);
        }
    }

    #[test]
    fn pan_frames_do_not_touch_offsets() {
        let config = SeparationConfig::default();
        let nodes = [sample("a", 50.0, 50.0, 40.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        state.accumulate(&session, &nodes, 0.05, &config);
        let before = state.offset("a");
        state.accumulate(&session, &nodes, 0.0, &config);
        assert_eq!(state.offset("a"), before);
    }

    #[test]
    fn displacement_shrinks_with_square_root_of_scale() {
        let config = SeparationConfig::default();
        let nodes = [sample("a", 50.0, 0.0, 40.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        state.accumulate(&session, &nodes, 0.05, &config);
        let at_one = state.displacement("a", 1.0, config.unit_px);
        let at_four = state.displacement("a", 4.0, config.unit_px);
        assert!((at_four.length() * 2.0 - at_one.length()).abs() < 1e-4);
    }

    #[test]
    fn removed_nodes_lose_their_offsets() {
        let config = SeparationConfig::default();
        let nodes = [sample("a", 50.0, 0.0, 40.0), sample("b", -50.0, 0.0, 40.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        state.accumulate(&session, &nodes, 0.05, &config);
        assert_eq!(state.len(), 2);

        state.retain_ids(&HashSet::from(["a"]));
        assert_eq!(state.len(), 1);
        assert_eq!(state.offset("b"), Vec2::ZERO);
    }

    #[test]
    fn idle_decay_waits_then_halves_per_half_life() {
        let config = SeparationConfig::default();
        let nodes = [sample("a", 50.0, 0.0, 40.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        state.accumulate(&session, &nodes, 0.05, &config);
        let start = state.offset("a").length();

        assert!(!state.relax_idle(0.0, 0.0, false, None, 1.0, &config));
        assert!(!state.relax_idle(0.5, 0.0, false, None, 1.0, &config));
        let delay = f64::from(config.idle_delay_secs);
        let half_life = f64::from(config.idle_half_life_secs);
        assert!(state.relax_idle(delay + half_life, 0.0, false, None, 1.0, &config));
        assert!((state.offset("a").length() - start * 0.5).abs() < 1e-4);
    }

    #[test]
    fn idle_decay_needs_home_scale_and_gain() {
        let config = SeparationConfig::default();
        let nodes = [sample("a", 50.0, 0.0, 40.0)];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        state.accumulate(&session, &nodes, 0.05, &config);
        let start = state.offset("a");

        for step in 0..20 {
            state.relax_idle(step as f64, 1.0, false, None, 1.0, &config);
            state.relax_idle(step as f64, 0.0, false, None, 0.0, &config);
        }
        assert_eq!(state.offset("a"), start);
    }

    #[test]
    fn node_under_the_anchor_is_not_pushed() {
        let config = SeparationConfig::default();
        let nodes = [
            sample("under", 0.0, 0.0, 80.0),
            sample("nearly", 0.2, -0.1, 80.0),
            sample("beside", 60.0, 0.0, 80.0),
        ];
        let session = session(&nodes);
        let mut state = SeparationState::default();
        for _ in 0..100 {
            state.accumulate(&session, &nodes, 0.08, &config);
        }
        assert_eq!(state.offset("under"), Vec2::ZERO);
        assert_eq!(state.offset("nearly"), Vec2::ZERO);
        assert!(state.offset("beside").x > 0.0);
    }

    #[test]
    fn locked_anchor_node_keeps_its_offset() {
        let config = SeparationConfig::default();
        let free = [sample("w", 80.0, 0.0, 60.0)];
        let mut state = SeparationState::default();
        state.accumulate(&session(&free), &free, 0.05, &config);
        let before = state.offset("w");
        assert!(before.length() > 0.0);

        let nodes = [sample("w", 80.0, 0.0, 60.0), sample("v", -80.0, 0.0, 60.0)];
        let locked = Anchor {
            source: AnchorSource::Locked("w".to_owned()),
            ..anchor()
        };
        let session = GestureSession::start(
            GestureKind::Wheel,
            Some(locked),
            ZoomTransform::IDENTITY,
            &nodes,
            320.0,
        );
        for _ in 0..40 {
            state.accumulate(&session, &nodes, 0.1, &config);
        }
        assert_eq!(state.offset("w"), before);
        assert!(state.offset("v").x < 0.0);

        state.accumulate(&session, &nodes, -0.5, &config);
        assert_eq!(state.offset("w"), before);
        assert!(state.offset("v").length() < config.max_radius);
    }

    #[test]
    fn idle_relax_skips_the_pinned_node() {
        let config = SeparationConfig::default();
        let nodes = [sample("a", 50.0, 0.0, 40.0), sample("b", -50.0, 0.0, 40.0)];
        let mut state = SeparationState::default();
        state.accumulate(&session(&nodes), &nodes, 0.05, &config);
        let pinned = state.offset("a");
        let other = state.offset("b").length();

        let delay = f64::from(config.idle_delay_secs);
        let half_life = f64::from(config.idle_half_life_secs);
        state.relax_idle(0.0, 0.0, false, Some("a"), 1.0, &config);
        assert!(state.relax_idle(delay + half_life, 0.0, false, Some("a"), 1.0, &config));
        assert_eq!(state.offset("a"), pinned);
        assert!((state.offset("b").length() - other * 0.5).abs() < 1e-4);
    }
}
