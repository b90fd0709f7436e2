use eframe::egui::Pos2;

use crate::config::SemanticConfig;
use crate::scene::ActiveView;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemanticAction {
    DrillIn { group: String },
    DrillOut,
}

/// A group as rendered this frame: screen center and layout radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupTarget<'a> {
    pub id: &'a str,
    pub center: Pos2,
    pub radius: f32,
}

/// Decides whether the current zoom level switches between the galaxy and
/// detail views. Drill-in needs the pointer within reach of a group; the
/// closest group in reach wins.
pub fn evaluate(
    view: &ActiveView,
    scale: f32,
    pointer: Option<Pos2>,
    groups: &[GroupTarget<'_>],
    config: &SemanticConfig,
) -> Option<SemanticAction> {
    if !config.enabled {
        return None;
    }

    match view {
        ActiveView::Galaxy if scale > config.drill_in_scale => {
            let pointer = pointer?;
            groups
                .iter()
                .filter_map(|group| {
                    let distance = group.center.distance(pointer);
                    let reach = group.radius * config.reach_factor + config.reach_margin_px;
                    (distance <= reach).then_some((distance, group.id))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, id)| SemanticAction::DrillIn {
                    group: id.to_owned(),
                })
        }
        ActiveView::Detail { .. } if scale < config.drill_out_scale => Some(SemanticAction::DrillOut),
        _ => None,
    }
}
