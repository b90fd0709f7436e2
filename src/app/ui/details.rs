use eframe::egui::{self, RichText, Ui};

use crate::papers::PaperNode;
use crate::scene::{NodeKind, SceneNode};
use crate::util::{format_count, short_title};

use super::super::ViewModel;

const GROUP_MEMBER_ROWS: usize = 40;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        let focus = self
            .engine
            .locked()
            .map(str::to_owned)
            .or_else(|| self.hovered.clone());
        let Some(focus) = focus else {
            ui.label("Hover a node, or click one to anchor zoom on it.");
            return;
        };

        let scene = self.engine.scene();
        let Some(node) = scene.index_of(&focus).and_then(|index| scene.nodes.get(index)) else {
            ui.label("The focused node is not part of the current view.");
            return;
        };

        if self.engine.locked() == Some(focus.as_str())
            && let Some(position) = self.engine.screen_position(&focus)
        {
            ui.small(format!(
                "anchored at ({:.0}, {:.0}): zoom keeps this node in place",
                position.x, position.y
            ));
        }

        match node.kind {
            NodeKind::Paper => match self.engine.dataset().paper(&node.id) {
                Some(paper) => draw_paper(ui, paper),
                None => {
                    ui.label("Paper record is no longer loaded.");
                }
            },
            NodeKind::Group => self.draw_group(ui, node),
        }
    }

    fn draw_group(&self, ui: &mut Ui, node: &SceneNode) {
        ui.label(RichText::new(&node.label).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Papers: {}", format_count(node.members as u64)));
        ui.label(format!("Citations: {}", format_count(node.weight as u64)));
        ui.label(format!("Earliest year: {}", node.year));
        ui.label("Zoom in near the group to open it.");

        let grouping = self.engine.grouping();
        let mut members = self
            .engine
            .dataset()
            .papers
            .iter()
            .filter(|paper| grouping.key_of(paper) == node.id)
            .collect::<Vec<_>>();
        members.sort_by(|a, b| b.citations.cmp(&a.citations).then_with(|| a.id.cmp(&b.id)));

        ui.separator();
        ui.label(RichText::new("Most cited members").strong());
        egui::ScrollArea::vertical()
            .id_salt("group_members_scroll")
            .max_height(360.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for paper in members.iter().take(GROUP_MEMBER_ROWS) {
                    ui.label(format!(
                        "{}  ({}, {})",
                        short_title(&paper.title, 48),
                        paper.year,
                        format_count(paper.citations)
                    ))
                    .on_hover_text(paper.title.as_str());
                }
                if members.len() > GROUP_MEMBER_ROWS {
                    ui.small(format!("and {} more", members.len() - GROUP_MEMBER_ROWS));
                }
            });
    }
}

fn draw_paper(ui: &mut Ui, paper: &PaperNode) {
    ui.label(RichText::new(&paper.title).strong());
    ui.small(paper.id.as_str());
    ui.add_space(6.0);

    ui.label(format!("Year: {}", paper.year));
    ui.label(format!("Field: {}", paper.field));
    ui.label(format!(
        "Citations: {} (z {:+.2})",
        format_count(paper.citations),
        paper.z_score
    ));
    if !paper.authors.is_empty() {
        ui.label(format!("Authors: {}", paper.authors));
    }
    if !paper.institutions.is_empty() {
        ui.label(format!("Institutions: {}", paper.institutions));
    }

    if !paper.summary.is_empty() {
        ui.separator();
        ui.label(RichText::new("Summary").strong());
        egui::ScrollArea::vertical()
            .id_salt("paper_summary_scroll")
            .max_height(280.0)
            .show(ui, |ui| {
                ui.label(paper.summary.as_str());
            });
    }
}
