use eframe::egui::{self, RichText, Ui};

use crate::util::{format_count, short_title};

use super::super::ViewModel;

const RANKING_PREFETCH_MARGIN: usize = 4;

impl ViewModel {
    /// Current nodes by citation weight; clicking a row anchors zoom on it.
    pub(in crate::app) fn draw_rankings(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Most cited in view").strong());

        let mut ranked = self
            .engine
            .scene()
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.label.clone(), node.weight))
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        if ranked.is_empty() {
            ui.label("Nothing to rank.");
            return;
        }

        let row_count = ranked.len().min(self.ranking_rows_visible);
        let mut should_load_more = false;
        let mut clicked = None;
        let locked = self.engine.locked().map(str::to_owned);

        egui::ScrollArea::vertical()
            .id_salt("ranking_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, 20.0, row_count, |ui, row_range| {
                if row_range.end + RANKING_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }
                for index in row_range {
                    let Some((id, label, weight)) = ranked.get(index) else {
                        continue;
                    };
                    let text = format!(
                        "{:>3}. {}  ({})",
                        index + 1,
                        short_title(label, 34),
                        format_count(*weight as u64)
                    );
                    let is_locked = locked.as_deref() == Some(id.as_str());
                    if ui
                        .selectable_label(is_locked, text)
                        .on_hover_text(label.as_str())
                        .clicked()
                    {
                        clicked = Some(id.clone());
                    }
                }
            });

        if should_load_more && row_count < ranked.len() {
            self.ranking_rows_visible = (row_count + Self::RANKING_PAGE_ROWS).min(ranked.len());
        }
        if let Some(id) = clicked {
            self.engine.toggle_lock(&id);
        }
    }
}
