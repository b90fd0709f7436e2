use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};

use crate::config::EngineConfig;
use crate::engine::MapEngine;
use crate::papers::{GroupAxes, PaperDataset, load_dataset};
use crate::scene::ActiveView;

mod graph;
mod render_utils;
mod ui;

/// Where the paper and citation records are read from.
#[derive(Clone, Debug)]
pub struct DataSource {
    pub nodes: PathBuf,
    pub edges: PathBuf,
}

pub struct CitemapApp {
    source: DataSource,
    config: EngineConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadedData>>,
}

enum AppState {
    Loading { rx: Receiver<LoadedData> },
    Ready(Box<ViewModel>),
}

/// A load never fails outright: unreadable input becomes an empty map and
/// the error is shown in the header.
struct LoadedData {
    dataset: PaperDataset,
    error: Option<String>,
}

struct ViewModel {
    engine: MapEngine,
    load_error: Option<String>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    hovered: Option<String>,
    grouping: GroupAxes,
    separation_gain: f32,
    pinching: bool,
    ranking_rows_visible: usize,
}

struct SearchMatchCache {
    query: String,
    view: ActiveView,
    grouping: GroupAxes,
    matches: Arc<HashSet<String>>,
}

impl CitemapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, source: DataSource, config: EngineConfig) -> Self {
        let state = AppState::Loading {
            rx: Self::spawn_load(source.clone()),
        };
        Self {
            source,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: DataSource) -> Receiver<LoadedData> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let loaded = match load_dataset(&source.nodes, &source.edges) {
                Ok(dataset) => LoadedData {
                    dataset,
                    error: None,
                },
                Err(error) => {
                    tracing::error!(error = ?error, "failed to load citation data");
                    LoadedData {
                        dataset: PaperDataset::default(),
                        error: Some(format!("{error:#}")),
                    }
                }
            };
            let _ = tx.send(loaded);
        });

        rx
    }
}

impl eframe::App for CitemapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(loaded) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            loaded,
                            self.config.clone(),
                        ))));
                    }
                    Err(TryRecvError::Disconnected) => {
                        tracing::error!("background load worker disconnected");
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            LoadedData {
                                dataset: PaperDataset::default(),
                                error: Some("Background load worker disconnected".to_owned()),
                            },
                            self.config.clone(),
                        ))));
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading citation map...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.source, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(loaded) => {
                            let now = ctx.input(|input| input.time);
                            model.replace_data(loaded, now);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            tracing::error!("background reload worker disconnected");
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
