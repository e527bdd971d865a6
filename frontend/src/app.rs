//! DiffaApp - owns the models, the router and the timers of the console

use futures::channel::mpsc::UnboundedReceiver;
use futures::{FutureExt, Stream, StreamExt, select};
use gloo_timers::future::IntervalStream;
use shared::HeatmapConfig;
use std::rc::Rc;
use zoon::*;

use crate::connection::HttpApi;
use crate::dataflow::{Relay, relay};
use crate::diffs::{DiffDetail, DiffsCollection, DiffsEvent, diff_detail, diff_list};
use crate::router::{BlobSelection, Route, Router};
use crate::visualizer::canvas::{HeatmapRenderer, heatmap_canvas};
use crate::visualizer::timeline::{BlobsModel, zoom_controls};

pub struct DiffaApp {
    pub config: HeatmapConfig,

    /// Bucket counts behind the heatmap
    pub blobs: BlobsModel<HttpApi>,

    /// Page of differences of the selected bucket
    pub diffs: DiffsCollection<HttpApi>,

    /// Content of the selected difference
    pub detail: DiffDetail<HttpApi>,

    pub router: Router,

    /// Bucket clicked on the heatmap
    pub navigation_requested_relay: Relay<BlobSelection>,

    // Dropping these stops polling and event routing.
    tasks: Vec<TaskHandle>,
}

impl DiffaApp {
    pub fn new(config: HeatmapConfig) -> Self {
        let api = Rc::new(HttpApi::new(&config));
        let blobs = BlobsModel::new(api.clone(), &config, chrono::Utc::now());
        let diffs = DiffsCollection::new(api.clone(), config.api.list_size);
        let detail = DiffDetail::new(api);
        let router = Router::new();
        let (navigation_requested_relay, navigation_requested_stream) = relay();

        let tasks = vec![
            Self::poll_blobs(&blobs, config.polling.blob_interval_ms),
            Self::poll_diffs(&diffs, config.polling.diff_interval_ms),
            Self::route_events(
                &diffs,
                &detail,
                &router,
                navigation_requested_stream,
            ),
        ];

        let initial_blobs = blobs.clone();
        Task::start(async move {
            let _ = initial_blobs.sync().await;
        });
        match router.initial_route() {
            Route::Blob(selection) => {
                let diffs = diffs.clone();
                Task::start(async move {
                    let _ = diffs.select(selection).await;
                });
            }
            Route::Index => {
                let diffs = diffs.clone();
                Task::start(async move {
                    let _ = diffs.sync(false).await;
                });
            }
        }

        DiffaApp {
            config,
            blobs,
            diffs,
            detail,
            router,
            navigation_requested_relay,
            tasks,
        }
    }

    fn poll_blobs(blobs: &BlobsModel<HttpApi>, interval_ms: u32) -> TaskHandle {
        let blobs = blobs.clone();
        Task::start_droppable(async move {
            let mut ticks = IntervalStream::new(interval_ms);
            while ticks.next().await.is_some() {
                blobs.periodic_sync().await;
                skip_missed_ticks(&mut ticks);
            }
        })
    }

    fn poll_diffs(diffs: &DiffsCollection<HttpApi>, interval_ms: u32) -> TaskHandle {
        let diffs = diffs.clone();
        Task::start_droppable(async move {
            let mut ticks = IntervalStream::new(interval_ms);
            while ticks.next().await.is_some() {
                let _ = diffs.sync(false).await;
                skip_missed_ticks(&mut ticks);
            }
        })
    }

    /// Heatmap clicks become hash changes, hash changes select a bucket and
    /// a selected difference is shown in the detail panel.
    fn route_events(
        diffs: &DiffsCollection<HttpApi>,
        detail: &DiffDetail<HttpApi>,
        router: &Router,
        navigation_requested_stream: UnboundedReceiver<BlobSelection>,
    ) -> TaskHandle {
        let diffs = diffs.clone();
        let detail = detail.clone();
        let route_changed_relay = router.route_changed_relay.clone();
        let mut route_changed = router.subscribe();
        let mut diffs_changed = diffs.subscribe();
        let mut navigation_requested = navigation_requested_stream;

        Task::start_droppable(async move {
            loop {
                select! {
                    selection = navigation_requested.next() => {
                        let Some(selection) = selection else { break };
                        Router::navigate_with(&route_changed_relay, &Route::Blob(selection));
                    }
                    route = route_changed.next() => {
                        let Some(route) = route else { break };
                        if let Route::Blob(selection) = route {
                            let diffs = diffs.clone();
                            Task::start(async move {
                                let _ = diffs.select(selection).await;
                            });
                        }
                    }
                    event = diffs_changed.next() => {
                        match event {
                            Some(DiffsEvent::SelectedEventChanged(event)) => {
                                Task::start(detail.show(event));
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                    complete => break,
                }
            }
        })
    }

    /// Stops the timers and the event routing.
    pub fn shutdown(&mut self) {
        self.tasks.clear();
    }

    /// Root UI element
    pub fn root(&self) -> impl Element + use<> {
        let heatmap = Row::new()
            .s(Width::fill())
            .s(Gap::new().x(8))
            .item(heatmap_canvas(
                self.blobs.clone(),
                HeatmapRenderer::from_config(&self.config),
                self.navigation_requested_relay.clone(),
            ))
            .item(zoom_controls(self.blobs.clone()));

        Column::new()
            .s(Width::fill())
            .s(Height::screen())
            .s(Gap::new().y(12))
            .s(Padding::all(12))
            .s(Font::new().family([
                FontFamily::new("Inter"),
                FontFamily::new("system-ui"),
                FontFamily::new("Segoe UI"),
                FontFamily::new("Arial"),
                FontFamily::SansSerif,
            ]))
            .item(heatmap)
            .item(
                Row::new()
                    .s(Width::fill())
                    .s(Gap::new().x(12))
                    .s(Align::new().top())
                    .item(diff_list(self.diffs.clone()))
                    .item(diff_detail(self.detail.clone(), self.diffs.clone())),
            )
    }
}

/// Drops the ticks that queued up while a slow sync was in flight, so the
/// next sync waits for a fresh tick instead of running back-to-back.
fn skip_missed_ticks<S: Stream + Unpin>(ticks: &mut S) {
    while let Some(Some(_)) = ticks.next().now_or_never() {}
}
