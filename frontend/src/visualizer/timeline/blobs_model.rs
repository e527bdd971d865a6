//! Bucketed difference counts for the visible time range
//!
//! The model owns the swimlane layout and the polling flag. Every change is
//! announced on `blobs_changed_relay`; views never mutate the state directly.

use crate::connection::{DiffaApi, FetchError};
use crate::dataflow::Relay;
use crate::logging::log_error;
use crate::visualizer::grid::{BucketMatrix, merge_swimlanes};
use chrono::{DateTime, TimeDelta, Utc};
use futures::channel::mpsc::UnboundedReceiver;
use shared::{HeatmapConfig, MAX_BUCKET_SIZE_SECONDS, next_whole_hour};
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use zoon::{Mutable, Signal};

#[derive(Debug, Clone, PartialEq)]
pub enum BlobsEvent {
    BucketsChanged,
    MaxRowsChanged(usize),
    PollingChanged(bool),
    BucketSizeChanged(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlobsState {
    /// Seconds covered by one column at the current zoom.
    pub bucket_size: u32,
    /// Width `buckets` and `start_time` were fetched at; lags `bucket_size`
    /// until the resync after a zoom lands.
    pub matrix_bucket_size: u32,
    pub swimlane_labels: Vec<String>,
    /// Replaced wholesale on every successful sync.
    pub buckets: Arc<BucketMatrix>,
    /// High-water mark of swimlanes, never smaller than the default.
    pub max_rows: usize,
    pub polling: bool,
    /// Start of column 0.
    pub start_time: DateTime<Utc>,
}

impl BlobsState {
    /// Time range covered by `column`, `None` outside the grid.
    pub fn bucket_range(&self, column: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if column < 0 || column as usize >= self.buckets.columns() {
            return None;
        }
        let bucket = TimeDelta::seconds(i64::from(self.matrix_bucket_size));
        let start = self.start_time + bucket * column;
        Some((start, start + bucket))
    }

    pub fn can_zoom_in(&self) -> bool {
        self.bucket_size > 1
    }

    pub fn can_zoom_out(&self) -> bool {
        self.bucket_size < MAX_BUCKET_SIZE_SECONDS
    }
}

fn range_start(end: DateTime<Utc>, bucket_size: u32, columns: usize) -> DateTime<Utc> {
    end - TimeDelta::seconds(i64::from(bucket_size) * columns as i64)
}

pub struct BlobsModel<A> {
    api: Rc<A>,
    state: Mutable<BlobsState>,
    max_columns: usize,
    pub blobs_changed_relay: Relay<BlobsEvent>,
    /// Sequence number of the newest zoom request sent.
    latest_request: Rc<Cell<u64>>,
    /// Sequence number of the newest response applied to the state.
    latest_applied: Rc<Cell<u64>>,
}

impl<A> Clone for BlobsModel<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: self.state.clone(),
            max_columns: self.max_columns,
            blobs_changed_relay: self.blobs_changed_relay.clone(),
            latest_request: self.latest_request.clone(),
            latest_applied: self.latest_applied.clone(),
        }
    }
}

impl<A> BlobsModel<A>
where
    A: DiffaApi + 'static,
{
    pub fn new(api: Rc<A>, config: &HeatmapConfig, now: DateTime<Utc>) -> Self {
        let max_columns = config.grid.max_columns;
        let bucket_size = config.buckets.default_bucket_size;
        let state = BlobsState {
            bucket_size,
            matrix_bucket_size: bucket_size,
            swimlane_labels: Vec::new(),
            buckets: Arc::new(BucketMatrix::empty(max_columns)),
            max_rows: config.grid.default_max_rows,
            polling: true,
            start_time: range_start(next_whole_hour(now), bucket_size, max_columns),
        };
        Self {
            api,
            state: Mutable::new(state),
            max_columns,
            blobs_changed_relay: Relay::new(),
            latest_request: Rc::new(Cell::new(0)),
            latest_applied: Rc::new(Cell::new(0)),
        }
    }

    pub fn snapshot(&self) -> BlobsState {
        self.state.get_cloned()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<BlobsEvent> {
        self.blobs_changed_relay.subscribe()
    }

    pub fn state_signal(&self) -> impl Signal<Item = BlobsState> + use<A> {
        self.state.signal_cloned()
    }

    pub fn is_polling(&self) -> bool {
        self.state.lock_ref().polling
    }

    /// Fetches the `max_columns` buckets ending at the next whole hour.
    pub async fn sync(&self) -> Result<(), FetchError> {
        self.sync_at(Utc::now()).await
    }

    /// [`Self::sync`] with an explicit clock.
    ///
    /// A response is discarded when a newer request has already been applied,
    /// so overlapping polls can never roll the grid back. A response fetched
    /// at a bucket size the model has since zoomed away from is discarded too.
    pub async fn sync_at(&self, now: DateTime<Utc>) -> Result<(), FetchError> {
        let bucket_size = self.state.lock_ref().bucket_size;
        let end = next_whole_hour(now);
        let start = range_start(end, bucket_size, self.max_columns);

        let request = self.latest_request.get() + 1;
        self.latest_request.set(request);

        let result = self.api.zoom(start, end, bucket_size).await;
        let zoomed_away = self.state.lock_ref().bucket_size != bucket_size;
        if request < self.latest_applied.get() || zoomed_away {
            return Err(FetchError::StaleResponse);
        }
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                if !error.is_stale() {
                    log_error!("Failed to load difference buckets: {error}");
                }
                return Err(error);
            }
        };
        self.latest_applied.set(request);

        let max_rows_changed = {
            let mut state = self.state.lock_mut();
            let merged = merge_swimlanes(
                &state.swimlane_labels,
                state.max_rows,
                self.max_columns,
                &response,
            );
            let max_rows_changed = (merged.max_rows != state.max_rows).then_some(merged.max_rows);
            state.swimlane_labels = merged.labels;
            state.buckets = Arc::new(merged.buckets);
            state.max_rows = merged.max_rows;
            state.start_time = start;
            state.matrix_bucket_size = bucket_size;
            max_rows_changed
        };

        if let Some(max_rows) = max_rows_changed {
            self.blobs_changed_relay.send(BlobsEvent::MaxRowsChanged(max_rows));
        }
        self.blobs_changed_relay.send(BlobsEvent::BucketsChanged);
        Ok(())
    }

    /// One polling tick: syncs only while polling is enabled.
    pub async fn periodic_sync(&self) {
        if self.is_polling() {
            // Failures are already logged and the previous grid stays visible.
            let _ = self.sync().await;
        }
    }

    pub fn start_polling(&self) {
        self.set_polling(true);
    }

    pub fn stop_polling(&self) {
        self.set_polling(false);
    }

    pub fn toggle_polling(&self) {
        let polling = self.is_polling();
        self.set_polling(!polling);
    }

    fn set_polling(&self, polling: bool) {
        let changed = {
            let mut state = self.state.lock_mut();
            let changed = state.polling != polling;
            state.polling = polling;
            changed
        };
        if changed {
            self.blobs_changed_relay.send(BlobsEvent::PollingChanged(polling));
        }
    }

    /// Halves the bucket size (rounding up, never below one second) and
    /// returns the resync for the new resolution.
    ///
    /// The bucket size changes immediately; nothing is fetched when the size
    /// is already at its minimum.
    pub fn zoom_in(&self) -> impl Future<Output = ()> + use<A> {
        let current = self.state.lock_ref().bucket_size;
        let zoomed = (current > 1).then(|| current.div_ceil(2).max(1));
        self.rezoom(zoomed)
    }

    /// Doubles the bucket size up to 180 days and returns the resync.
    pub fn zoom_out(&self) -> impl Future<Output = ()> + use<A> {
        let current = self.state.lock_ref().bucket_size;
        let zoomed = (current < MAX_BUCKET_SIZE_SECONDS)
            .then(|| current.saturating_mul(2).min(MAX_BUCKET_SIZE_SECONDS));
        self.rezoom(zoomed)
    }

    fn rezoom(&self, bucket_size: Option<u32>) -> impl Future<Output = ()> + use<A> {
        if let Some(bucket_size) = bucket_size {
            self.state.lock_mut().bucket_size = bucket_size;
            self.blobs_changed_relay
                .send(BlobsEvent::BucketSizeChanged(bucket_size));
        }
        let model = bucket_size.map(|_| self.clone());
        async move {
            if let Some(model) = model {
                let _ = model.sync().await;
            }
        }
    }
}
