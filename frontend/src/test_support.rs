//! Scripted [`DiffaApi`] for model tests
//!
//! Every call is recorded. Responses are queued per endpoint, either already
//! resolved (`respond_*`) or held back until the test completes them through
//! the returned sender (`defer_*`).

use crate::connection::{DiffaApi, DiffsQuery, FetchError};
use chrono::{DateTime, Utc};
use futures::channel::oneshot;
use shared::{ContentSide, DiffsPage, PairDetails, RepairAction, ZoomResponse};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

pub type Reply<T> = oneshot::Sender<Result<T, FetchError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Zoom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bucketing: u32,
    },
    Diffs(DiffsQuery),
    PairDetails(String),
    EventContent(String, ContentSide),
    IgnoreEvent(String),
    EntityActions(String),
}

struct Script<T> {
    queue: VecDeque<oneshot::Receiver<Result<T, FetchError>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<T> Script<T> {
    fn respond(&mut self, result: Result<T, FetchError>) {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(result);
        self.queue.push_back(receiver);
    }

    fn defer(&mut self) -> Reply<T> {
        let (sender, receiver) = oneshot::channel();
        self.queue.push_back(receiver);
        sender
    }

    fn next(&mut self) -> Option<oneshot::Receiver<Result<T, FetchError>>> {
        self.queue.pop_front()
    }
}

async fn resolve<T>(
    receiver: Option<oneshot::Receiver<Result<T, FetchError>>>,
) -> Result<T, FetchError> {
    match receiver {
        Some(receiver) => receiver
            .await
            .unwrap_or_else(|_| Err(FetchError::Transport("reply dropped".to_string()))),
        None => Err(FetchError::Transport("no scripted response".to_string())),
    }
}

#[derive(Default)]
pub struct FakeApi {
    calls: RefCell<Vec<ApiCall>>,
    zoom: RefCell<Script<ZoomResponse>>,
    diffs: RefCell<Script<DiffsPage>>,
    pair_details: RefCell<Script<PairDetails>>,
    content: RefCell<HashMap<(String, ContentSide), Script<Option<String>>>>,
    actions: RefCell<Script<Vec<RepairAction>>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.borrow().clone()
    }

    pub fn zoom_bucketings(&self) -> Vec<u32> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ApiCall::Zoom { bucketing, .. } => Some(*bucketing),
                _ => None,
            })
            .collect()
    }

    pub fn respond_zoom(&self, result: Result<ZoomResponse, FetchError>) {
        self.zoom.borrow_mut().respond(result);
    }

    pub fn defer_zoom(&self) -> Reply<ZoomResponse> {
        self.zoom.borrow_mut().defer()
    }

    pub fn respond_diffs(&self, result: Result<DiffsPage, FetchError>) {
        self.diffs.borrow_mut().respond(result);
    }

    pub fn respond_pair_details(&self, result: Result<PairDetails, FetchError>) {
        self.pair_details.borrow_mut().respond(result);
    }

    pub fn respond_content(
        &self,
        event_id: &str,
        side: ContentSide,
        result: Result<Option<String>, FetchError>,
    ) {
        self.content
            .borrow_mut()
            .entry((event_id.to_string(), side))
            .or_default()
            .respond(result);
    }

    pub fn defer_content(&self, event_id: &str, side: ContentSide) -> Reply<Option<String>> {
        self.content
            .borrow_mut()
            .entry((event_id.to_string(), side))
            .or_default()
            .defer()
    }

    pub fn respond_actions(&self, result: Result<Vec<RepairAction>, FetchError>) {
        self.actions.borrow_mut().respond(result);
    }

    fn record(&self, call: ApiCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl DiffaApi for FakeApi {
    async fn zoom(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bucketing: u32,
    ) -> Result<ZoomResponse, FetchError> {
        self.record(ApiCall::Zoom {
            start,
            end,
            bucketing,
        });
        let receiver = self.zoom.borrow_mut().next();
        resolve(receiver).await
    }

    async fn diffs(&self, query: &DiffsQuery) -> Result<DiffsPage, FetchError> {
        self.record(ApiCall::Diffs(query.clone()));
        let receiver = self.diffs.borrow_mut().next();
        resolve(receiver).await
    }

    async fn pair_details(&self, pair_key: &str) -> Result<PairDetails, FetchError> {
        self.record(ApiCall::PairDetails(pair_key.to_string()));
        let receiver = self.pair_details.borrow_mut().next();
        resolve(receiver).await
    }

    async fn event_content(
        &self,
        event_id: &str,
        side: ContentSide,
    ) -> Result<Option<String>, FetchError> {
        self.record(ApiCall::EventContent(event_id.to_string(), side));
        let receiver = self
            .content
            .borrow_mut()
            .get_mut(&(event_id.to_string(), side))
            .and_then(Script::next);
        resolve(receiver).await
    }

    async fn ignore_event(&self, event_id: &str) -> Result<(), FetchError> {
        self.record(ApiCall::IgnoreEvent(event_id.to_string()));
        Ok(())
    }

    async fn entity_actions(&self, pair_key: &str) -> Result<Vec<RepairAction>, FetchError> {
        self.record(ApiCall::EntityActions(pair_key.to_string()));
        let receiver = self.actions.borrow_mut().next();
        resolve(receiver).await
    }
}

pub fn zoom_response(entries: &[(&str, &[u32])]) -> ZoomResponse {
    entries
        .iter()
        .map(|(key, counts)| (key.to_string(), counts.to_vec()))
        .collect()
}
