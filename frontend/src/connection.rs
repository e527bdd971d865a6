//! REST connection to the reconciliation agent
//!
//! Every model talks to the agent through [`DiffaApi`], so the models can be
//! driven by in-memory fakes in tests and by [`HttpApi`] in the browser.

use chrono::{DateTime, Utc};
use shared::{ContentSide, DiffsPage, PairDetails, RepairAction, ZoomResponse, format_timestamp};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed with HTTP status {status}")]
    NetworkFailure { url: String, status: u16 },
    #[error("request could not be sent: {0}")]
    Transport(String),
    #[error("unexpected response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
    #[error("response was superseded by a newer request")]
    StaleResponse,
}

impl FetchError {
    /// Superseded requests are dropped without logging or touching state.
    pub fn is_stale(&self) -> bool {
        matches!(self, FetchError::StaleResponse)
    }
}

/// Parameters of one page of `GET /diffs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffsQuery {
    pub pair_key: String,
    pub range_start: String,
    pub range_end: String,
    pub offset: u32,
    pub length: u32,
}

#[allow(async_fn_in_trait)]
pub trait DiffaApi {
    async fn zoom(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bucketing: u32,
    ) -> Result<ZoomResponse, FetchError>;

    async fn diffs(&self, query: &DiffsQuery) -> Result<DiffsPage, FetchError>;

    async fn pair_details(&self, pair_key: &str) -> Result<PairDetails, FetchError>;

    /// `Ok(None)` when the participant returned no content.
    async fn event_content(
        &self,
        event_id: &str,
        side: ContentSide,
    ) -> Result<Option<String>, FetchError>;

    async fn ignore_event(&self, event_id: &str) -> Result<(), FetchError>;

    async fn entity_actions(&self, pair_key: &str) -> Result<Vec<RepairAction>, FetchError>;
}

/// URL layout of the agent's REST API under `<base>/<domain>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    root: String,
}

impl Endpoints {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn zoom(&self, start: DateTime<Utc>, end: DateTime<Utc>, bucketing: u32) -> String {
        format!(
            "{}/diffs/zoom?range-start={}&range-end={}&bucketing={}",
            self.root,
            format_timestamp(start),
            format_timestamp(end),
            bucketing
        )
    }

    pub fn diffs(&self, query: &DiffsQuery) -> String {
        format!(
            "{}/diffs?pairKey={}&range-start={}&range-end={}&offset={}&length={}",
            self.root,
            query.pair_key,
            query.range_start,
            query.range_end,
            query.offset,
            query.length
        )
    }

    pub fn pair(&self, pair_key: &str) -> String {
        format!("{}/config/pairs/{}", self.root, pair_key)
    }

    pub fn event(&self, event_id: &str) -> String {
        format!("{}/diffs/events/{}", self.root, event_id)
    }

    pub fn event_content(&self, event_id: &str, side: ContentSide) -> String {
        format!("{}/{}", self.event(event_id), side.as_str())
    }

    pub fn entity_actions(&self, pair_key: &str) -> String {
        format!("{}/actions/{}?scope=entity", self.root, pair_key)
    }
}

/// Browser implementation over `window.fetch`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    endpoints: Endpoints,
}

impl HttpApi {
    pub fn new(config: &shared::HeatmapConfig) -> Self {
        Self {
            endpoints: Endpoints::new(config.api_root()),
        }
    }
}

impl DiffaApi for HttpApi {
    async fn zoom(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bucketing: u32,
    ) -> Result<ZoomResponse, FetchError> {
        get_json(&self.endpoints.zoom(start, end, bucketing)).await
    }

    async fn diffs(&self, query: &DiffsQuery) -> Result<DiffsPage, FetchError> {
        get_json(&self.endpoints.diffs(query)).await
    }

    async fn pair_details(&self, pair_key: &str) -> Result<PairDetails, FetchError> {
        get_json(&self.endpoints.pair(pair_key)).await
    }

    async fn event_content(
        &self,
        event_id: &str,
        side: ContentSide,
    ) -> Result<Option<String>, FetchError> {
        // Dropping this future (superseded selection) cancels the browser request.
        let abort = AbortOnDrop::new()?;
        let url = self.endpoints.event_content(event_id, side);
        let response = send("GET", &url, Some(&abort.signal())).await?;
        let text = read_text(&url, &response).await?;
        Ok(Some(text).filter(|text| !text.is_empty()))
    }

    async fn ignore_event(&self, event_id: &str) -> Result<(), FetchError> {
        send("DELETE", &self.endpoints.event(event_id), None).await?;
        Ok(())
    }

    async fn entity_actions(&self, pair_key: &str) -> Result<Vec<RepairAction>, FetchError> {
        get_json(&self.endpoints.entity_actions(pair_key)).await
    }
}

struct AbortOnDrop(web_sys::AbortController);

impl AbortOnDrop {
    fn new() -> Result<Self, FetchError> {
        web_sys::AbortController::new()
            .map(Self)
            .map_err(|error| FetchError::Transport(describe_js_error(&error)))
    }

    fn signal(&self) -> web_sys::AbortSignal {
        self.0.signal()
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Fetches a text document relative to the page, e.g. the heatmap config.
pub async fn fetch_text(url: &str) -> Result<String, FetchError> {
    let response = send("GET", url, None).await?;
    read_text(url, &response).await
}

async fn get_json<T>(url: &str) -> Result<T, FetchError>
where
    T: serde::de::DeserializeOwned,
{
    let response = send("GET", url, None).await?;
    let promise = response.json().map_err(|error| malformed(url, &error))?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|error| malformed(url, &error))?;
    serde_wasm_bindgen::from_value(value).map_err(|error| FetchError::MalformedResponse {
        url: url.to_string(),
        reason: error.to_string(),
    })
}

async fn send(
    method: &str,
    url: &str,
    signal: Option<&web_sys::AbortSignal>,
) -> Result<web_sys::Response, FetchError> {
    let window =
        web_sys::window().ok_or_else(|| FetchError::Transport("no window available".to_string()))?;
    let init = web_sys::RequestInit::new();
    init.set_method(method);
    if let Some(signal) = signal {
        init.set_signal(Some(signal));
    }

    let response = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .map_err(|error| {
            if is_abort_error(&error) {
                FetchError::StaleResponse
            } else {
                FetchError::Transport(describe_js_error(&error))
            }
        })?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|error| malformed(url, &error))?;

    if !response.ok() {
        return Err(FetchError::NetworkFailure {
            url: url.to_string(),
            status: response.status(),
        });
    }
    Ok(response)
}

async fn read_text(url: &str, response: &web_sys::Response) -> Result<String, FetchError> {
    let promise = response.text().map_err(|error| malformed(url, &error))?;
    let value = JsFuture::from(promise).await.map_err(|error| {
        if is_abort_error(&error) {
            FetchError::StaleResponse
        } else {
            malformed(url, &error)
        }
    })?;
    Ok(value.as_string().unwrap_or_default())
}

fn is_abort_error(error: &wasm_bindgen::JsValue) -> bool {
    js_sys::Reflect::get(error, &"name".into())
        .ok()
        .and_then(|name| name.as_string())
        .is_some_and(|name| name == "AbortError")
}

fn describe_js_error(error: &wasm_bindgen::JsValue) -> String {
    error
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(error, &"message".into())
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| format!("{error:?}"))
}

fn malformed(url: &str, error: &wasm_bindgen::JsValue) -> FetchError {
    FetchError::MalformedResponse {
        url: url.to_string(),
        reason: describe_js_error(error),
    }
}
