//! Hash-based navigation between the heatmap and the difference list
//!
//! `#blobs/<pairKey>/<start>-<end>` selects the differences of one pair in one
//! bucket; an empty hash is the plain heatmap.

use crate::dataflow::Relay;
use crate::logging::log_error;
use chrono::{DateTime, Utc};
use futures::channel::mpsc::UnboundedReceiver;
use shared::{TimestampError, format_timestamp, parse_timestamp};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

/// Pair and time range chosen by clicking a heatmap cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobSelection {
    pub pair_key: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Blob(BlobSelection),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("unknown route '{0}'")]
    Unknown(String),
    #[error("route '{route}' has no '<start>-<end>' range")]
    MissingRange { route: String },
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

impl Route {
    pub fn parse(hash: &str) -> Result<Route, RouteError> {
        let path = hash.trim_start_matches('#');
        if path.is_empty() {
            return Ok(Route::Index);
        }
        let Some(rest) = path.strip_prefix("blobs/") else {
            return Err(RouteError::Unknown(path.to_string()));
        };
        let missing_range = || RouteError::MissingRange {
            route: path.to_string(),
        };
        let (pair_key, range) = rest.rsplit_once('/').ok_or_else(missing_range)?;
        let (start, end) = range.split_once('-').ok_or_else(missing_range)?;
        if pair_key.is_empty() {
            return Err(RouteError::Unknown(path.to_string()));
        }
        Ok(Route::Blob(BlobSelection {
            pair_key: pair_key.to_string(),
            start: parse_timestamp(start)?,
            end: parse_timestamp(end)?,
        }))
    }

    /// Hash fragment without the leading `#`.
    pub fn to_hash(&self) -> String {
        match self {
            Route::Index => String::new(),
            Route::Blob(selection) => format!(
                "blobs/{}/{}-{}",
                selection.pair_key,
                format_timestamp(selection.start),
                format_timestamp(selection.end)
            ),
        }
    }
}

/// Mirrors `window.location.hash` into `route_changed_relay`.
///
/// The hashchange listener is removed when the router is dropped.
pub struct Router {
    pub route_changed_relay: Relay<Route>,
    listener: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

impl Router {
    pub fn new() -> Self {
        let route_changed_relay = Relay::new();
        let listener = web_sys::window().map(|window| {
            let relay = route_changed_relay.clone();
            let listener = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
                if let Some(route) = current_route() {
                    relay.send(route);
                }
            });
            if let Err(error) = window
                .add_event_listener_with_callback("hashchange", listener.as_ref().unchecked_ref())
            {
                log_error!("Failed to listen for navigation: {error:?}");
            }
            listener
        });
        Self {
            route_changed_relay,
            listener,
        }
    }

    pub fn subscribe(&self) -> UnboundedReceiver<Route> {
        self.route_changed_relay.subscribe()
    }

    /// Route of the page as loaded.
    pub fn initial_route(&self) -> Route {
        current_route().unwrap_or(Route::Index)
    }

    /// Changes the hash; the hashchange listener then announces the route.
    pub fn navigate(&self, route: &Route) {
        Self::navigate_with(&self.route_changed_relay, route);
    }

    /// [`Self::navigate`] for loops that only hold the router's relay.
    pub fn navigate_with(route_changed_relay: &Relay<Route>, route: &Route) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let hash = route.to_hash();
        let location = window.location();
        if location.hash().ok().as_deref().map(|current| current.trim_start_matches('#'))
            == Some(hash.as_str())
        {
            // Same hash does not fire hashchange; reselect explicitly.
            route_changed_relay.send(route.clone());
            return;
        }
        if let Err(error) = location.set_hash(&hash) {
            log_error!("Failed to navigate to '{hash}': {error:?}");
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        if let (Some(window), Some(listener)) = (web_sys::window(), self.listener.as_ref()) {
            let _ = window.remove_event_listener_with_callback(
                "hashchange",
                listener.as_ref().unchecked_ref(),
            );
        }
    }
}

fn current_route() -> Option<Route> {
    let hash = web_sys::window()?.location().hash().ok()?;
    match Route::parse(&hash) {
        Ok(route) => Some(route),
        Err(error) => {
            log_error!("Ignoring navigation: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn selection() -> BlobSelection {
        BlobSelection {
            pair_key: "WEB-1".to_string(),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn blob_route_hash() {
        assert_eq!(
            Route::Blob(selection()).to_hash(),
            "blobs/WEB-1/20240101T050000Z-20240101T060000Z"
        );
        assert_eq!(Route::Index.to_hash(), "");
    }

    #[test]
    fn parses_blob_routes_with_or_without_hash_sign() {
        let expected = Route::Blob(selection());
        assert_eq!(
            Route::parse("#blobs/WEB-1/20240101T050000Z-20240101T060000Z"),
            Ok(expected.clone())
        );
        assert_eq!(
            Route::parse("blobs/WEB-1/20240101T050000Z-20240101T060000Z"),
            Ok(expected)
        );
        assert_eq!(Route::parse("#"), Ok(Route::Index));
        assert_eq!(Route::parse(""), Ok(Route::Index));
    }

    #[test]
    fn rejects_broken_routes() {
        assert!(matches!(Route::parse("#settings"), Err(RouteError::Unknown(_))));
        assert!(matches!(
            Route::parse("#blobs/WEB-1"),
            Err(RouteError::MissingRange { .. })
        ));
        assert!(matches!(
            Route::parse("#blobs/WEB-1/yesterday-today"),
            Err(RouteError::Timestamp(_))
        ));
    }
}
