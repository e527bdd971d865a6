use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ===== REST TYPES =====

/// Response of `GET /diffs/zoom`: pair key -> per-bucket difference counts.
///
/// Pair order is the order the server wrote them, which becomes the order in
/// which newly observed swimlanes are appended.
pub type ZoomResponse = IndexMap<String, Vec<u32>>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PairRef {
    pub key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VersionId {
    pub pair: PairRef,
    pub id: String,
}

/// One detected mismatch between an upstream and a downstream participant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiffEvent {
    pub seq_id: String,
    pub obj_id: VersionId,
    pub detected_at: String,
    #[serde(default)]
    pub upstream_vsn: Option<String>,
    #[serde(default)]
    pub downstream_vsn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    MissingFromUpstream,
    MissingFromDownstream,
    DataDifference,
}

impl DiffEvent {
    pub fn pair_key(&self) -> &str {
        &self.obj_id.pair.key
    }

    pub fn kind(&self) -> DifferenceKind {
        let missing = |vsn: &Option<String>| vsn.as_deref().is_none_or(str::is_empty);
        if missing(&self.upstream_vsn) {
            DifferenceKind::MissingFromUpstream
        } else if missing(&self.downstream_vsn) {
            DifferenceKind::MissingFromDownstream
        } else {
            DifferenceKind::DataDifference
        }
    }
}

impl DifferenceKind {
    pub fn label(self) -> &'static str {
        match self {
            DifferenceKind::MissingFromUpstream => "Missing from upstream",
            DifferenceKind::MissingFromDownstream => "Missing from downstream",
            DifferenceKind::DataDifference => "Data difference",
        }
    }
}

/// Response of `GET /diffs`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiffsPage {
    pub diffs: Vec<DiffEvent>,
    pub total: u64,
    #[serde(default)]
    pub seq_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PairDetails {
    #[serde(default)]
    pub upstream_name: Option<String>,
    #[serde(default)]
    pub downstream_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RepairAction {
    pub name: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentSide {
    Upstream,
    Downstream,
}

impl ContentSide {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentSide::Upstream => "upstream",
            ContentSide::Downstream => "downstream",
        }
    }
}

// ===== TIMESTAMPS =====

/// `yyyyMMddTHHmmssZ`, always UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid range timestamp '{input}': expected yyyyMMddTHHmmssZ")]
pub struct TimestampError {
    pub input: String,
}

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    NaiveDateTime::parse_from_str(input, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| TimestampError {
            input: input.to_string(),
        })
}

/// Start of the hour after `now`. A time exactly on the hour still moves forward.
pub fn next_whole_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let into_hour = TimeDelta::seconds(i64::from(now.minute()) * 60 + i64::from(now.second()))
        + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
    now - into_hour + TimeDelta::hours(1)
}

// ===== CONFIG TYPES =====

/// Buckets can't be wider than six months.
pub const MAX_BUCKET_SIZE_SECONDS: u32 = 180 * 24 * 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse heatmap config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid heatmap config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HeatmapConfig {
    pub polling: PollingSection,
    pub grid: GridSection,
    pub buckets: BucketsSection,
    pub api: ApiSection,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PollingSection {
    /// How frequently (in ms) bucket counts are polled
    pub blob_interval_ms: u32,
    /// How frequently (in ms) the difference list is polled
    pub diff_interval_ms: u32,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            blob_interval_ms: 5000,
            diff_interval_ms: 5000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridSection {
    pub grid_size: u32,
    pub gutter_size: u32,
    pub bottom_gutter: u32,
    pub scale_height: u32,
    pub min_rows: usize,
    pub max_columns: usize,
    pub default_max_rows: usize,
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            grid_size: 30,
            gutter_size: 24,
            bottom_gutter: 10,
            scale_height: 40,
            min_rows: 5,
            max_columns: 96,
            default_max_rows: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BucketsSection {
    pub default_bucket_size: u32,
}

impl Default for BucketsSection {
    fn default() -> Self {
        Self {
            default_bucket_size: 3600,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiSection {
    pub base: String,
    pub domain: String,
    pub list_size: u32,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base: "rest".to_string(),
            domain: "diffa".to_string(),
            list_size: 20,
        }
    }
}

impl HeatmapConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: HeatmapConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        };
        if self.polling.blob_interval_ms == 0 {
            return Err(invalid("polling.blob_interval_ms", "must be positive"));
        }
        if self.polling.diff_interval_ms == 0 {
            return Err(invalid("polling.diff_interval_ms", "must be positive"));
        }
        if self.grid.grid_size < 2 {
            return Err(invalid("grid.grid_size", "must be at least 2 pixels"));
        }
        if self.grid.max_columns == 0 {
            return Err(invalid("grid.max_columns", "must be positive"));
        }
        let bucket_size = self.buckets.default_bucket_size;
        if bucket_size < 1 || bucket_size > MAX_BUCKET_SIZE_SECONDS {
            return Err(invalid(
                "buckets.default_bucket_size",
                "must be between 1 second and 180 days",
            ));
        }
        if self.api.list_size == 0 {
            return Err(invalid("api.list_size", "must be positive"));
        }
        Ok(())
    }

    /// `<base>/<domain>` prefix of every REST call.
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.api.base.trim_end_matches('/'),
            self.api.domain
        )
    }
}
