//! Heatmap configuration served next to the page

use crate::connection::fetch_text;
use crate::logging::{log_error, log_info};
use shared::HeatmapConfig;

pub const CONFIG_URL: &str = "heatmap.toml";

/// Fetches and parses `heatmap.toml`, falling back to the defaults.
pub async fn load_config() -> HeatmapConfig {
    let source = match fetch_text(CONFIG_URL).await {
        Ok(source) => source,
        Err(error) => {
            log_info!("No {CONFIG_URL} ({error}), using default heatmap settings");
            return HeatmapConfig::default();
        }
    };
    parse_or_default(&source)
}

fn parse_or_default(source: &str) -> HeatmapConfig {
    HeatmapConfig::from_toml_str(source).unwrap_or_else(|error| {
        log_error!("Invalid {CONFIG_URL}: {error}; using default heatmap settings");
        HeatmapConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = parse_or_default("[grid]\ngrid_size = 40\n");
        assert_eq!(config.grid.grid_size, 40);
        assert_eq!(config.api, HeatmapConfig::default().api);
    }

    #[test]
    fn invalid_document_falls_back_to_defaults() {
        let config = parse_or_default("[grid]\ngrid_size = 1\n");
        assert_eq!(config, HeatmapConfig::default());
    }
}
