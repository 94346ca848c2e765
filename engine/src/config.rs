use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_PLACES_API_URL: &str =
    "https://maps.googleapis.com/maps/api/place/autocomplete/json";

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub heatmap: HeatmapConfig,
    pub summary: SummaryConfig,
    pub suggestions: SuggestionConfig,
    pub refresh: RefreshConfig,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapConfig {
    /// Two reports closer than this are in the same cluster.
    pub adjacency_threshold_m: f64,
    /// Half-width of the square drawn around degenerate clusters.
    pub synthetic_half_width_m: f64,
    pub buffer_radius_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryConfig {
    pub default_confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionConfig {
    pub source_timeout: Duration,
    pub debounce: Duration,
    pub min_query_len: usize,
    pub city: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshConfig {
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub api_base_url: String,
    pub places_api_url: String,
    pub places_api_key: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            adjacency_threshold_m: 150.0,
            synthetic_half_width_m: 80.0,
            buffer_radius_m: 150.0,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            default_confidence: 0.8,
        }
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_millis(4_000),
            debounce: Duration::from_millis(300),
            min_query_len: 3,
            city: "Bangalore".to_string(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(12),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            places_api_url: DEFAULT_PLACES_API_URL.to_string(),
            places_api_key: String::new(),
        }
    }
}

impl EngineConfig {
    /// Build the configuration from the process environment.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let heatmap = HeatmapConfig {
            adjacency_threshold_m: env_or(
                "ADJACENCY_THRESHOLD_M",
                defaults.heatmap.adjacency_threshold_m,
            ),
            synthetic_half_width_m: env_or(
                "SYNTHETIC_HALF_WIDTH_M",
                defaults.heatmap.synthetic_half_width_m,
            ),
            buffer_radius_m: env_or("BUFFER_RADIUS_M", defaults.heatmap.buffer_radius_m),
        };
        let summary = SummaryConfig {
            default_confidence: env_or("DEFAULT_CONFIDENCE", defaults.summary.default_confidence)
                .clamp(0.0, 1.0),
        };
        let suggestions = SuggestionConfig {
            source_timeout: Duration::from_millis(env_or::<u64>("SOURCE_TIMEOUT_MS", 4_000)),
            debounce: Duration::from_millis(env_or::<u64>("DEBOUNCE_MS", 300)),
            min_query_len: env_or("MIN_QUERY_LEN", defaults.suggestions.min_query_len),
            city: env::var("SUGGESTION_CITY").unwrap_or(defaults.suggestions.city),
        };
        let refresh = RefreshConfig {
            interval: Duration::from_secs(env_or::<u64>("REFRESH_INTERVAL_SECS", 12).max(1)),
        };
        let endpoints = Endpoints {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.endpoints.api_base_url),
            places_api_url: env::var("PLACES_API_URL")
                .unwrap_or(defaults.endpoints.places_api_url),
            places_api_key: env::var("PLACES_API_KEY").unwrap_or_default(),
        };

        Self {
            heatmap,
            summary,
            suggestions,
            refresh,
            endpoints,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = EngineConfig::default();
        assert_eq!(config.heatmap.adjacency_threshold_m, 150.0);
        assert_eq!(config.heatmap.synthetic_half_width_m, 80.0);
        assert_eq!(config.summary.default_confidence, 0.8);
        assert_eq!(config.refresh.interval, Duration::from_secs(12));
        assert_eq!(config.suggestions.debounce, Duration::from_millis(300));
        assert_eq!(config.suggestions.min_query_len, 3);
    }

    #[test]
    fn env_or_falls_back_when_unset() {
        assert_eq!(env_or("INSIGHT_ENGINE_TEST_UNSET_VARIABLE", 42u64), 42);
    }
}
