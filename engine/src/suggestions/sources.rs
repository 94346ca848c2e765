use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::{GeoPoint, LocationSuggestion, SuggestionOrigin};
use crate::providers::{read_json, ProviderError};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source did not answer within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

/// Context forwarded to both sources alongside the raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHints {
    pub context: String,
    pub location_type: String,
    pub city: String,
}

impl SearchHints {
    pub fn for_city(city: &str) -> Self {
        Self {
            context: "traffic_analysis".to_string(),
            location_type: "any".to_string(),
            city: city.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One record from the intent-prediction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictedPlace {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub coordinates: Option<RawCoordinates>,
    #[serde(default, rename = "type")]
    pub place_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub popularity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredFormatting {
    #[serde(default)]
    pub main_text: String,
    #[serde(default)]
    pub secondary_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

/// One record from the generic place-autocomplete service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutocompletePrediction {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub structured_formatting: Option<StructuredFormatting>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[async_trait]
pub trait PredictedIntentSource: Send + Sync {
    async fn predict(
        &self,
        query: &str,
        hints: &SearchHints,
    ) -> Result<Vec<PredictedPlace>, SourceError>;
}

#[async_trait]
pub trait AutocompleteSource: Send + Sync {
    async fn autocomplete(
        &self,
        query: &str,
        hints: &SearchHints,
    ) -> Result<Vec<AutocompletePrediction>, SourceError>;
}

fn slug(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Returns `None` for records without a usable name.
pub fn normalize_predicted(place: PredictedPlace, city: &str) -> Option<LocationSuggestion> {
    let name = place.name.trim();
    if name.is_empty() {
        return None;
    }
    let label = place
        .short_name
        .as_deref()
        .map(str::trim)
        .filter(|short| !short.is_empty())
        .unwrap_or(name)
        .to_string();
    let secondary_label = place
        .description
        .clone()
        .filter(|description| !description.trim().is_empty())
        .unwrap_or_else(|| format!("{city}, India"));

    Some(LocationSuggestion {
        place_id: format!("ai_{}", slug(name)),
        label,
        secondary_label,
        coordinates: place
            .coordinates
            .map(|c| GeoPoint::new(c.latitude, c.longitude)),
        origin: SuggestionOrigin::PredictedIntent,
        source_metadata: Some(json!({
            "type": place.place_type,
            "category": place.category,
            "confidence": place.confidence,
            "popularity": place.popularity,
        })),
    })
}

/// Label comes from the structured main text, falling back to the description.
pub fn normalize_autocomplete(prediction: AutocompletePrediction) -> Option<LocationSuggestion> {
    let formatting = prediction.structured_formatting.unwrap_or_default();
    let label = if formatting.main_text.trim().is_empty() {
        prediction.description.trim().to_string()
    } else {
        formatting.main_text.trim().to_string()
    };
    if label.is_empty() {
        return None;
    }
    let place_id = prediction
        .place_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("autocomplete_{}", slug(&label)));

    Some(LocationSuggestion {
        place_id,
        label,
        secondary_label: formatting.secondary_text,
        coordinates: prediction
            .geometry
            .map(|g| GeoPoint::new(g.location.lat, g.location.lng)),
        origin: SuggestionOrigin::Autocomplete,
        source_metadata: None,
    })
}

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    user_input: &'a str,
    context: &'a str,
    location_type: &'a str,
    city: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    predictions: Vec<PredictedPlace>,
}

/// Client for the backend's location-prediction endpoint.
pub struct PredictedIntentClient {
    http: reqwest::Client,
    url: String,
}

impl PredictedIntentClient {
    pub fn new(http: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            http,
            url: format!(
                "{}/api/v1/location/predict-location",
                api_base_url.trim_end_matches('/')
            ),
        }
    }
}

#[async_trait]
impl PredictedIntentSource for PredictedIntentClient {
    async fn predict(
        &self,
        query: &str,
        hints: &SearchHints,
    ) -> Result<Vec<PredictedPlace>, SourceError> {
        let body = PredictionRequest {
            user_input: query,
            context: &hints.context,
            location_type: &hints.location_type,
            city: &hints.city,
        };
        let response: PredictionResponse = read_json(self.http.post(&self.url).json(&body)).await?;
        Ok(response.predictions)
    }
}

#[derive(Debug, Default, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    predictions: Vec<AutocompletePrediction>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl AutocompleteResponse {
    fn into_predictions(self) -> Result<Vec<AutocompletePrediction>, ProviderError> {
        match self.status {
            None => Ok(self.predictions),
            Some(status) if status == "OK" || status == "ZERO_RESULTS" => Ok(self.predictions),
            Some(status) => Err(ProviderError::Rejected {
                status,
                message: self.error_message.unwrap_or_default(),
            }),
        }
    }
}

/// Client for a Places-style autocomplete API, restricted to India.
///
/// Without an API key the client stays silent and returns no predictions.
pub struct PlacesAutocompleteClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl PlacesAutocompleteClient {
    pub fn new(http: reqwest::Client, url: &str, api_key: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl AutocompleteSource for PlacesAutocompleteClient {
    async fn autocomplete(
        &self,
        query: &str,
        _hints: &SearchHints,
    ) -> Result<Vec<AutocompletePrediction>, SourceError> {
        if self.api_key.is_empty() {
            tracing::debug!("places autocomplete disabled, no API key configured");
            return Ok(Vec::new());
        }
        let url = reqwest::Url::parse_with_params(
            &self.url,
            &[
                ("input", query),
                ("key", self.api_key.as_str()),
                ("types", "geocode|establishment"),
                ("components", "country:in"),
                ("language", "en"),
            ],
        )
        .map_err(|err| ProviderError::Url(err.to_string()))?;

        let response: AutocompleteResponse = read_json(self.http.get(url)).await?;
        Ok(response.into_predictions()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicted_place_prefers_short_name_and_slugs_id() {
        let place = PredictedPlace {
            name: "Forum Koramangala Mall".to_string(),
            short_name: Some("Forum Mall".to_string()),
            category: Some("shopping".to_string()),
            confidence: Some(0.9),
            ..Default::default()
        };

        let suggestion = normalize_predicted(place, "Bangalore").expect("named place");
        assert_eq!(suggestion.place_id, "ai_forum_koramangala_mall");
        assert_eq!(suggestion.label, "Forum Mall");
        assert_eq!(suggestion.secondary_label, "Bangalore, India");
        assert_eq!(suggestion.origin, SuggestionOrigin::PredictedIntent);
        let metadata = suggestion.source_metadata.expect("metadata kept");
        assert_eq!(metadata["category"], "shopping");
        assert_eq!(metadata["confidence"], 0.9);
    }

    #[test]
    fn predicted_place_without_name_is_dropped() {
        assert!(normalize_predicted(PredictedPlace::default(), "Bangalore").is_none());
    }

    #[test]
    fn predicted_place_keeps_description_and_coordinates() {
        let place = PredictedPlace {
            name: "Cubbon Park".to_string(),
            description: Some("Central park".to_string()),
            coordinates: Some(RawCoordinates {
                latitude: 12.9762,
                longitude: 77.6033,
            }),
            ..Default::default()
        };
        let suggestion = normalize_predicted(place, "Bangalore").expect("named place");
        assert_eq!(suggestion.secondary_label, "Central park");
        assert_eq!(suggestion.coordinates, Some(GeoPoint::new(12.9762, 77.6033)));
    }

    #[test]
    fn autocomplete_label_falls_back_to_description() {
        let prediction = AutocompletePrediction {
            place_id: Some("ChIJ123".to_string()),
            description: "Indiranagar, Bengaluru, Karnataka".to_string(),
            structured_formatting: None,
            geometry: None,
        };
        let suggestion = normalize_autocomplete(prediction).expect("has description");
        assert_eq!(suggestion.place_id, "ChIJ123");
        assert_eq!(suggestion.label, "Indiranagar, Bengaluru, Karnataka");
        assert_eq!(suggestion.origin, SuggestionOrigin::Autocomplete);
    }

    #[test]
    fn autocomplete_uses_main_text_and_generates_missing_id() {
        let prediction = AutocompletePrediction {
            place_id: None,
            description: "HSR Layout, Bengaluru".to_string(),
            structured_formatting: Some(StructuredFormatting {
                main_text: "HSR Layout".to_string(),
                secondary_text: "Bengaluru, Karnataka".to_string(),
            }),
            geometry: Some(Geometry {
                location: LatLng {
                    lat: 12.9141,
                    lng: 77.6422,
                },
            }),
        };
        let suggestion = normalize_autocomplete(prediction).expect("has label");
        assert_eq!(suggestion.place_id, "autocomplete_hsr_layout");
        assert_eq!(suggestion.label, "HSR Layout");
        assert_eq!(suggestion.secondary_label, "Bengaluru, Karnataka");
        assert!(suggestion.coordinates.is_some());
    }

    #[test]
    fn autocomplete_status_errors_are_rejections() {
        let denied: AutocompleteResponse = serde_json::from_value(serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }))
        .unwrap();
        match denied.into_predictions() {
            Err(ProviderError::Rejected { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            other => panic!("expected a rejection, got {other:?}"),
        }

        let empty: AutocompleteResponse =
            serde_json::from_value(serde_json::json!({ "status": "ZERO_RESULTS" })).unwrap();
        assert!(empty.into_predictions().unwrap().is_empty());
    }

    #[test]
    fn autocomplete_without_any_text_is_dropped() {
        assert!(normalize_autocomplete(AutocompletePrediction::default()).is_none());
    }

    #[tokio::test]
    async fn places_client_without_key_returns_nothing() {
        let client = PlacesAutocompleteClient::new(
            reqwest::Client::new(),
            crate::config::DEFAULT_PLACES_API_URL,
            "",
        );
        let hints = SearchHints::for_city("Bangalore");
        let results = client.autocomplete("kora", &hints).await.expect("disabled client");
        assert!(results.is_empty());
    }
}
