//! HTTP adapter for a Street View style metadata endpoint.
//!
//! The endpoint answers `GET ?location=<lat>,<lon>&key=<key>` with a JSON
//! body carrying a `status` and, when a panorama was found, its id, location,
//! capture month and copyright.

use async_trait::async_trait;
use panosweep_core::config::LayeredConfig;
use panosweep_core::error::PanosweepError;
use panosweep_core::models::PanoramaRecord;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::LookupError;
use crate::lookup::PanoramaLookup;

pub const DEFAULT_METADATA_URL: &str =
    "https://maps.googleapis.com/maps/api/streetview/metadata";

/// Metadata response body
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataResponse {
    pub status: String,
    pub pano_id: Option<String>,
    pub location: Option<MetadataLocation>,
    pub date: Option<String>,
    pub copyright: Option<String>,
    pub heading: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MetadataLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Turn a decoded response into a lookup outcome.
///
/// `OK` yields a record at the panorama's own location (the queried point if
/// the body has none). `ZERO_RESULTS` and `NOT_FOUND` mean nothing is there.
/// Every other status is a service-side failure worth retrying.
pub fn interpret(
    query_lat: f64,
    query_lon: f64,
    response: MetadataResponse,
) -> Result<Option<PanoramaRecord>, LookupError> {
    match response.status.as_str() {
        "OK" => {
            let pano_id = response
                .pano_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| LookupError::Decode("status OK without pano_id".to_string()))?;
            let (lat, lon) =
                response.location.map_or((query_lat, query_lon), |loc| (loc.lat, loc.lng));

            Ok(Some(
                PanoramaRecord::new(pano_id, lat, lon)
                    .with_date(response.date)
                    .with_copyright(response.copyright)
                    .with_orientation(
                        response.heading.unwrap_or(0.0),
                        response.pitch.unwrap_or(0.0),
                        response.roll.unwrap_or(0.0),
                    ),
            ))
        }
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(None),
        status => Err(LookupError::Service(match response.error_message {
            Some(message) => format!("{}: {}", status, message),
            None => status.to_string(),
        })),
    }
}

/// Lookup client for the metadata endpoint
pub struct StreetViewMetadataClient {
    /// Endpoint URL, without query string
    base_url: String,

    api_key: String,

    /// Per-request timeout
    timeout: Duration,

    client: reqwest::Client,
}

impl StreetViewMetadataClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: DEFAULT_METADATA_URL.to_string(),
            api_key: api_key.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at another endpoint (a proxy or a local fake)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build from configuration; the API key is required
    pub fn from_config(config: &LayeredConfig) -> Result<Self, PanosweepError> {
        let api_key = config.lookup_api_key.value.clone().ok_or_else(|| {
            PanosweepError::ConfigMissing { key: "lookup_api_key".to_string() }
        })?;
        Ok(Self::new(api_key, config.lookup_timeout()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_error(&self, err: reqwest::Error) -> LookupError {
        if err.is_timeout() {
            LookupError::Timeout(self.timeout)
        } else if err.is_decode() {
            LookupError::Decode(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

impl fmt::Debug for StreetViewMetadataClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreetViewMetadataClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"********")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl PanoramaLookup for StreetViewMetadataClient {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<PanoramaRecord>, LookupError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("location", format!("{},{}", lat, lon)), ("key", self.api_key.clone())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Service(format!("HTTP {}", status)));
        }

        let body: MetadataResponse = response.json().await.map_err(|e| self.request_error(e))?;
        interpret(lat, lon, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> MetadataResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_ok_response_becomes_record() {
        let body = parse(
            r#"{
                "copyright": "© Google",
                "date": "2022-08",
                "location": { "lat": 37.7601, "lng": -122.4148 },
                "pano_id": "CAoSLEFGMVFpcE",
                "status": "OK"
            }"#,
        );

        let record = interpret(37.76, -122.41, body).unwrap().unwrap();
        assert_eq!(record.pano_id, "CAoSLEFGMVFpcE");
        assert_eq!((record.lat, record.lon), (37.7601, -122.4148));
        assert_eq!(record.date.as_deref(), Some("2022-08"));
        assert_eq!(record.copyright.as_deref(), Some("© Google"));
        assert_eq!((record.heading, record.pitch, record.roll), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_missing_optional_fields() {
        let body = parse(r#"{ "pano_id": "abc", "status": "OK", "heading": 181.5 }"#);

        let record = interpret(1.0, 2.0, body).unwrap().unwrap();
        assert_eq!((record.lat, record.lon), (1.0, 2.0));
        assert!(record.date.is_none());
        assert!(record.copyright.is_none());
        assert_eq!(record.heading, 181.5);
    }

    #[test]
    fn test_not_found_statuses() {
        assert!(interpret(0.0, 0.0, parse(r#"{ "status": "ZERO_RESULTS" }"#)).unwrap().is_none());
        assert!(interpret(0.0, 0.0, parse(r#"{ "status": "NOT_FOUND" }"#)).unwrap().is_none());
    }

    #[test]
    fn test_other_statuses_are_service_errors() {
        let body = parse(
            r#"{ "status": "OVER_QUERY_LIMIT", "error_message": "You have exceeded your daily request quota" }"#,
        );
        match interpret(0.0, 0.0, body) {
            Err(LookupError::Service(message)) => assert!(message.starts_with("OVER_QUERY_LIMIT")),
            other => panic!("Expected Service error, got {:?}", other),
        }

        let denied = parse(r#"{ "status": "REQUEST_DENIED" }"#);
        assert!(matches!(interpret(0.0, 0.0, denied), Err(LookupError::Service(_))));
    }

    #[test]
    fn test_ok_without_pano_id_is_a_decode_error() {
        let body = parse(r#"{ "status": "OK", "pano_id": "" }"#);
        assert!(matches!(interpret(0.0, 0.0, body), Err(LookupError::Decode(_))));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let mut config = LayeredConfig::with_defaults();
        assert!(matches!(
            StreetViewMetadataClient::from_config(&config),
            Err(PanosweepError::ConfigMissing { .. })
        ));

        config.lookup_api_key.value = Some("secret-key".to_string());
        let client = StreetViewMetadataClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), DEFAULT_METADATA_URL);
        assert!(!format!("{:?}", client).contains("secret-key"));
    }
}
