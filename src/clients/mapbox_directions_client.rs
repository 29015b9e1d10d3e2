//! Cliente de Mapbox Directions API
//! 
//! Una llamada por variante (con o sin peaje). El timeout se fija al crear
//! el cliente; un timeout se reporta como `RoutingError::Timeout`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{DrivingRoute, RoutingError, RoutingProvider};
use crate::utils::geo::LatLng;

const MAPBOX_DIRECTIONS_URL: &str = "https://api.mapbox.com/directions/v5/mapbox/driving";

#[derive(Debug, Deserialize)]
struct MapboxDirectionsResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<MapboxRoute>,
}

#[derive(Debug, Deserialize)]
struct MapboxRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    geometry: Option<serde_json::Value>,
}

pub struct MapboxDirectionsClient {
    mapbox_token: String,
    base_url: String,
    client: Client,
}

impl MapboxDirectionsClient {
    pub fn new(mapbox_token: String, timeout: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::Unexpected(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            mapbox_token,
            base_url: MAPBOX_DIRECTIONS_URL.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_url(&self, from: LatLng, to: LatLng, avoid_tolls: bool) -> String {
        let mut url = format!(
            "{}/{},{};{},{}?geometries=geojson&overview=full&access_token={}",
            self.base_url,
            from.lng,
            from.lat,
            to.lng,
            to.lat,
            urlencoding::encode(&self.mapbox_token)
        );
        if avoid_tolls {
            url.push_str("&exclude=toll");
        }
        url
    }
}

/// Mapear estado HTTP + cuerpo a una ruta o a un error tipado
fn parse_directions(status: StatusCode, body: &str) -> Result<DrivingRoute, RoutingError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(RoutingError::InvalidCredentials)
        }
        StatusCode::TOO_MANY_REQUESTS => return Err(RoutingError::QuotaExceeded),
        StatusCode::NOT_FOUND => return Err(RoutingError::NotFound),
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
            return Err(RoutingError::InvalidParameters(body.chars().take(200).collect()))
        }
        s if !s.is_success() => {
            return Err(RoutingError::Unexpected(format!("HTTP {}", s)));
        }
        _ => {}
    }

    let response: MapboxDirectionsResponse = serde_json::from_str(body)
        .map_err(|e| RoutingError::Unexpected(format!("invalid directions payload: {}", e)))?;

    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RoutingError::NotFound),
        "InvalidInput" => {
            return Err(RoutingError::InvalidParameters(
                response.message.unwrap_or_default(),
            ))
        }
        other => return Err(RoutingError::Unexpected(other.to_string())),
    }

    let route = response.routes.into_iter().next().ok_or(RoutingError::NotFound)?;
    Ok(DrivingRoute {
        distance_m: route.distance,
        duration_s: route.duration,
        geometry: route.geometry,
    })
}

#[async_trait]
impl RoutingProvider for MapboxDirectionsClient {
    async fn driving_route(
        &self,
        from: LatLng,
        to: LatLng,
        avoid_tolls: bool,
    ) -> Result<DrivingRoute, RoutingError> {
        let url = self.request_url(from, to, avoid_tolls);
        log::debug!(
            "🛣️ Mapbox directions ({}) {:?} -> {:?}",
            if avoid_tolls { "sin peaje" } else { "con peaje" },
            from,
            to
        );

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "FreightPricing/1.0")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RoutingError::Timeout
                } else {
                    RoutingError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RoutingError::Timeout
            } else {
                RoutingError::Network(e.to_string())
            }
        })?;

        parse_directions(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{"code":"Ok","routes":[{"distance":152340.5,"duration":7260.0,"geometry":{"type":"LineString","coordinates":[[106.8,-6.2],[107.6,-6.9]]}}]}"#;
        let route = parse_directions(StatusCode::OK, body).unwrap();
        assert_eq!(route.distance_m, 152340.5);
        assert_eq!(route.duration_s, 7260.0);
        assert!(route.geometry.is_some());
    }

    #[test]
    fn test_parse_error_mapping() {
        assert_eq!(
            parse_directions(StatusCode::UNAUTHORIZED, "{}"),
            Err(RoutingError::InvalidCredentials)
        );
        assert_eq!(
            parse_directions(StatusCode::TOO_MANY_REQUESTS, ""),
            Err(RoutingError::QuotaExceeded)
        );
        assert_eq!(
            parse_directions(StatusCode::OK, r#"{"code":"NoRoute","routes":[]}"#),
            Err(RoutingError::NotFound)
        );
        assert!(matches!(
            parse_directions(StatusCode::UNPROCESSABLE_ENTITY, "bad coords"),
            Err(RoutingError::InvalidParameters(_))
        ));
        assert!(matches!(
            parse_directions(StatusCode::OK, "not json"),
            Err(RoutingError::Unexpected(_))
        ));
    }

    #[test]
    fn test_request_url_excludes_toll_only_when_asked() {
        let client = MapboxDirectionsClient::new("pk.test".to_string(), Duration::from_secs(10))
            .unwrap()
            .with_base_url("http://localhost");
        let from = LatLng::new(-6.2, 106.8);
        let to = LatLng::new(-6.9, 107.6);

        let toll_free = client.request_url(from, to, true);
        assert!(toll_free.starts_with("http://localhost/106.8,-6.2;107.6,-6.9?"));
        assert!(toll_free.ends_with("&exclude=toll"));
        assert!(!client.request_url(from, to, false).contains("exclude"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let client = MapboxDirectionsClient::new("pk.test".to_string(), Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let result = client
            .driving_route(LatLng::new(-6.2, 106.8), LatLng::new(-6.9, 107.6), false)
            .await;
        assert!(matches!(
            result,
            Err(RoutingError::Network(_)) | Err(RoutingError::Timeout)
        ));
    }
}
