//! Utilidades geográficas: distancia haversine, posiciones y bounding boxes.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Punto geográfico (grados decimales)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Distancia de círculo máximo en kilómetros
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // clamp: el redondeo puede dejar h apenas fuera de [0, 1]
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Parsear una posición de telemetría con formato "lat,lng"
pub fn parse_lat_lng(raw: &str) -> Option<LatLng> {
    let mut parts = raw.split(',');
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lng = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() || !lat.is_finite() || !lng.is_finite() {
        return None;
    }
    Some(LatLng { lat, lng })
}

/// Caja `minLng,minLat,maxLng,maxLat`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Parsear la caja; exige exactamente cuatro números finitos
    pub fn parse(raw: &str) -> Result<Self, String> {
        let values = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| format!("bbox '{}' must contain only numbers", raw))?;

        let [min_lng, min_lat, max_lng, max_lat] = values[..] else {
            return Err(format!(
                "bbox must have exactly 4 values (minLng,minLat,maxLng,maxLat), got {}",
                values.len()
            ));
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err("bbox values must be finite".to_string());
        }
        if min_lng > max_lng || min_lat > max_lat {
            return Err("bbox minimums must not exceed maximums".to_string());
        }

        Ok(Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        })
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lng >= self.min_lng
            && point.lng <= self.max_lng
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAKARTA: LatLng = LatLng { lat: -6.2088, lng: 106.8456 };
    const SURABAYA: LatLng = LatLng { lat: -7.2575, lng: 112.7521 };

    #[test]
    fn test_haversine_is_symmetric() {
        let ab = haversine_km(JAKARTA, SURABAYA);
        let ba = haversine_km(SURABAYA, JAKARTA);
        assert_eq!(ab, ba);
        // ~660 km en línea recta
        assert!(ab > 640.0 && ab < 680.0, "got {}", ab);
    }

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_km(JAKARTA, JAKARTA), 0.0);
    }

    #[test]
    fn test_parse_lat_lng() {
        assert_eq!(parse_lat_lng("-6.2, 106.8"), Some(LatLng::new(-6.2, 106.8)));
        assert_eq!(parse_lat_lng("-6.2"), None);
        assert_eq!(parse_lat_lng("a,b"), None);
        assert_eq!(parse_lat_lng("1,2,3"), None);
    }

    #[test]
    fn test_bbox_parse() {
        let bbox = BoundingBox::parse("106.0,-7.0,108.0,-6.0").unwrap();
        assert!(bbox.contains(LatLng::new(-6.5, 107.0)));
        assert!(bbox.contains(JAKARTA));
        assert!(!bbox.contains(SURABAYA));

        assert!(BoundingBox::parse("106.0,-7.0,108.0").is_err());
        assert!(BoundingBox::parse("106.0,-7.0,108.0,-6.0,1").is_err());
        assert!(BoundingBox::parse("a,b,c,d").is_err());
        assert!(BoundingBox::parse("108.0,-7.0,106.0,-6.0").is_err());
    }
}
