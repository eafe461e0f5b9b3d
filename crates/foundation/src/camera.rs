use crate::math::{MERCATOR_MAX_LAT_DEG, wrap_bearing_deg, wrap_lon_deg};

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;
pub const MAX_PITCH_DEG: f64 = 60.0;

/// Map viewpoint shared between the overlay and the base map.
///
/// `zoom` follows the web-map convention: at zoom 0 the whole Mercator world
/// is 512 px wide, each zoom level doubles that.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl CameraPose {
    pub const fn new(longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
            bearing: 0.0,
            pitch: 0.0,
        }
    }

    /// Clamps every component into the range a map controller can produce.
    pub fn normalized(self) -> Self {
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        Self {
            longitude: wrap_lon_deg(finite_or(self.longitude, 0.0)),
            latitude: finite_or(self.latitude, 0.0)
                .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG),
            zoom: finite_or(self.zoom, MIN_ZOOM).clamp(MIN_ZOOM, MAX_ZOOM),
            bearing: wrap_bearing_deg(finite_or(self.bearing, 0.0)),
            pitch: finite_or(self.pitch, 0.0).clamp(0.0, MAX_PITCH_DEG),
        }
    }

    pub fn with_zoom_delta(self, delta: f64) -> Self {
        Self {
            zoom: self.zoom + delta,
            ..self
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraPose, MAX_PITCH_DEG, MAX_ZOOM};

    #[test]
    fn normalized_clamps_out_of_range_values() {
        let pose = CameraPose {
            longitude: 200.0,
            latitude: 89.0,
            zoom: 40.0,
            bearing: -190.0,
            pitch: 80.0,
        }
        .normalized();
        assert_eq!(pose.longitude, -160.0);
        assert!(pose.latitude < 85.1);
        assert_eq!(pose.zoom, MAX_ZOOM);
        assert_eq!(pose.bearing, 170.0);
        assert_eq!(pose.pitch, MAX_PITCH_DEG);
    }

    #[test]
    fn normalized_replaces_nan() {
        let pose = CameraPose::new(f64::NAN, 10.0, f64::NAN).normalized();
        assert_eq!(pose.longitude, 0.0);
        assert_eq!(pose.zoom, 0.0);
    }

    #[test]
    fn zoom_delta_keeps_center() {
        let pose = CameraPose::new(-74.75, 40.52, 9.0).with_zoom_delta(1.5);
        assert_eq!(pose.zoom, 10.5);
        assert_eq!(pose.longitude, -74.75);
    }
}
