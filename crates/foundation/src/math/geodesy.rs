/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;

/// Circumference of the Web Mercator world at the equator (meters).
pub const MERCATOR_WORLD_WIDTH_M: f64 = 2.0 * std::f64::consts::PI * WGS84_A;

/// Latitude at which Web Mercator becomes square.
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.05112878;

pub fn wrap_lon_deg(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Normalizes a bearing into `(-180, 180]`.
pub fn wrap_bearing_deg(bearing: f64) -> f64 {
    let b = wrap_lon_deg(bearing);
    if b == -180.0 { 180.0 } else { b }
}

pub fn is_lon_lat_valid(lon_deg: f64, lat_deg: f64) -> bool {
    lon_deg.is_finite()
        && lat_deg.is_finite()
        && (-180.0..=180.0).contains(&lon_deg)
        && (-90.0..=90.0).contains(&lat_deg)
}
