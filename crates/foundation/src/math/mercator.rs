use super::geodesy::{MERCATOR_MAX_LAT_DEG, MERCATOR_WORLD_WIDTH_M, WGS84_A, wrap_lon_deg};
use crate::camera::CameraPose;

/// Width of the whole world in pixels at zoom 0.
pub const WORLD_SIZE_PX_AT_ZOOM_0: f64 = 512.0;

pub fn mercator_x_m(lon_deg: f64) -> f64 {
    WGS84_A * lon_deg.to_radians()
}

pub fn mercator_y_m(lat_deg: f64) -> f64 {
    let lat = lat_deg
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    WGS84_A * (0.5 * (std::f64::consts::FRAC_PI_2 + lat)).tan().ln()
}

pub fn inverse_mercator_lon_deg(x_m: f64) -> f64 {
    (x_m / WGS84_A).to_degrees()
}

pub fn inverse_mercator_lat_deg(y_m: f64) -> f64 {
    (2.0 * (y_m / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees()
}

pub fn scale_px_per_m(zoom: f64) -> f64 {
    WORLD_SIZE_PX_AT_ZOOM_0 * zoom.exp2() / MERCATOR_WORLD_WIDTH_M
}

/// Slippy-map tile containing a point, as unwrapped `(x, y)` at zoom `z`.
///
/// `x` is not wrapped into `[0, 2^z)` so ranges across the antimeridian stay
/// contiguous; wrap it when building a URL.
pub fn lon_lat_to_tile(lon_deg: f64, lat_deg: f64, z: u32) -> (i64, i64) {
    let n = f64::from(1u32 << z.min(30));
    let lat = lat_deg
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    let x = ((lon_deg + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor()
        .clamp(0.0, n - 1.0);
    (x as i64, y as i64)
}

/// North-west corner of a tile in degrees.
pub fn tile_nw_lon_lat(z: u32, x: i64, y: i64) -> (f64, f64) {
    let n = f64::from(1u32 << z.min(30));
    let lon = x as f64 / n * 360.0 - 180.0;
    let lat = (std::f64::consts::PI * (1.0 - 2.0 * y as f64 / n))
        .sinh()
        .atan()
        .to_degrees();
    (lon, lat)
}

/// Maps lon/lat to viewport pixels for a camera pose.
///
/// Pitch is not modelled: both the base map and the overlay draw top-down.
/// Bearing rotates the map so that the bearing direction points up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorProjector {
    pub center_x: f64,
    pub center_y: f64,
    pub scale_px_per_m: f64,
    pub world_width_m: f64,
    pub width_px: f64,
    pub height_px: f64,
    bearing_sin: f64,
    bearing_cos: f64,
}

impl MercatorProjector {
    pub fn new(pose: CameraPose, width_px: f64, height_px: f64) -> Self {
        let bearing = pose.bearing.to_radians();
        Self {
            center_x: mercator_x_m(pose.longitude),
            center_y: mercator_y_m(pose.latitude),
            scale_px_per_m: scale_px_per_m(pose.zoom),
            world_width_m: MERCATOR_WORLD_WIDTH_M,
            width_px,
            height_px,
            bearing_sin: bearing.sin(),
            bearing_cos: bearing.cos(),
        }
    }

    pub fn project_lon_lat(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let x_m = mercator_x_m(lon_deg);
        let y_m = mercator_y_m(lat_deg);
        let dx = (x_m - self.center_x + 0.5 * self.world_width_m).rem_euclid(self.world_width_m)
            - 0.5 * self.world_width_m;
        let dy = y_m - self.center_y;
        let rx = dx * self.bearing_cos - dy * self.bearing_sin;
        let ry = dx * self.bearing_sin + dy * self.bearing_cos;
        (
            self.width_px * 0.5 + rx * self.scale_px_per_m,
            self.height_px * 0.5 - ry * self.scale_px_per_m,
        )
    }

    pub fn screen_to_lon_lat(&self, x_px: f64, y_px: f64) -> (f64, f64) {
        let rx = (x_px - self.width_px * 0.5) / self.scale_px_per_m;
        let ry = (self.height_px * 0.5 - y_px) / self.scale_px_per_m;
        let dx = rx * self.bearing_cos + ry * self.bearing_sin;
        let dy = -rx * self.bearing_sin + ry * self.bearing_cos;
        let lon = wrap_lon_deg(inverse_mercator_lon_deg(self.center_x + dx));
        let lat = inverse_mercator_lat_deg(self.center_y + dy)
            .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG);
        (lon, lat)
    }

    /// Pose after dragging the map content by `(dx_px, dy_px)`.
    pub fn pan(&self, pose: CameraPose, dx_px: f64, dy_px: f64) -> CameraPose {
        let (lon, lat) =
            self.screen_to_lon_lat(self.width_px * 0.5 - dx_px, self.height_px * 0.5 - dy_px);
        CameraPose {
            longitude: lon,
            latitude: lat,
            ..pose
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        MercatorProjector, WORLD_SIZE_PX_AT_ZOOM_0, inverse_mercator_lat_deg, lon_lat_to_tile,
        mercator_y_m, scale_px_per_m, tile_nw_lon_lat,
    };
    use crate::camera::CameraPose;
    use crate::math::MERCATOR_WORLD_WIDTH_M;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn zoom_zero_fits_world_into_512_px() {
        assert_close(scale_px_per_m(0.0) * MERCATOR_WORLD_WIDTH_M, WORLD_SIZE_PX_AT_ZOOM_0, 1e-9);
        assert_close(scale_px_per_m(1.0), 2.0 * scale_px_per_m(0.0), 1e-18);
    }

    #[test]
    fn latitude_round_trips() {
        for lat in [-60.0, -12.5, 0.0, 40.52, 80.0] {
            assert_close(inverse_mercator_lat_deg(mercator_y_m(lat)), lat, 1e-9);
        }
    }

    #[test]
    fn center_projects_to_viewport_middle() {
        let pose = CameraPose::new(-74.75, 40.52, 9.0);
        let p = MercatorProjector::new(pose, 800.0, 600.0);
        let (x, y) = p.project_lon_lat(-74.75, 40.52);
        assert_close(x, 400.0, 1e-6);
        assert_close(y, 300.0, 1e-6);
    }

    #[test]
    fn north_is_up_without_bearing() {
        let p = MercatorProjector::new(CameraPose::new(0.0, 0.0, 4.0), 512.0, 512.0);
        let (x, y) = p.project_lon_lat(0.0, 1.0);
        assert_close(x, 256.0, 1e-6);
        assert!(y < 256.0);
    }

    #[test]
    fn bearing_rotates_heading_to_top() {
        let pose = CameraPose {
            bearing: 90.0,
            ..CameraPose::new(0.0, 0.0, 4.0)
        };
        let p = MercatorProjector::new(pose, 512.0, 512.0);
        let (x, y) = p.project_lon_lat(1.0, 0.0);
        assert_close(x, 256.0, 1e-6);
        assert!(y < 256.0);
    }

    #[test]
    fn screen_round_trip_with_bearing() {
        let pose = CameraPose {
            bearing: 33.0,
            ..CameraPose::new(-74.75, 40.52, 9.0)
        };
        let p = MercatorProjector::new(pose, 1024.0, 768.0);
        let (x, y) = p.project_lon_lat(-74.6, 40.6);
        let (lon, lat) = p.screen_to_lon_lat(x, y);
        assert_close(lon, -74.6, 1e-9);
        assert_close(lat, 40.6, 1e-9);
    }

    #[test]
    fn pan_moves_content_with_pointer() {
        let pose = CameraPose::new(-74.75, 40.52, 9.0);
        let p = MercatorProjector::new(pose, 800.0, 600.0);
        // Dragging right reveals what was to the west.
        let panned = p.pan(pose, 100.0, 0.0);
        assert!(panned.longitude < pose.longitude);
        assert_close(panned.latitude, pose.latitude, 1e-9);
    }

    #[test]
    fn tile_lookup_matches_known_tiles() {
        assert_eq!(lon_lat_to_tile(0.0, 0.0, 1), (1, 1));
        assert_eq!(lon_lat_to_tile(-74.75, 40.52, 10), (299, 385));
        assert_eq!(lon_lat_to_tile(190.0, 0.0, 1), (2, 1));
    }

    #[test]
    fn tile_corner_contains_point() {
        let (x, y) = lon_lat_to_tile(-74.75, 40.52, 10);
        let (west, north) = tile_nw_lon_lat(10, x, y);
        let (east, south) = tile_nw_lon_lat(10, x + 1, y + 1);
        assert!(west <= -74.75 && -74.75 < east);
        assert!(south < 40.52 && 40.52 <= north);
        assert_close(tile_nw_lon_lat(0, 0, 0).1, 85.0511287798, 1e-6);
    }
}
