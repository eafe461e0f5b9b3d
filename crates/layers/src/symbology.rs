use formats::HeatmapConfig;

/// Six-stop yellow to dark red ramp, low density first.
pub const DEFAULT_COLOR_RANGE: [[u8; 3]; 6] = [
    [255, 255, 178],
    [254, 217, 118],
    [254, 178, 76],
    [253, 141, 60],
    [240, 59, 32],
    [189, 0, 38],
];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeatmapStyle {
    pub radius_px: f64,
    pub intensity: f64,
    pub threshold: f64,
    pub color_range: [[u8; 3]; 6],
}

impl HeatmapStyle {
    /// Color for a normalized density in `[0, 1]`, interpolated between stops.
    pub fn color_at(&self, t: f64) -> [u8; 3] {
        let t = t.clamp(0.0, 1.0);
        let last = self.color_range.len() - 1;
        let pos = t * last as f64;
        let i = (pos.floor() as usize).min(last - 1);
        let f = pos - i as f64;
        let a = self.color_range[i];
        let b = self.color_range[i + 1];
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
        [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
    }
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self::from(HeatmapConfig::default())
    }
}

impl From<HeatmapConfig> for HeatmapStyle {
    fn from(c: HeatmapConfig) -> Self {
        Self {
            radius_px: c.radius_px,
            intensity: c.intensity,
            threshold: c.threshold.clamp(0.0, 1.0),
            color_range: DEFAULT_COLOR_RANGE,
        }
    }
}
