use foundation::math::MercatorProjector;

use crate::heatmap::HeatmapLayer;

/// RGBA8 image of a rasterized heatmap, row-major, premultiplication-free.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapRaster {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl HeatmapRaster {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    pub fn is_blank(&self) -> bool {
        self.rgba.chunks_exact(4).all(|px| px[3] == 0)
    }
}

/// Accumulates Gaussian kernels for every weighted point, then colorizes.
///
/// Densities are normalized by the frame's peak, so the hottest pixel always
/// gets the last color stop.
pub fn rasterize_heatmap(layer: &HeatmapLayer, projector: &MercatorProjector) -> HeatmapRaster {
    let width = projector.width_px.max(0.0) as u32;
    let height = projector.height_px.max(0.0) as u32;
    let (w, h) = (width as usize, height as usize);
    let mut density = vec![0.0f32; w * h];

    let style = &layer.style;
    let radius = style.radius_px.max(1.0);
    let sigma = radius / 3.0;
    let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);

    for ([lng, lat], weight) in layer.weighted_points() {
        let weight = weight * style.intensity;
        if !(weight.is_finite() && weight > 0.0) {
            continue;
        }
        let (px, py) = projector.project_lon_lat(lng, lat);
        if px < -radius || py < -radius || px > width as f64 + radius || py > height as f64 + radius
        {
            continue;
        }

        let x0 = (px - radius).floor().max(0.0) as usize;
        let x1 = ((px + radius).ceil().max(0.0) as usize).min(w);
        let y0 = (py - radius).floor().max(0.0) as usize;
        let y1 = ((py + radius).ceil().max(0.0) as usize).min(h);
        for y in y0..y1 {
            let dy = y as f64 + 0.5 - py;
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - px;
                let d2 = dx * dx + dy * dy;
                if d2 > radius * radius {
                    continue;
                }
                density[y * w + x] += (weight * (-d2 * inv_two_sigma2).exp()) as f32;
            }
        }
    }

    let peak = density.iter().copied().fold(0.0f32, f32::max);
    let mut rgba = vec![0u8; w * h * 4];
    if peak > 0.0 {
        let threshold = style.threshold;
        let span = (1.0 - threshold).max(f64::EPSILON);
        for (i, &d) in density.iter().enumerate() {
            let t = f64::from(d / peak);
            if t <= threshold || d <= 0.0 {
                continue;
            }
            let [r, g, b] = style.color_at(t);
            let alpha = ((t - threshold) / span).clamp(0.0, 1.0).sqrt();
            let o = i * 4;
            rgba[o] = r;
            rgba[o + 1] = g;
            rgba[o + 2] = b;
            rgba[o + 3] = (alpha * 255.0).round() as u8;
        }
    }

    HeatmapRaster {
        width,
        height,
        rgba,
    }
}
