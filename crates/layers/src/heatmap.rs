use formats::PointRecord;
use tracing::debug;

use crate::layer::{Layer, LayerId};
use crate::symbology::HeatmapStyle;

pub const HEATMAP_LAYER_ID: LayerId = LayerId("heatmapLayer");

pub fn record_position(record: &PointRecord) -> [f64; 2] {
    [record.lng, record.lat]
}

pub fn record_weight(record: &PointRecord) -> f64 {
    record.count
}

/// Declarative description of what the overlay should draw.
#[derive(Debug, Clone)]
pub struct HeatmapLayer {
    id: LayerId,
    pub data: Vec<PointRecord>,
    pub style: HeatmapStyle,
    pub get_position: fn(&PointRecord) -> [f64; 2],
    pub get_weight: fn(&PointRecord) -> f64,
}

impl HeatmapLayer {
    pub fn new(data: Vec<PointRecord>, style: HeatmapStyle) -> Self {
        Self {
            id: HEATMAP_LAYER_ID,
            data,
            style,
            get_position: record_position,
            get_weight: record_weight,
        }
    }

    /// `(position, weight)` pairs as the renderer consumes them.
    pub fn weighted_points(&self) -> impl Iterator<Item = ([f64; 2], f64)> + '_ {
        self.data
            .iter()
            .map(|r| ((self.get_position)(r), (self.get_weight)(r)))
    }

    pub fn total_weight(&self) -> f64 {
        self.weighted_points().map(|(_, w)| w).sum()
    }
}

impl Layer for HeatmapLayer {
    fn id(&self) -> LayerId {
        self.id
    }
}

/// Receives replacement layer descriptions.
pub trait LayerSink {
    fn replace_layer(&mut self, layer: HeatmapLayer);
}

/// Holds the single current heatmap layer.
///
/// Every `replace` discards the previous description; `generation` counts
/// replacements so consumers can tell a new layer from a re-render.
#[derive(Debug, Default)]
pub struct HeatmapDataSource {
    current: Option<HeatmapLayer>,
    generation: u64,
}

impl HeatmapDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, layer: HeatmapLayer) {
        self.generation = self.generation.wrapping_add(1);
        debug!(
            layer = %layer.id(),
            records = layer.data.len(),
            generation = self.generation,
            "replaced heatmap layer"
        );
        self.current = Some(layer);
    }

    pub fn current(&self) -> Option<&HeatmapLayer> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl LayerSink for HeatmapDataSource {
    fn replace_layer(&mut self, layer: HeatmapLayer) {
        self.replace(layer);
    }
}

#[cfg(test)]
mod tests {
    use super::{HEATMAP_LAYER_ID, HeatmapDataSource, HeatmapLayer, LayerSink};
    use crate::layer::Layer;
    use crate::symbology::HeatmapStyle;
    use formats::{Gender, PointRecord};
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<PointRecord> {
        vec![
            PointRecord::new(-74.7, 40.5, 2.0, Gender::Male),
            PointRecord::new(-74.6, 40.4, 3.5, Gender::Female),
        ]
    }

    #[test]
    fn accessors_map_position_and_weight() {
        let layer = HeatmapLayer::new(sample(), HeatmapStyle::default());
        assert_eq!(layer.id(), HEATMAP_LAYER_ID);
        let pts: Vec<_> = layer.weighted_points().collect();
        assert_eq!(pts, vec![([-74.7, 40.5], 2.0), ([-74.6, 40.4], 3.5)]);
        assert_eq!(layer.total_weight(), 5.5);
    }

    #[test]
    fn replace_discards_previous_layer() {
        let mut source = HeatmapDataSource::new();
        assert!(source.current().is_none());

        source.replace_layer(HeatmapLayer::new(sample(), HeatmapStyle::default()));
        source.replace_layer(HeatmapLayer::new(sample()[..1].to_vec(), HeatmapStyle::default()));

        assert_eq!(source.generation(), 2);
        let current = source.current().expect("layer");
        assert_eq!(current.data, sample()[..1].to_vec());
    }
}
