use std::cell::RefCell;
use std::rc::Rc;

use foundation::CameraPose;
use foundation::math::MercatorProjector;
use layers::raster::{HeatmapRaster, rasterize_heatmap};
use layers::{HeatmapDataSource, HeatmapLayer, LayerSink};
use tracing::debug;

/// State of the overlay renderer: its camera and the layer it draws.
///
/// There is exactly one per view. The timeline pushes layers into it and the
/// camera controller moves it; both hold a [`SessionHandle`].
#[derive(Debug)]
pub struct RenderSession {
    pose: CameraPose,
    viewport_px: (f64, f64),
    data_source: HeatmapDataSource,
    dirty: bool,
}

impl RenderSession {
    pub fn new(initial_pose: CameraPose, width_px: f64, height_px: f64) -> Self {
        Self {
            pose: initial_pose.normalized(),
            viewport_px: (width_px.max(1.0), height_px.max(1.0)),
            data_source: HeatmapDataSource::new(),
            dirty: true,
        }
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Applies a controller pose and returns what was actually stored.
    pub fn set_view_state(&mut self, pose: CameraPose) -> CameraPose {
        self.pose = pose.normalized();
        self.dirty = true;
        self.pose
    }

    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        self.viewport_px = (width_px.max(1.0), height_px.max(1.0));
        self.dirty = true;
    }

    pub fn viewport_px(&self) -> (f64, f64) {
        self.viewport_px
    }

    pub fn projector(&self) -> MercatorProjector {
        MercatorProjector::new(self.pose, self.viewport_px.0, self.viewport_px.1)
    }

    pub fn data_source(&self) -> &HeatmapDataSource {
        &self.data_source
    }

    pub fn layer(&self) -> Option<&HeatmapLayer> {
        self.data_source.current()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rasterizes the current layer and clears the dirty flag.
    ///
    /// Returns `None` before the first layer arrives.
    pub fn render(&mut self) -> Option<HeatmapRaster> {
        self.dirty = false;
        let projector = self.projector();
        let layer = self.data_source.current()?;
        debug!(records = layer.data.len(), zoom = self.pose.zoom, "rendering overlay");
        Some(rasterize_heatmap(layer, &projector))
    }
}

impl LayerSink for RenderSession {
    fn replace_layer(&mut self, layer: HeatmapLayer) {
        self.data_source.replace(layer);
        self.dirty = true;
    }
}

/// Shared, single-threaded handle to the one [`RenderSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle(Rc<RefCell<RenderSession>>);

impl SessionHandle {
    pub fn new(session: RenderSession) -> Self {
        Self(Rc::new(RefCell::new(session)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&RenderSession) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut RenderSession) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl LayerSink for SessionHandle {
    fn replace_layer(&mut self, layer: HeatmapLayer) {
        self.0.borrow_mut().replace_layer(layer);
    }
}
