pub mod heatmap;
pub mod layer;
pub mod raster;
pub mod symbology;

pub use heatmap::*;
pub use layer::*;
