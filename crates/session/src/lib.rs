pub mod overlay;
pub mod view_sync;

pub use overlay::*;
pub use view_sync::*;
