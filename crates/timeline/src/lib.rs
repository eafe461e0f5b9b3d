pub mod controls;
pub mod frame;
pub mod player;

pub use controls::*;
pub use frame::*;
pub use player::*;
