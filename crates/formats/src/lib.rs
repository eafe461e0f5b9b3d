pub mod config;
pub mod points;

pub use config::*;
pub use points::*;
