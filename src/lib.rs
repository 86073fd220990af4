pub mod config;
pub mod diagram;
pub mod game;

pub use config::*;
pub use diagram::*;
pub use game::*;
