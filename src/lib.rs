pub mod api;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod ocr;
pub mod preprocess;
pub mod resolver;
pub mod state;

pub use error::ResolveError;
pub use frame::Frame;
pub use resolver::{CascadeStage, Resolution, ScreenStateResolver};
pub use state::ScreenState;
