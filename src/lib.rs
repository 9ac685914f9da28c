pub mod config;
pub mod error;
pub mod imaging;
pub mod pipeline;
pub mod readiness;
pub mod segmenter;
pub mod server;

pub use error::{Error, Result};
