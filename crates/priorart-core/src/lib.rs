pub mod config;
pub mod error;
pub mod fakes;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
