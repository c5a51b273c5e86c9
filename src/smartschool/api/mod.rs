pub mod compare;
pub mod config;
pub mod dates;
pub mod error;
pub mod io;
pub mod logging;
pub mod manager;
pub mod model;
pub mod service;
pub mod tree;

pub use error::{ApiError, Result};
