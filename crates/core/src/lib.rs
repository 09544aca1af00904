pub mod config;
pub mod error;
pub mod offset;

pub use config::Config;
pub use error::*;
pub use offset::{format_offset, parse_offset};
