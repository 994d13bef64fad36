pub mod config;
pub mod error;
pub mod transfer;

pub use config::{AppConfig, ClientConfig, ServerConfig};
pub use error::TransferError;
