//! QUIC-based single file transfer using quinn.
//!
//! This module provides:
//! - The secure channel (self-signed server certificate, file-transfer ALPN)
//! - Header framing for the name that precedes the payload
//! - The client driver that sends one file per connection
//! - The acceptor that stores one file per connection
//! - The supervisor that runs the accept loop and graceful shutdown

pub mod constants;
pub mod protocol;
pub mod quic;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod utils;

// Re-export public API
pub use constants::ALPN;
pub use protocol::{decode_header, encode_header};
pub use quic::{make_client_endpoint, make_server_endpoint};
pub use receiver::{ReceivedFile, handle_stream};
pub use sender::{TransferReport, send_file};
pub use server::{SupervisorState, TransferServer};
