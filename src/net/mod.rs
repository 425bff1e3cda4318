//! Network layer.
//!
//! The listener itself is a plain `tokio::net::TcpListener` handed to the
//! server; this module only adds optional TLS.

pub mod tls;
