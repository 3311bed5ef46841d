//! Duplex message channel used by the login route.

pub mod websocket;

pub use websocket::DuplexChannel;
