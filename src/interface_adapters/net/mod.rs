// Network adapter modules split by external client sockets vs internal HTTP routes.

pub mod client;
pub mod internal;
pub mod outbound;

pub use client::ws_handler;
pub use internal::{health_handler, reload_handler};
pub use outbound::SessionHub;
