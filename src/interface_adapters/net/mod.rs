pub mod client;

pub use client::{broadcast_serializer, ws_handler};
