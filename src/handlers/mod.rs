//! HTTP handlers: the studio dispatcher and its reverse proxy.

pub mod proxy;
pub mod studio;
pub use studio::handle;
