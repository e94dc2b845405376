//! Service layer
//!
//! Separates image byte handling and the request-level operations from the
//! HTTP transport.

pub mod codec;
pub mod retouch;

pub use codec::ImageCodec;
pub use retouch::RetouchService;
