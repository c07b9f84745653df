//! Request handlers.

pub mod analyze;
pub mod health;
pub mod sessions;

pub use analyze::*;
pub use health::*;
pub use sessions::*;
