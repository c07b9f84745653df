//! Background services and in-memory stores.

pub mod session_store;
pub mod sweeper;

pub use session_store::{AnalysisSession, SessionStore};
pub use sweeper::SessionSweeper;
