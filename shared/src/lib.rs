//! Shared types for Crab connectivity crates
//!
//! Wire DTOs used by both the API client and the print daemon link.

pub mod client;
pub mod printing;

// Re-exports
pub use serde::{Deserialize, Serialize};
