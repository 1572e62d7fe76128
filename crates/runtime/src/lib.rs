//! Runtime orchestration for the conquest rule engine.
//!
//! This crate wires the pure `conquest-core` engine into something an
//! application can embed: [`Session`] owns one game and serializes player
//! intents into regulated operations, and [`FileSaveRepository`] persists
//! session snapshots to disk. Logging happens here, never in the core.
pub mod error;
pub mod repository;
pub mod session;

pub use error::SessionError;
pub use repository::{FileSaveRepository, RepositoryError};
pub use session::{Intent, SaveBlock, SaveGame, Session, SessionConfig};
