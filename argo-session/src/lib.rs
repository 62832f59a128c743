#![deny(missing_docs)]
//! Persistent session state: messages, rolling summaries, snapshots,
//! profile facts, and the tool-run audit log (§4.10 of the spec).
//!
//! Two implementations ship: [`memory::InMemorySessionStore`] (testing,
//! short-lived processes, mirroring `agent-runtime`'s
//! `InMemorySessionStorage`) and [`sqlite::SqliteSessionStore`] (the
//! locally-hosted production backend, one file per assistant install).

pub mod memory;
pub mod sqlite;
pub mod store;
pub mod summary;

pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use store::{SessionStore, ToolUseStats};
pub use summary::regenerate_summary_if_due;
