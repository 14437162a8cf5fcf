//! `hearth-memory` – durable, cross-session agent memory.
//!
//! Persists the agent's identity document, the user-facts document and an
//! append-only log of long-term entries inside a single global configuration
//! directory.
//!
//! # Modules
//!
//! - [`store`] – [`PersistentStore`][store::PersistentStore]: bootstraps the
//!   on-disk resources and is their only writer.  Text documents live in
//!   `soul.md` / `user.md`; long-term entries live in the SQLite file
//!   `memory.db`.
//! - [`facade`] – [`MemoryFacade`][facade::MemoryFacade]: the single shared
//!   access point that tool adapters use; aggregates a
//!   [`MemoryContext`][hearth_types::MemoryContext] snapshot.
//!   [`LazyMemory`][facade::LazyMemory] defers construction to first use.
//! - [`search`] – case-insensitive substring matching over entries.
//! - [`tools`] – the "manage memory" and "search memory" contracts consumed by
//!   tool adapters.

pub mod facade;
pub mod search;
pub mod store;
pub mod tools;

pub use facade::{LazyMemory, MemoryFacade};
pub use store::{PersistentStore, StoreError};
