//! SQLite storage layer for PlanUp.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode and a busy timeout
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`migrations`] - Versioned schema upgrades
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use sqlite::{
    EpicUpdate, IssueUpdate, MutationContext, SprintCompletion, SprintUpdate, SqliteStorage,
};
