//! Canopy: Document-Backed VFS Metadata
//!
//! A hierarchical virtual filesystem whose metadata lives as revisioned
//! documents in a document store while the byte-level tree is mirrored in a
//! path-addressed physical backend. Every directory carries a denormalized
//! canonical path; renames repair whole subtrees with a bounded concurrent
//! fan-out, relying on nothing stronger than per-document optimistic
//! concurrency.

pub mod config;
pub mod error;
pub mod logging;
pub mod physical;
pub mod store;
pub mod tree;
pub mod types;
pub mod vfs;
