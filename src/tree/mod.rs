//! Directory tree operations
//!
//! Path and name resolution, the directory entity with its lookups and
//! metadata updates, children fetching, and the move protocol that keeps
//! denormalized paths consistent across a subtree.

pub mod children;
pub mod directory;
pub mod path;
pub mod rename;
