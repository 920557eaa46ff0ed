//! File storage primitives.

pub mod atomic_file;

pub use atomic_file::{AtomicFile, AtomicTomlFile};
