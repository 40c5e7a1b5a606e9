//! Shared helpers for the catbus binaries.

pub mod bootstrap;
