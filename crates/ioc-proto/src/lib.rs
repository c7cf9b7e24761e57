//! Shared descriptor and identifier types for the IOC messaging library.
//!
//! This crate defines the types exchanged across the public API surface of
//! `ioc-core`: identifiers, service URIs, and the EVT/CMD/DAT descriptors.
//! It carries no behavior of its own, only data and the small amount of
//! validation that belongs to the data itself.

#![warn(missing_docs)]

pub mod types;

pub use types::*;
