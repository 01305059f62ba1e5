//! # dynadir-core
//!
//! Shared library for dynadir: the two-level peer-to-peer naming and
//! directory protocol, plus its chat collaborator.
//!
//! Contains domain types, the roster, the wire codec, the directory engine's
//! state machine, and per-process identity configuration. This crate is used
//! by the `dynadir` binary; it has no knowledge of sockets or the event loop
//! that drives it.

pub mod codec;
pub mod config;
pub mod contact;
pub mod engine;
pub mod roster;
pub mod types;
