//! Ambient scaffolding that exercises `frontend`: manifest parsing and the
//! `glint` CLI. This is the external collaborator the compiler core's
//! contract is written against, kept around so the crate builds to a
//! runnable binary.

pub mod cli;
pub mod host_compile;
pub mod manifest;
