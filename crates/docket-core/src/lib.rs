//! Core abstractions for Docket: the task entity, request payloads, and the
//! repository contract. This crate is intentionally small to keep dependency
//! surface minimal.

pub mod tasks;
