//! Durable storage for Docket tasks: a JSON file rewritten in full on every
//! mutation, fronted by the in-memory authoritative list.

pub mod json_file;

pub use json_file::JsonFileRepo;
