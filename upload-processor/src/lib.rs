//! Upload processor: validates uploaded objects, records one terminal result
//! per object version and publishes it

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

pub mod content;
pub mod health;
pub mod object_reader;
pub mod processor;
pub mod types;
pub mod worker;
