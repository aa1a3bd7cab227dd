//! Bias correction of TraCE-21ka paleoclimate output against CRU
//! observations, and the derived inputs LPJ-GUESS needs.
//!
//! The numeric core ([`bias`], [`wet_days`], [`compose`], [`aggregate`])
//! works on in-memory [`grid::GridField`]s and never touches files or
//! configuration. [`pipeline`] wires it to readers, writers and the JSON
//! configuration.

pub mod aggregate;
pub mod bias;
pub mod compose;
pub mod config;
pub mod discovery;
pub mod extent;
pub mod grid;
pub mod pipeline;
pub mod readers;
pub mod utils;
pub mod wet_days;
pub mod writers;
