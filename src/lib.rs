//! nginx-replay Library
//!
//! Core modules for the access log replay tool: log decoding, timeline
//! construction, pacing, dispatch, and outcome aggregation.

pub mod access_log;
pub mod replay;
