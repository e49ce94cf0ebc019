//! Shared HTTP response envelopes

pub mod response;
