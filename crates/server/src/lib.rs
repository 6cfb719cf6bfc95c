//! HTTP front end for the media relay.
//!
//! Exposed as a library so integration tests can build the router around
//! mock collaborators.

pub mod api;
pub mod metrics;
pub mod state;
