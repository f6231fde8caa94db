//! End-to-end integration tests.
//!
//! These tests start the real server on an ephemeral port with a stub
//! directory and drive it over HTTP.

mod common;
mod endpoints;
mod sso_flow;
mod startup;
