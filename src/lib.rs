//! ZoneLink Backend Library
//!
//! Exposes the identity and access-control core for the binary and the
//! integration tests.

pub mod auth;
