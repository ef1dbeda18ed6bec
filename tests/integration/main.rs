//! Integration tests against mock HTTP servers
//!
//! These tests use wiremock to stand in for hosting sites and exercise the
//! reqwest-backed fetcher and full resolution runs end-to-end.

mod fetch_tests;
mod resolve_tests;
