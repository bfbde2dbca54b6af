//! Module system tests
//!
//! Registry lifecycle, dependency resolution, the built-in capability
//! modules, and concurrent access to the registry.


mod capability_tests;
mod concurrency_tests;
mod lifecycle_tests;
