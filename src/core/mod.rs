// DocScan - core/mod.rs
//
// Core layer: data model and the two concurrency primitives the controller
// is built on.
// Dependencies: standard library, serde, chrono, tokio (sync primitives only).
// Must NOT depend on: app or platform, and performs no filesystem access.

mod blocking;
pub mod model;
pub mod notify;
pub mod observable;
