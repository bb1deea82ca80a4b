// DocScan - app/mod.rs
//
// Application layer: scan session orchestration, artifact persistence, and
// the capability seam.
// Dependencies: core, util.
// Must NOT depend on: platform.

pub mod artifact;
pub mod capability;
pub mod controller;
