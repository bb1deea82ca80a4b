// DocScan - platform/mod.rs
//
// Platform abstraction layer: directories, config.toml, OS helpers.
// Dependencies: standard library, directories crate, core model types.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
