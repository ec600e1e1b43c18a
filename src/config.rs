//! Configuration for bb, read from `bb.toml`.
//!
//! Each section has its own module with a raw serde struct and, where values
//! need validation, an internal one built from it. [load] ties them together.

pub mod display;
pub mod general;
pub mod input;
pub mod load;
pub mod theme;

pub use load::Config;
