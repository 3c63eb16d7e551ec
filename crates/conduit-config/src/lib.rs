#![allow(clippy::must_use_candidate)]

//! Configuration for the Conduit gateway client
//!
//! Plain values consumed once at client construction, loadable from TOML
//! with `{{ env.VAR }}` expansion so secrets stay out of the file.

mod env;
pub mod gateway;
mod loader;

pub use gateway::*;
