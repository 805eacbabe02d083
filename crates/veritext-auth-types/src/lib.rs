//! Auth types shared across Veritext crates.
//!
//! Provides the stateless token codec, cookie builders, and token-transport helpers.

pub mod cookie;
pub mod token;
pub mod transport;
