//! Domain types shared across Veritext crates.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; infra maps to and from these.

pub mod analysis;
pub mod credit;
pub mod pagination;
pub mod user;
