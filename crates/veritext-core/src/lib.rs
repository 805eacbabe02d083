//! Service plumbing shared by Veritext binaries: tracing, request middleware,
//! health probes and wire serializers.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
