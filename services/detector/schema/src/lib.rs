//! sea-orm entities owned by the detector service.

pub mod analyses;
pub mod users;
