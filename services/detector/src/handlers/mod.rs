pub mod analysis;
pub mod credits;
pub mod session;
pub mod user;
