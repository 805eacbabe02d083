pub mod analyze;
pub mod credits;
pub mod history;
pub mod session;
pub mod user;
