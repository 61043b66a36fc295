pub mod resolution;
pub mod roles;
pub mod session;
