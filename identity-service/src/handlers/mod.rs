pub mod auth;
pub mod permission;
pub mod role;
pub mod user;
pub mod well_known;
