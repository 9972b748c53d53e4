//! Database models split into domain-specific modules.

pub mod doctor;
pub mod form;
pub mod review;
pub mod user;

pub use doctor::*;
pub use form::*;
pub use review::*;
pub use user::*;
