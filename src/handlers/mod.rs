pub mod readiness;
pub mod route;
