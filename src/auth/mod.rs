//! OTP verification engine, session issuing, and the cookie auth gate.

pub mod middleware;
pub mod otp;
pub mod password;
pub mod token;

pub use middleware::{AppState, AuthUser, Identity};
