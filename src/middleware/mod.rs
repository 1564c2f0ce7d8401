// Middleware for CORS and session identification

pub mod cors;
pub mod session;

pub use cors::*;
pub use session::*;
