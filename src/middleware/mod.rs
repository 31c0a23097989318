mod admin_auth;
mod session;

pub use admin_auth::*;
pub use session::*;
