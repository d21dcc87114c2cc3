mod helpers;
mod middleware;
mod token;

pub use middleware::{RequireAdmin, RequireAuth, RequireUser};
pub use token::{TokenGenerator, parse_token};
