mod credentials;
mod identity;
mod middleware;
mod session;
mod token;

pub use credentials::{SecretHasher, hash_password, verify_password};
pub use identity::{Identity, SignedIn, current_user};
pub use middleware::{AuthError, RequireSession};
pub use session::SessionContext;
pub use token::{IssuedToken, parse_token};
