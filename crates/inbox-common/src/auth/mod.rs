//! Access-token verification
//!
//! Tokens are issued by the identity service; this crate only checks them and
//! extracts the user id.

mod jwt;

pub use jwt::{strip_bearer, AuthError, Claims, JwtService, TokenType};
