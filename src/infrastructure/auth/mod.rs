//! Authentication infrastructure: JWT handling, password hashing, and the
//! token service

mod jwt;
mod password;
mod token_service;

pub use jwt::{KeySet, TokenClaims, TokenKeys};
pub use password::{Argon2Hasher, PasswordHasher};
pub use token_service::{TokenConfig, TokenPair, TokenService};
