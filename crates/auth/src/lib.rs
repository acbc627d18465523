//! `medstock-auth` — authentication boundary (tokens, passwords, roles).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod operator;
pub mod password;
pub mod roles;

pub use claims::{Claims, Hs256Tokens, TokenError, TOKEN_TTL};
pub use operator::{NewOperator, Operator};
pub use password::{hash_password, verify_password, PasswordError};
pub use roles::Role;
