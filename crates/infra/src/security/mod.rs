//! Security primitives (credential hashing).

mod password;

pub use password::Argon2PasswordHasher;
