/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and password strength rules
/// - [`jwt`]: HS256 token issuance and validation
/// - [`middleware`]: Bearer token extraction into an [`middleware::AuthContext`]
/// - [`authorization`]: Group membership, creator and removal checks

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
