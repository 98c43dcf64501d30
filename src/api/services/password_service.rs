//! Password hashing with bcrypt.

use super::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy)]
pub struct PasswordService {
    cost: u32,
}

impl PasswordService {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> ServiceResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))
    }

    /// Malformed stored hashes verify as a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("Stored password hash could not be checked: {}", e);
                false
            }
        }
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
