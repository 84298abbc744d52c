//! Password hashing with bcrypt.

use bcrypt::{hash, verify, DEFAULT_COST};

/// Hash a plaintext password for storage.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

/// Check a plaintext password against a stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        // Low cost keeps the test fast; production uses DEFAULT_COST.
        let hashed = bcrypt::hash("Johndoe123@", 4).unwrap();
        assert!(verify_password("Johndoe123@", &hashed).unwrap());
        assert!(!verify_password("WrongPass1@", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = bcrypt::hash("Johndoe123@", 4).unwrap();
        let b = bcrypt::hash("Johndoe123@", 4).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_garbage_hash_errors() {
        assert!(verify_password("Johndoe123@", "not-a-bcrypt-hash").is_err());
    }
}
