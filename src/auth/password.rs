use bcrypt::hash;
use once_cell::sync::OnceCell;

pub use bcrypt::BcryptError;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash with an explicit bcrypt cost (`security.password_cost` in configuration)
pub fn hash_password(plain: &str, cost: u32) -> Result<String, BcryptError> {
    hash(plain, cost)
}

/// A malformed stored hash counts as a mismatch
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    bcrypt::verify(plain, stored_hash).unwrap_or(false)
}

/// Burns one bcrypt verify for a login whose email matched no account, so the
/// response takes as long as a wrong password would. Always false.
pub fn verify_against_dummy(plain: &str, cost: u32) -> bool {
    static DUMMY_HASH: OnceCell<String> = OnceCell::new();

    if let Ok(dummy) = DUMMY_HASH.get_or_try_init(|| hash_password("no-such-account", cost)) {
        let _ = bcrypt::verify(plain, dummy);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_right_password() {
        let hashed = hash_password("correct horse", 4).unwrap();
        assert_ne!(hashed, "correct horse");
        assert!(verify_password("correct horse", &hashed));
        assert!(!verify_password("wrong horse", &hashed));
        assert!(!verify_password("correct horse", "not-a-bcrypt-hash"));
    }

    #[test]
    fn dummy_verify_never_matches() {
        assert!(!verify_against_dummy("no-such-account", 4));
        assert!(!verify_against_dummy("anything", 4));
    }
}
