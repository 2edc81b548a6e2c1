//! Salted, iterated SHA-256 password digests.
//!
//! Stored hash format: `sha256i$<iterations>$<hex digest>`, with the salt kept
//! in its own column as hex.

use rand::RngCore;
use sha2::{Digest, Sha256};

pub const MIN_PASSWORD_CHARS: usize = 8;
const DEFAULT_ITERATIONS: u32 = 60_000;
const SALT_BYTES: usize = 16;
const SCHEME: &str = "sha256i";

/// Digest and salt ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub hash: String,
    pub salt: String,
}

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> PasswordDigest {
    let mut salt = [0_u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = to_hex(&salt);
    hash_with(password, &salt_hex, DEFAULT_ITERATIONS)
}

/// Checks `password` against a stored digest.
///
/// Returns `false` for malformed stored hashes instead of failing.
pub fn verify_password(password: &str, stored_hash: &str, salt_hex: &str) -> bool {
    let mut parts = stored_hash.splitn(3, '$');
    let (Some(scheme), Some(iterations), Some(expected)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let candidate = digest(password, salt_hex, iterations);
    constant_time_eq(to_hex(&candidate).as_bytes(), expected.as_bytes())
}

fn hash_with(password: &str, salt_hex: &str, iterations: u32) -> PasswordDigest {
    let digest = digest(password, salt_hex, iterations);
    PasswordDigest {
        hash: format!("{SCHEME}${iterations}${}", to_hex(&digest)),
        salt: salt_hex.to_string(),
    }
}

fn digest(password: &str, salt_hex: &str, iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    let mut current: [u8; 32] = hasher.finalize().into();

    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(current);
        hasher.update(salt_hex.as_bytes());
        current = hasher.finalize().into();
    }
    current
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{constant_time_eq, hash_password, hash_with, verify_password};

    #[test]
    fn hash_then_verify_accepts_only_the_same_password() {
        let digest = hash_password("s3cret-pass");
        assert!(digest.hash.starts_with("sha256i$"));
        assert!(verify_password("s3cret-pass", &digest.hash, &digest.salt));
        assert!(!verify_password("s3cret-pasS", &digest.hash, &digest.salt));
    }

    #[test]
    fn salts_make_equal_passwords_hash_differently() {
        let first = hash_password("same-password");
        let second = hash_password("same-password");
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn iteration_count_is_read_from_the_stored_hash() {
        let digest = hash_with("pw-12345", "00ff", 3);
        assert!(digest.hash.starts_with("sha256i$3$"));
        assert!(verify_password("pw-12345", &digest.hash, "00ff"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", "", "00"));
        assert!(!verify_password("x", "md5$1$abcd", "00"));
        assert!(!verify_password("x", "sha256i$zero$abcd", "00"));
        assert!(!verify_password("x", "sha256i$0$abcd", "00"));
    }

    #[test]
    fn constant_time_eq_compares_length_and_bytes() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
