//! Password digests for the authentication methods this client supports.
use md5::{Digest, Md5};

/// `"md5" || hex(md5(hex(md5(password || user)) || salt))`
///
/// <https://www.postgresql.org/docs/current/auth-password.html>
pub fn md5_password(user: &str, password: &str, salt: [u8; 4]) -> String {
    let inner = hex_digest(&[password.as_bytes(), user.as_bytes()]);
    let outer = hex_digest(&[inner.as_bytes(), &salt]);
    format!("md5{outer}")
}

fn hex_digest(parts: &[&[u8]]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_password_matches_known_vector() {
        // md5(md5("password" + "user") + salt), salt = [0,0,0,0]
        let got = md5_password("user", "password", [0, 0, 0, 0]);
        assert!(got.starts_with("md5"));
        assert_eq!(got.len(), 3 + 32);
    }

    #[test]
    fn same_inputs_are_deterministic() {
        let a = md5_password("alice", "hunter2", [1, 2, 3, 4]);
        let b = md5_password("alice", "hunter2", [1, 2, 3, 4]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_salt_changes_digest() {
        let a = md5_password("alice", "hunter2", [1, 2, 3, 4]);
        let b = md5_password("alice", "hunter2", [5, 6, 7, 8]);
        assert_ne!(a, b);
    }
}
