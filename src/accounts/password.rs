use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use crate::common::{AttendanceError, Result};

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "v1";
const SALT_LEN: usize = 16;

/// Hashes a password as `v1$<iterations>$<salt>$<digest>`.
pub fn hash_password(password: &str, iterations: u32) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let digest = rounds(password, &salt, iterations)?;
    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest)
    ))
}

/// Returns `Ok(false)` on a wrong password. A malformed stored hash is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let malformed = || AttendanceError::Storage("malformed password hash".to_string());

    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(digest), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };
    if scheme != SCHEME {
        return Err(malformed());
    }

    let iterations: u32 = iterations.parse().map_err(|_| malformed())?;
    let salt = STANDARD_NO_PAD.decode(salt).map_err(|_| malformed())?;
    let expected = STANDARD_NO_PAD.decode(digest).map_err(|_| malformed())?;
    if iterations == 0 {
        return Err(malformed());
    }

    // Recompute all but the last round, then let the MAC do a constant-time check
    let previous = rounds(password, &salt, iterations - 1)?;
    let mut mac = keyed(password)?;
    mac.update(&previous);
    Ok(mac.verify_slice(&expected).is_ok())
}

fn keyed(password: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(password.as_bytes())
        .map_err(|e| AttendanceError::Other(anyhow::anyhow!("HMAC key error: {}", e)))
}

fn rounds(password: &str, salt: &[u8], count: u32) -> Result<Vec<u8>> {
    let mut block = salt.to_vec();
    for _ in 0..count {
        let mut mac = keyed(password)?;
        mac.update(&block);
        block = mac.finalize().into_bytes().to_vec();
    }
    Ok(block)
}
