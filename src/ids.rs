//! Session id and secret generation.
//!
//! Ids and secrets are drawn from a 32-symbol alphabet that excludes the
//! visually confusable characters `0`, `O`, `1`, `I`. `L` is kept.

use rand::Rng;

pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const ID_LEN: usize = 4;
pub const SECRET_LEN: usize = 16;

/// Draw `len` bytes from a cryptographically strong RNG and map each modulo
/// 32 into `ALPHABET`.
fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate a 16-character secret. Collisions are not checked: the space is
/// large enough (32^16 ~= 2^80) that they are not a correctness concern.
pub fn generate_secret() -> String {
    random_token(SECRET_LEN)
}

/// Generate a 4-character session id that is not already in use, per
/// `already_used`. Retries via rejection sampling.
pub fn generate_unique_id(mut already_used: impl FnMut(&str) -> bool) -> String {
    loop {
        let candidate = random_token(ID_LEN);
        if !already_used(&candidate) {
            return candidate;
        }
    }
}
