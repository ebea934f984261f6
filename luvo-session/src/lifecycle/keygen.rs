use rand::Rng;

use luvo_shared::errors::{AppError, AppResult, ErrorCode};

/// Retry budget for generate-and-check uniqueness loops. The source of
/// randomness makes collisions vanishingly rare; hitting the cap means the
/// store is misbehaving, so we fail with a retryable error instead of
/// spinning.
pub const MAX_GENERATION_ATTEMPTS: u32 = 8;

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    let buf: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    hex::encode(buf)
}

/// External transport channel name, `ch_` followed by 24 hex characters.
pub fn channel_name() -> String {
    format!("ch_{}", random_hex(12))
}

/// Camera ingest key, `sk_` followed by 32 hex characters.
pub fn stream_key() -> String {
    format!("sk_{}", random_hex(16))
}

/// Per-participant transport UID: a random nonzero 32-bit value, widened
/// for storage. Zero is reserved by the transport SDK.
pub fn transport_uid() -> i64 {
    let mut rng = rand::thread_rng();
    loop {
        let uid: u32 = rng.gen();
        if uid != 0 {
            return i64::from(uid);
        }
    }
}

/// Generate a candidate until `taken` says it is free, up to the retry
/// budget. Surfaces `GenerationExhausted` when the budget runs out.
pub fn generate_unique<T>(
    what: &str,
    mut gen: impl FnMut() -> T,
    mut taken: impl FnMut(&T) -> AppResult<bool>,
) -> AppResult<T> {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let candidate = gen();
        if !taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(AppError::new(
        ErrorCode::GenerationExhausted,
        format!("could not generate a unique {what} after {MAX_GENERATION_ATTEMPTS} attempts"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_format() {
        let name = channel_name();
        assert!(name.starts_with("ch_"));
        assert_eq!(name.len(), 3 + 24);
        assert!(name[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stream_key_format() {
        let key = stream_key();
        assert!(key.starts_with("sk_"));
        assert_eq!(key.len(), 3 + 32);
    }

    #[test]
    fn transport_uid_is_nonzero_u32() {
        for _ in 0..100 {
            let uid = transport_uid();
            assert!(uid > 0);
            assert!(uid <= i64::from(u32::MAX));
        }
    }

    #[test]
    fn generate_unique_retries_past_collisions() {
        let mut n = 0;
        let value = generate_unique(
            "test id",
            || {
                n += 1;
                n
            },
            |candidate| Ok(*candidate < 3),
        )
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn generate_unique_exhausts_budget() {
        let err = generate_unique("test id", || 1, |_| Ok(true)).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::GenerationExhausted);
    }
}
