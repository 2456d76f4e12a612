//! Human-readable submission identifiers.
//!
//! A journal ID has the form `PREFIX-XXXXXXXX-XXXXXXXX`, where each `X` is a
//! random uppercase letter or digit.

use rand::Rng;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "CSPG-ISR";

/// How many times a colliding ID is regenerated before giving up.
pub const MAX_ATTEMPTS: usize = 10;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a new journal ID.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, prefix: &str) -> String {
    let mut id = String::with_capacity(prefix.len() + 18);
    id.push_str(prefix);

    for _ in 0..2 {
        id.push('-');
        for _ in 0..8 {
            id.push(ALPHABET[rng.gen_range(0, ALPHABET.len())] as char);
        }
    }

    id
}

/// Check whether a string is a well-formed journal ID with given prefix.
pub fn is_valid(id: &str, prefix: &str) -> bool {
    let rest = match id.strip_prefix(prefix) {
        Some(rest) => rest,
        None => return false,
    };

    let groups = rest.split('-').collect::<Vec<_>>();

    groups.len() == 3
        && groups[0].is_empty()
        && groups[1..].iter().all(|group| group.len() == 8
            && group.bytes().all(|b| ALPHABET.contains(&b)))
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use super::*;

    #[test]
    fn format() {
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let id = generate(&mut rng, DEFAULT_PREFIX);
            assert_eq!(id.len(), "CSPG-ISR-XXXXXXXX-XXXXXXXX".len());
            assert!(id.starts_with("CSPG-ISR-"));
            assert!(is_valid(&id, DEFAULT_PREFIX), "{} is malformed", id);
        }
    }

    #[test]
    fn custom_prefix() {
        let id = generate(&mut StdRng::seed_from_u64(7), "TEST");
        assert!(is_valid(&id, "TEST"));
        assert!(!is_valid(&id, DEFAULT_PREFIX));
    }

    #[test]
    fn validation() {
        assert!(is_valid("CSPG-ISR-ABCD1234-0000ZZZZ", DEFAULT_PREFIX));
        assert!(!is_valid("CSPG-ISR-abcd1234-0000ZZZZ", DEFAULT_PREFIX));
        assert!(!is_valid("CSPG-ISR-ABCD123-0000ZZZZ", DEFAULT_PREFIX));
        assert!(!is_valid("CSPG-ISR-ABCD1234", DEFAULT_PREFIX));
        assert!(!is_valid("CSPG-ISR-ABCD1234-0000ZZZZ-", DEFAULT_PREFIX));
    }
}
