use rand::Rng;

/// Prefix carried by every internally generated reference
pub const REFERENCE_PREFIX: &str = "AF";

const RANDOM_SUFFIX_LEN: usize = 6;
const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Short human-readable reference: prefix, base-36 millisecond timestamp,
/// six random base-36 characters, upper-cased.
///
/// References sort roughly by creation time but are not guaranteed unique;
/// the `moko_reference` unique constraint rejects collisions.
pub fn generate_reference() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())] as char)
        .collect();

    format!("{}{}{}", REFERENCE_PREFIX, to_base36(millis), suffix).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn reference_shape() {
        let reference = generate_reference();
        assert!(reference.starts_with(REFERENCE_PREFIX));
        assert!(reference
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        // 8 timestamp characters until the year 2059
        assert_eq!(reference.len(), REFERENCE_PREFIX.len() + 8 + RANDOM_SUFFIX_LEN);
    }

    #[test]
    fn consecutive_references_differ() {
        let a = generate_reference();
        let b = generate_reference();
        assert_ne!(a, b);
    }
}
