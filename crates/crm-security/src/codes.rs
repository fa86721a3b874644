//! Redeemable code and document number generation

use chrono::NaiveDate;
use rand::Rng;

/// No 0/O or 1/I/L, so codes survive being read aloud or retyped.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_GROUPS: usize = 4;
const CODE_GROUP_LEN: usize = 4;

fn random_chars(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// `XXXX-XXXX-XXXX-XXXX`
pub fn generate_activation_code() -> String {
    (0..CODE_GROUPS)
        .map(|_| random_chars(CODE_GROUP_LEN))
        .collect::<Vec<_>>()
        .join("-")
}

/// Canonical form used for lookups: upper-case, surrounding whitespace removed.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// `INV-YYYYMMDD-XXXXXX`
pub fn invoice_number(date: NaiveDate) -> String {
    format!("INV-{}-{}", date.format("%Y%m%d"), random_chars(6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_code_format() {
        let code = generate_activation_code();
        let groups: Vec<&str> = code.split('-').collect();
        assert_eq!(groups.len(), CODE_GROUPS);
        for group in groups {
            assert_eq!(group.len(), CODE_GROUP_LEN);
            assert!(group.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_invoice_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let number = invoice_number(date);
        assert!(number.starts_with("INV-20260309-"));
        assert_eq!(number.len(), "INV-20260309-".len() + 6);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  abcd-efgh "), "ABCD-EFGH");
    }
}
