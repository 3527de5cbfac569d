//! Chilean RUT validation.
//!
//! A RUT is a 7-8 digit body plus a check digit in `0-9`/`K`, written with
//! optional thousand dots and a dash ("12.345.678-5"). The check digit is
//! mod-11 over the body with multipliers cycling 2..7 from the rightmost
//! digit: remainder 11 maps to '0', 10 to 'K', anything else to the digit
//! itself.

/// Strip dots and dashes and uppercase the check digit.
#[must_use]
pub fn normalize_rut(rut: &str) -> String {
    rut.trim()
        .chars()
        .filter(|c| *c != '.' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Validate format and checksum of a RUT in any accepted spelling.
#[must_use]
pub fn valid_rut(rut: &str) -> bool {
    let clean = normalize_rut(rut);
    if clean.is_empty() || !clean.is_ascii() {
        return false;
    }

    let body = &clean[..clean.len() - 1];
    let Some(dv) = clean.chars().last() else {
        return false;
    };

    // 7 or 8 digit body, check digit 0-9 or K.
    if body.len() < 7 || body.len() > 8 {
        return false;
    }
    if !body.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if !dv.is_ascii_digit() && dv != 'K' {
        return false;
    }

    dv == expected_check_digit(body)
}

fn expected_check_digit(body: &str) -> char {
    let mut sum: u32 = 0;
    let mut multiplier = 2;

    for c in body.chars().rev() {
        sum += c.to_digit(10).unwrap_or(0) * multiplier;
        multiplier = if multiplier == 7 { 2 } else { multiplier + 1 };
    }

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        digit => char::from_digit(digit, 10).unwrap_or('0'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_digit_check() {
        assert!(valid_rut("12345678-5"));
        assert!(valid_rut("12.345.678-5"));
        // dash is optional
        assert!(valid_rut("123456785"));
        assert!(valid_rut("7654321-6"));
    }

    #[test]
    fn accepts_k_and_zero_check_digits() {
        // body 1111511 -> remainder 1 -> 'K'
        assert!(valid_rut("1111511-K"));
        assert!(valid_rut("1.111.511-k"));
        // body 1111113 -> remainder 0 -> '0'
        assert!(valid_rut("1111113-0"));
    }

    #[test]
    fn rejects_wrong_check_digit() {
        assert!(!valid_rut("12345678-6"));
        assert!(!valid_rut("1111511-1"));
        assert!(!valid_rut("1111113-K"));
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(!valid_rut(""));
        assert!(!valid_rut("K"));
        // 6 digit body, too short
        assert!(!valid_rut("123456-0"));
        // 9 digit body, too long
        assert!(!valid_rut("123456789-2"));
        assert!(!valid_rut("12E45678-5"));
        assert!(!valid_rut("12345678-X"));
    }
}
