//! Phone number handling
//!
//! Normalization is a single-country heuristic: numbers that already carry a
//! `+` are trusted, numbers starting with the default country code get a `+`,
//! and everything else is assumed to be a local number. An international
//! number written without `+` that does not start with the default country
//! code is therefore mis-normalized; callers should submit E.164 numbers.

/// Normalize a phone number to E.164-like form.
///
/// `country_code` is given without the `+` (e.g. `"91"`).
pub fn normalize_phone_number(number: &str, country_code: &str) -> String {
    let number = number.trim();
    if number.starts_with('+') {
        number.to_string()
    } else if number.starts_with(country_code) {
        format!("+{}", number)
    } else {
        format!("+{}{}", country_code, number)
    }
}

/// Mask all but the last four digits, for logging
pub fn mask_phone_number(number: &str) -> String {
    let digits = number.chars().filter(|c| c.is_ascii_digit()).count();
    let keep_from = digits.saturating_sub(4);
    let mut seen = 0;
    number
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen <= keep_from {
                    return '*';
                }
            }
            c
        })
        .collect()
}
