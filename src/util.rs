// Shared helpers for the scraping services

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

/// Build the HTTP client shared by every service.
///
/// The scraped sites reject the default reqwest User-Agent, so we present a
/// plain browser one. The timeout applies per request.
pub fn http_client(user_agent: &str, timeout: Duration) -> Client {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .expect("failed to build HTTP client")
}

/// Parse a formatted shop price like "24,99€" or "-" into a float.
///
/// "-" is how some feeds spell a zero price. Currency symbols (including
/// mojibake variants from mis-decoded feeds) are dropped before parsing.
pub fn parse_price_str(price: &str) -> Result<f64> {
    let cleaned: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .map(|c| match c {
            ',' => '.',
            '-' => '0',
            other => other,
        })
        .collect();
    cleaned
        .parse()
        .with_context(|| format!("unparsable price {price:?}"))
}

const ROMAN_DIGITS: &[(u32, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Convert an integer to a roman numeral.
pub fn int_to_roman(mut value: u32) -> String {
    let mut roman = String::new();
    for &(weight, digits) in ROMAN_DIGITS {
        while value >= weight {
            roman.push_str(digits);
            value -= weight;
        }
    }
    roman
}

/// Convert a roman numeral to an integer, or `None` if the input is not a
/// well-formed numeral (round-tripping through `int_to_roman` rejects
/// malformed sequences like "IIX").
pub fn roman_to_int(roman: &str) -> Option<u32> {
    if roman.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    let mut prev: i64 = 0;
    for ch in roman.chars() {
        let value = match ch {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };

        // A smaller value before a larger one subtracts (IV, IX, ...)
        if value > prev {
            total += value - 2 * prev;
        } else {
            total += value;
        }
        prev = value;
    }

    let total = u32::try_from(total).ok()?;
    (int_to_roman(total) == roman).then_some(total)
}

/// Replace every word that is a roman numeral with its decimal spelling:
/// "Final Fantasy VII Remake" -> "Final Fantasy 7 Remake".
pub fn roman_words_to_digits(input: &str) -> String {
    input
        .split(' ')
        .map(|word| match roman_to_int(word) {
            Some(value) => value.to_string(),
            None => word.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_str() {
        assert_eq!(parse_price_str("24,99€").unwrap(), 24.99);
        assert_eq!(parse_price_str("1 299,00€").unwrap(), 1299.0);
        assert_eq!(parse_price_str("-").unwrap(), 0.0);
        assert_eq!(parse_price_str("5.49").unwrap(), 5.49);
        assert!(parse_price_str("free").is_err());
    }

    #[test]
    fn test_int_to_roman() {
        assert_eq!(int_to_roman(2), "II");
        assert_eq!(int_to_roman(6), "VI");
        assert_eq!(int_to_roman(19), "XIX");
        assert_eq!(int_to_roman(1994), "MCMXCIV");
    }

    #[test]
    fn test_roman_to_int() {
        assert_eq!(roman_to_int("II"), Some(2));
        assert_eq!(roman_to_int("VI"), Some(6));
        assert_eq!(roman_to_int("XIX"), Some(19));
        assert_eq!(roman_to_int("MCMXCIV"), Some(1994));

        // Malformed or non-roman input
        assert_eq!(roman_to_int(""), None);
        assert_eq!(roman_to_int("IIX"), None);
        assert_eq!(roman_to_int("ABC"), None);
        assert_eq!(roman_to_int("iv"), None);
    }

    #[test]
    fn test_roman_words_to_digits() {
        assert_eq!(
            roman_words_to_digits("Final Fantasy VII Remake"),
            "Final Fantasy 7 Remake"
        );
        assert_eq!(roman_words_to_digits("Grand Theft Auto V"), "Grand Theft Auto 5");
        assert_eq!(roman_words_to_digits("Portal 2"), "Portal 2");
    }
}
