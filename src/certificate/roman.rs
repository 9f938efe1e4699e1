//! Subtractive roman numerals.

const NUMERALS: [(u32, &str); 13] = [
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

/// Largest value with a standard representation.
pub const MAX_ROMAN: u32 = 3999;

/// Convert `1..=3999` to roman numerals; `None` outside that range.
pub fn to_roman(mut number: u32) -> Option<String> {
    if number == 0 || number > MAX_ROMAN {
        return None;
    }

    let mut numeral = String::new();
    for (value, symbol) in NUMERALS {
        while number >= value {
            numeral.push_str(symbol);
            number -= value;
        }
    }
    Some(numeral)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let cases = [
            (1, "I"),
            (4, "IV"),
            (6, "VI"),
            (9, "IX"),
            (40, "XL"),
            (90, "XC"),
            (400, "CD"),
            (1994, "MCMXCIV"),
            (2024, "MMXXIV"),
            (3999, "MMMCMXCIX"),
        ];
        for (n, expected) in cases {
            assert_eq!(to_roman(n).as_deref(), Some(expected), "converting {n}");
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(to_roman(0), None);
        assert_eq!(to_roman(4000), None);
    }
}
