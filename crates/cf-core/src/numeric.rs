/// Floating point type used throughout system
pub type Real = f64;

/// Parse one form token as a finite number.
///
/// Reads the longest leading number and ignores whatever follows it, so
/// `"0.6 MPa"` is 0.6. Tokens with no leading number, and values that
/// overflow to infinity, yield `None`.
pub fn parse_scalar(text: &str) -> Option<Real> {
    let token = text.trim();
    let end = leading_number_len(token.as_bytes());
    if end == 0 {
        return None;
    }
    token[..end].parse::<Real>().ok().filter(|v| v.is_finite())
}

/// Length of the `[+-]digits[.digits][(e|E)[+-]digits]` prefix, or 0 when
/// there are no mantissa digits.
fn leading_number_len(bytes: &[u8]) -> usize {
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_end = digits_from(i);
    let mut mantissa_digits = int_end - i;
    i = int_end;

    if bytes.get(i) == Some(&b'.') {
        let frac_end = digits_from(i + 1);
        mantissa_digits += frac_end - (i + 1);
        // A lone "." after the integer part is dropped: "5." reads as 5.
        if frac_end > i + 1 {
            i = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
        }
    }
    i
}

/// Parse a comma separated list of numbers.
///
/// Lossy: tokens that do not parse are dropped rather than reported.
pub fn parse_number_array(text: &str) -> Vec<Real> {
    text.split(',').filter_map(parse_scalar).collect()
}

/// Display form of a number: integral values have no fractional part.
pub fn format_number(value: Real) -> String {
    format!("{value}")
}

pub fn format_number_list(values: &[Real]) -> String {
    values
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_drops_unparseable_tokens() {
        assert_eq!(parse_number_array("1, 2, x, 3"), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn array_keeps_leading_number_of_suffixed_tokens() {
        assert_eq!(parse_number_array("1, 2kg, 3"), vec![1.0, 2.0, 3.0]);
        assert_eq!(parse_number_array("20 C, 21.5C, x22"), vec![20.0, 21.5]);
    }

    #[test]
    fn array_handles_blank_and_spacing() {
        assert!(parse_number_array("").is_empty());
        assert!(parse_number_array(" , ,").is_empty());
        assert_eq!(parse_number_array("  4.5 ,6e1,,-2"), vec![4.5, 60.0, -2.0]);
    }

    #[test]
    fn array_drops_non_finite() {
        assert_eq!(parse_number_array("inf, NaN, 7"), vec![7.0]);
    }

    #[test]
    fn scalar_parsing() {
        assert_eq!(parse_scalar(" 12.5 "), Some(12.5));
        assert_eq!(parse_scalar(""), None);
        assert_eq!(parse_scalar("abc"), None);
        assert_eq!(parse_scalar("-infinity"), None);
    }

    #[test]
    fn scalar_reads_leading_number() {
        assert_eq!(parse_scalar("0.6 MPa"), Some(0.6));
        assert_eq!(parse_scalar("-3.5e2Pa"), Some(-350.0));
        assert_eq!(parse_scalar("7e"), Some(7.0));
        assert_eq!(parse_scalar("5."), Some(5.0));
        assert_eq!(parse_scalar(".25"), Some(0.25));
        assert_eq!(parse_scalar("1.2.3"), Some(1.2));
        assert_eq!(parse_scalar("-"), None);
        assert_eq!(parse_scalar("."), None);
        assert_eq!(parse_scalar("e5"), None);
        assert_eq!(parse_scalar("1e999"), None);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_number(20.0), "20");
        assert_eq!(format_number(0.95), "0.95");
        assert_eq!(format_number_list(&[1.0, 2.5, 3.0]), "1, 2.5, 3");
        assert_eq!(format_number_list(&[]), "");
    }
}
