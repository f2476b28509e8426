use std::borrow::Cow;

/// Longest reference we are willing to scan for a terminating `;`
const MAX_REFERENCE_LEN: usize = 32;

/// Replace character references (`&lt;`, `&#60;`, `&#x3C;`, ...) with the characters they name.
/// Unknown or malformed references are left untouched.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match parse_reference(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parse a reference at the start of `input`, returning the character and the length consumed
fn parse_reference(input: &str) -> Option<(char, usize)> {
    let end = input
        .bytes()
        .take(MAX_REFERENCE_LEN + 1)
        .position(|b| b == b';')?;
    let body = &input[1..end];
    let c = match body.strip_prefix('#') {
        Some(numeric) => numeric_reference(numeric)?,
        None => named_reference(body)?,
    };
    Some((c, end + 1))
}

/// Digits only, no sign. NUL, surrogates and out of range values become U+FFFD.
fn numeric_reference(numeric: &str) -> Option<char> {
    let (digits, radix) = match numeric
        .strip_prefix('x')
        .or_else(|| numeric.strip_prefix('X'))
    {
        Some(hex) => (hex, 16),
        None => (numeric, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let code = u32::from_str_radix(digits, radix).unwrap_or(u32::MAX);
    Some(
        char::from_u32(code)
            .filter(|&c| c != '\0')
            .unwrap_or(char::REPLACEMENT_CHARACTER),
    )
}

fn named_reference(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "thinsp" => '\u{2009}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "minus" => '\u{2212}',
        "times" => '\u{d7}',
        _ => return None,
    })
}

#[cfg(test)]
#[test]
fn test_decode_entities() {
    assert_eq!(decode_entities("a &lt; b"), "a < b");
    assert_eq!(decode_entities("x &#60; y &#x3c; z"), "x < y < z");
    assert_eq!(decode_entities("\\{a &amp;&amp; b\\}"), "\\{a && b\\}");
    assert!(matches!(decode_entities("plain"), Cow::Borrowed("plain")));
}

#[cfg(test)]
#[test]
fn test_decode_malformed() {
    assert_eq!(decode_entities("AT&T"), "AT&T");
    assert_eq!(decode_entities("&bogus;"), "&bogus;");
    assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
    assert_eq!(decode_entities("trailing &"), "trailing &");
}

#[cfg(test)]
#[test]
fn test_decode_numeric_edge_cases() {
    assert_eq!(decode_entities("&#+60;"), "&#+60;");
    assert_eq!(decode_entities("&#-60;"), "&#-60;");
    assert_eq!(decode_entities("&#;"), "&#;");
    assert_eq!(decode_entities("&#0;"), "\u{fffd}");
    assert_eq!(decode_entities("&#xD800;"), "\u{fffd}");
    assert_eq!(decode_entities("&#x110000;"), "\u{fffd}");
    assert_eq!(decode_entities("&#99999999999;"), "\u{fffd}");
}

#[cfg(test)]
#[test]
fn test_decode_many_bare_ampersands() {
    let text = "R&D ".repeat(20_000) + ";";
    assert_eq!(decode_entities(&text), text);
    // A terminator past the length limit does not make a reference
    let long = format!("&{};", "a".repeat(MAX_REFERENCE_LEN));
    assert_eq!(decode_entities(&long), long);
}
