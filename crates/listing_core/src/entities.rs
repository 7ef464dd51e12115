//! Character reference resolution for text runs and attribute values.

use html_escape::decode_html_entities;

/// Names HTML allows without the trailing `;`. Their expansions come from the
/// full entity table like every other name.
const LEGACY_NAMES: &[&str] = &[
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig", "agrave",
    "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy", "curren", "deg",
    "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14", "frac34", "gt",
    "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt", "macr", "micro",
    "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf", "ordm", "oslash",
    "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg", "sect", "shy", "sup1",
    "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc", "ugrave", "uml", "uuml",
    "yacute", "yen", "yuml",
];

/// Browsers map numeric references in the C1 range through windows-1252.
const C1_REMAP: [char; 32] = [
    '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8D}', 'Ž', '\u{8F}',
    '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9D}', 'ž', 'Ÿ',
];

// Longest name in the HTML entity table, bounds the scan for a terminating ';'.
const MAX_NAME_LEN: usize = 32;

/// Replace every recognised character reference in `input` with its literal text.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match decode_reference(after) {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the reference following a `&`. Returns the replacement text and the
/// number of bytes consumed after the ampersand.
fn decode_reference(after: &str) -> Option<(String, usize)> {
    if let Some(numeric) = after.strip_prefix('#') {
        let (ch, used) = decode_numeric(numeric)?;
        return Some((ch.to_string(), used + 1));
    }

    let name_len = after
        .bytes()
        .take(MAX_NAME_LEN + 1)
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    if name_len == 0 {
        return None;
    }
    let name = &after[..name_len];
    if after.as_bytes().get(name_len) == Some(&b';') {
        if let Some(text) = lookup_named(name) {
            return Some((text, name_len + 1));
        }
    }

    // Longest legacy name at the start of the run, e.g. `&copy2026` or `&notin`.
    (2..=name_len)
        .rev()
        .map(|len| &name[..len])
        .find(|prefix| LEGACY_NAMES.contains(prefix))
        .and_then(|prefix| lookup_named(prefix).map(|text| (text, prefix.len())))
}

fn lookup_named(name: &str) -> Option<String> {
    let reference = format!("&{name};");
    let decoded = decode_html_entities(&reference);
    (decoded != reference.as_str()).then(|| decoded.into_owned())
}

fn decode_numeric(numeric: &str) -> Option<(char, usize)> {
    let (digits, radix, prefix) = match numeric.as_bytes().first() {
        Some(b'x') | Some(b'X') => (&numeric[1..], 16, 1),
        _ => (numeric, 10, 0),
    };
    let len = digits
        .bytes()
        .take_while(|b| (*b as char).is_digit(radix))
        .count();
    if len == 0 {
        return None;
    }

    // Overlong digit runs saturate to an invalid code point.
    let value = u32::from_str_radix(&digits[..len], radix).unwrap_or(u32::MAX);
    let ch = match value {
        0x80..=0x9F => C1_REMAP[(value - 0x80) as usize],
        0 => char::REPLACEMENT_CHARACTER,
        _ => char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER),
    };

    let mut consumed = prefix + len;
    if digits.as_bytes().get(len) == Some(&b';') {
        consumed += 1;
    }
    Some((ch, consumed))
}
