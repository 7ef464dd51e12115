use listing_engine::decode_markup;
use pretty_assertions::assert_eq;

#[test]
fn decode_respects_charset_header() {
    let bytes = b"caf\xe9"; // iso-8859-1
    let decoded = decode_markup(bytes, Some("text/html; charset=ISO-8859-1")).unwrap();
    assert_eq!(decoded.text, "café");
    assert!(decoded.encoding_label.eq_ignore_ascii_case("windows-1252"));
}

#[test]
fn decode_handles_utf8_bom() {
    let bytes = b"\xEF\xBB\xBFhello";
    let decoded = decode_markup(bytes, Some("text/html")).unwrap();
    assert_eq!(decoded.text, "hello");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn decode_uses_meta_charset_without_header() {
    let bytes = b"<html><head><meta charset=\"windows-1252\"></head><body>Fidelity\xae</body></html>";
    let decoded = decode_markup(bytes, None).unwrap();
    assert!(decoded.text.contains("Fidelity®"));
    assert_eq!(decoded.encoding_label, "windows-1252");
}

#[test]
fn header_charset_wins_over_meta() {
    let bytes = "<meta charset=\"windows-1252\"><p>Fidelity®</p>".as_bytes();
    let decoded = decode_markup(bytes, Some("text/html; charset=utf-8")).unwrap();
    assert!(decoded.text.contains("Fidelity®"));
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn invalid_utf8_with_declared_charset_fails() {
    let err = decode_markup(b"bad \xff\xfe bytes", Some("text/html; charset=utf-8")).unwrap_err();
    assert!(err.to_string().contains("UTF-8"));
}
