use std::borrow::Cow;

use encoding_rs::{UTF_8, WINDOWS_1252};

/// Characters that show up when UTF-8 lead bytes are read one byte at a time
/// (`Â®`, `â€™`, `â\u{80}\u{99}`, ...).
const MARKERS: [char; 2] = ['Â', 'â'];

fn marker_count(text: &str) -> usize {
    text.chars().filter(|c| MARKERS.contains(c)).count()
}

/// Best-effort repair of UTF-8 text that was decoded one byte at a time as
/// ISO-8859-1 or windows-1252.
///
/// Text without marker characters is returned as is. Otherwise each character
/// is mapped back to its single byte and the bytes are decoded as strict UTF-8;
/// the result is kept only if it has strictly fewer markers. Steps repeat until
/// nothing improves, so `repair(repair(x)) == repair(x)`.
pub fn repair(text: &str) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(text);
    while let Some(better) = repair_once(&current) {
        current = Cow::Owned(better);
    }
    current
}

fn repair_once(text: &str) -> Option<String> {
    let before = marker_count(text);
    if before == 0 {
        return None;
    }

    let bytes = single_byte(text)?;
    let repaired = UTF_8.decode_without_bom_handling_and_without_replacement(&bytes)?;
    (marker_count(&repaired) < before).then(|| repaired.into_owned())
}

/// ISO-8859-1 bytes of `text`, with the windows-1252 table covering the
/// characters it places at 0x80-0x9F. `None` if any character has no byte.
fn single_byte(text: &str) -> Option<Vec<u8>> {
    let mut buf = [0u8; 4];
    text.chars()
        .map(|ch| match u8::try_from(u32::from(ch)) {
            Ok(byte) => Some(byte),
            Err(_) => {
                let (bytes, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
                match (&*bytes, unmappable) {
                    ([byte], false) => Some(*byte),
                    _ => None,
                }
            }
        })
        .collect()
}
