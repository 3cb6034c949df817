//! UTF-16 offset arithmetic over Rust strings.
//!
//! Match group offsets arrive in UTF-16 code units. Slicing a `&str` needs
//! byte offsets on `char` boundaries, so every conversion here clamps to the
//! text and floors to the start of the containing `char`.

/// Length of `s` in UTF-16 code units.
pub fn len(s: &str) -> usize {
    if s.is_ascii() {
        s.len()
    } else {
        s.encode_utf16().count()
    }
}

/// Byte offset of the `char` containing UTF-16 position `units`.
pub fn byte_offset(text: &str, units: usize) -> usize {
    if text.is_ascii() {
        return units.min(text.len());
    }
    let mut seen = 0;
    for (byte, ch) in text.char_indices() {
        let next = seen + ch.len_utf16();
        if next > units {
            return byte;
        }
        seen = next;
    }
    text.len()
}

/// Slice by UTF-16 positions. `from >= to` gives an empty slice.
pub fn slice(text: &str, from: usize, to: usize) -> &str {
    if from >= to {
        return "";
    }
    let start = byte_offset(text, from);
    let end = byte_offset(text, to);
    &text[start..end.max(start)]
}

/// Everything from UTF-16 position `from` to the end.
pub fn slice_from(text: &str, from: usize) -> &str {
    &text[byte_offset(text, from)..]
}
