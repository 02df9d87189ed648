//! Text normalization applied to every accepted extraction attempt.
//!
//! Two independent repairs (encoding, markup) plus whitespace collapsing.
//! All functions are pure; `clean` composes them and is a fixed point:
//! `clean(clean(s)) == clean(s)` for any input.

/// Upper bound on normalization passes. Real inputs stabilize in 2-3 passes;
/// the bound only guards against pathological nested entity encodings.
const MAX_CLEAN_PASSES: usize = 16;

/// Full normalization: encoding repair, markup strip + entity decode,
/// whitespace collapse, iterated until the text stops changing.
pub fn clean(text: &str) -> String {
    let mut cur = text.to_string();
    for _ in 0..MAX_CLEAN_PASSES {
        let next = collapse_whitespace(&strip_markup(&repair_encoding(&cur)));
        if next == cur {
            break;
        }
        cur = next;
    }
    cur
}

/// Repair text that was produced by decoding UTF-8 bytes with a
/// Windows-1252/Latin-1 assumption ("mojibake"), and drop U+FFFD
/// replacement characters left behind by lossy decoding.
///
/// The remap is all-or-nothing: every char must map back to a single
/// cp1252 byte and the byte string must be valid UTF-8 that differs from
/// the input. Correctly-decoded text therefore round-trips unchanged,
/// which makes the repair idempotent.
pub fn repair_encoding(text: &str) -> String {
    let text: std::borrow::Cow<'_, str> = if text.contains('\u{FFFD}') {
        text.chars().filter(|&c| c != '\u{FFFD}').collect::<String>().into()
    } else {
        text.into()
    };
    if text.is_ascii() {
        return text.into_owned();
    }

    let mut bytes = Vec::with_capacity(text.len());
    let mut remappable = true;
    for ch in text.chars() {
        match cp1252_byte(ch) {
            Some(b) => bytes.push(b),
            // Any char outside cp1252 (CJK, Greek, emoji, ...) means the text
            // was not mis-decoded this way; leave it alone.
            None => {
                remappable = false;
                break;
            }
        }
    }
    if !remappable {
        return text.into_owned();
    }
    match String::from_utf8(bytes) {
        Ok(redecoded) if redecoded != *text => redecoded,
        _ => text.into_owned(),
    }
}

/// Inverse of the cp1252 decode table: the byte that would have produced
/// `ch` when read as Windows-1252.
fn cp1252_byte(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if cp < 0x80 {
        return Some(cp as u8);
    }
    // Bytes 0x80-0x9F decode to these specials under cp1252.
    let special = match ch {
        '\u{20AC}' => 0x80, // €
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => 0,
    };
    if special != 0 {
        return Some(special);
    }
    // C1 controls pass through some decoders untouched; treat them as their
    // own byte so a remap is still possible.
    if (0x80..=0x9F).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    None
}

/// Remove complete tag-like `<...>` spans and decode HTML entities.
///
/// Only spans whose `<` is followed by an ASCII letter, `/` or `!` are
/// treated as tags; a bare `<` (as in "a < b") is kept. Content between
/// tags is never deleted.
pub fn strip_markup(text: &str) -> String {
    let stripped = strip_tag_spans(text);
    html_escape::decode_html_entities(&stripped).to_string()
}

fn strip_tag_spans(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let tag_like = matches!(
            tail[1..].chars().next(),
            Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!'
        );
        if tag_like {
            if let Some(end) = tail.find('>') {
                rest = &tail[end + 1..];
                continue;
            }
        }
        // Not a tag (or unterminated): keep the literal '<' and move on.
        out.push('<');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// Paragraph-preserving whitespace collapse: blank-line runs become exactly
/// one "\n\n" break, every other whitespace run a single space, and leading/
/// trailing whitespace is trimmed.
pub fn collapse_whitespace(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    for line in normalized.split('\n') {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn repairs_utf8_read_as_cp1252() {
        assert_eq!(repair_encoding("cafÃ©"), "café");
        assert_eq!(repair_encoding("donâ€™t"), "don’t");
        // "à" mis-decodes as "Ã" + U+00A0, so the marker is not plain ASCII.
        assert_eq!(repair_encoding("naÃ¯ve â€” dÃ©jÃ\u{A0} vu"), "naïve — déjà vu");
    }

    #[test]
    fn correct_text_is_a_fixed_point_of_encoding_repair() {
        for s in ["plain ascii", "café — déjà vu", "señor año", "Tōkyō 東京"] {
            assert_eq!(repair_encoding(s), s);
            assert_eq!(repair_encoding(&repair_encoding(s)), repair_encoding(s));
        }
    }

    #[test]
    fn drops_replacement_characters() {
        assert_eq!(repair_encoding("bro\u{FFFD}ken te\u{FFFD}xt"), "broken text");
    }

    #[test]
    fn mixed_script_text_is_left_alone() {
        // A CJK char makes a cp1252 remap impossible; nothing should change.
        let s = "Ã© 東京";
        assert_eq!(repair_encoding(s), s);
    }

    #[test]
    fn strips_complete_tag_spans_only() {
        assert_eq!(strip_markup("<b>bold</b> move"), "bold move");
        assert_eq!(strip_markup("<div class=\"x\">inner</div>"), "inner");
        assert_eq!(strip_markup("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
        // Unterminated tag fragment: keep the literal text for the gate to judge.
        assert_eq!(strip_markup("trailing <div junk"), "trailing <div junk");
    }

    #[test]
    fn decodes_html_entities() {
        assert_eq!(strip_markup("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(strip_markup("&ldquo;quote&rdquo;"), "\u{201C}quote\u{201D}");
    }

    #[test]
    fn collapse_keeps_paragraph_breaks() {
        let s = "first  line\nstill first\n\n\n  second   para\t here \n";
        assert_eq!(
            collapse_whitespace(s),
            "first line still first\n\nsecond para here"
        );
    }

    #[test]
    fn clean_handles_entity_encoded_markup_leak() {
        // A leaked, entity-encoded tag decodes to a real tag on the first
        // pass; the fixed-point loop strips it on the next.
        assert_eq!(clean("before &lt;br&gt; after"), "before after");
    }

    #[test]
    fn clean_is_idempotent_on_article_text() {
        let cleaned = clean("  CafÃ© society &amp; friends.\n\n<p>Second paragraph.</p> ");
        assert_eq!(cleaned, "Café society & friends.\n\nSecond paragraph.");
        assert_eq!(clean(&cleaned), cleaned);
    }

    proptest! {
        #[test]
        fn clean_reaches_a_fixed_point(s in ".{0,400}") {
            let once = clean(&s);
            let twice = clean(&once);
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn clean_output_has_no_replacement_chars(s in ".{0,400}") {
            let replacement_char = '\u{FFFD}';
            prop_assert!(!clean(&s).contains(replacement_char));
        }

        #[test]
        fn collapse_whitespace_is_idempotent(s in ".{0,400}") {
            let once = collapse_whitespace(&s);
            prop_assert_eq!(collapse_whitespace(&once), once);
        }
    }
}
