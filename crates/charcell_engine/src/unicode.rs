use unicode_width::UnicodeWidthChar;

/// Display width of a code point in cells: 0 for combining marks and other
/// zero-width characters, 2 for East-Asian-wide and fullwidth forms, 1 for
/// everything else.
pub fn char_width(ch: char) -> i8 {
    if is_zero_width(ch) {
        return 0;
    }
    match UnicodeWidthChar::width(ch) {
        Some(w) if w >= 2 => 2,
        Some(0) => 0,
        _ => 1,
    }
}

/// Zero-width code points that combine into the preceding cell. The
/// standard width tables already cover most combining marks; the ranges
/// here are pinned explicitly because placement depends on them.
pub fn is_zero_width(ch: char) -> bool {
    matches!(ch,
        '\u{0300}'..='\u{036F}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}'
        // Variation selectors.
        | '\u{180B}'..='\u{180D}'
        | '\u{FE00}'..='\u{FE0F}'
        // Joiners.
        | '\u{200C}'
        | '\u{200D}'
    )
}
