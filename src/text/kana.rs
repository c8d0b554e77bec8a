//! Kana classification, script conversion and comparison normalization.

/// Strip formatting noise from a kana reading so two readings can be
/// compared for semantic equality.
///
/// Removes apostrophes (VOICEVOX accent marks), slashes (phrase
/// separators), Japanese commas and all whitespace. Applied only at
/// comparison time; raw readings are stored unmodified.
pub fn normalize_kana(reading: &str) -> String {
    reading
        .chars()
        .filter(|c| !matches!(c, '\'' | '/' | '、' | '，') && !c.is_whitespace())
        .collect()
}

/// Convert katakana characters to hiragana, leaving everything else
/// (including the long-vowel mark) unchanged.
pub fn katakana_to_hiragana(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'ァ'..='ヶ' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Convert hiragana characters to katakana, leaving everything else
/// unchanged.
pub fn hiragana_to_katakana(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'ぁ'..='ゖ' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Whether a character is hiragana, katakana or the long-vowel mark.
pub fn is_kana(c: char) -> bool {
    matches!(c, 'ぁ'..='ゖ' | 'ァ'..='ヶ' | 'ー')
}

/// Whether a string contains at least one kanji character.
///
/// Covers the unified ideograph block, extension A and the iteration
/// mark (々).
pub fn contains_kanji(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '々')
    })
}
