use unicode_normalization::UnicodeNormalization;

/// Unicode NFC normalization + BOM strip + CRLF -> LF + trim
pub fn clean_text(s: &str) -> String {
    let mut t = s.nfc().collect::<String>();
    if t.starts_with('\u{FEFF}') {
        t.remove(0);
    }
    if t.contains("\r\n") {
        t = t.replace("\r\n", "\n");
    }
    t.trim().to_string()
}

/// Ingredient text goes into the prompt as typed, only cleaned.
pub fn normalize_ingredients(raw: &str) -> String {
    clean_text(raw)
}

/// Clean utensil names. Names that clean to nothing are dropped.
pub fn normalize_utensils<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names
        .iter()
        .map(|s| clean_text(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}
