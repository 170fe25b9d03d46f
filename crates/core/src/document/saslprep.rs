//! RFC 4013 SASLprep for AES-256 (R6) passwords.
//!
//! Mapping, NFKC normalization, prohibited output and the bidirectional
//! rule. Unassigned code point checks are not applied (stored strings
//! profile is not needed for passwords).

use unicode_normalization::UnicodeNormalization;

use crate::{PdfError, Result};

/// RFC 3454 Table B.1: characters commonly mapped to nothing.
fn maps_to_nothing(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{034F}'
            | '\u{1806}'
            | '\u{180B}'..='\u{180D}'
            | '\u{200B}'..='\u{200D}'
            | '\u{2060}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{FEFF}'
    )
}

/// RFC 3454 Table C.1.2: non-ASCII space characters.
fn is_non_ascii_space(c: char) -> bool {
    matches!(
        c,
        '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// RFC 3454 Tables C.2 through C.9.
fn is_prohibited(c: char) -> bool {
    let cp = c as u32;
    c.is_control()
        || is_non_ascii_space(c)
        || matches!(
            cp,
            0x06DD
                | 0x070F
                | 0x180E
                | 0x200C..=0x200F
                | 0x2028..=0x202E
                | 0x2060..=0x2063
                | 0x206A..=0x206F
                | 0xFEFF
                | 0xFFF9..=0xFFFD
                | 0x1D173..=0x1D17A
                | 0xE000..=0xF8FF
                | 0xF0000..=0xFFFFD
                | 0x100000..=0x10FFFD
                | 0xFDD0..=0xFDEF
                | 0x0340
                | 0x0341
                | 0x2FF0..=0x2FFB
                | 0xE0001
                | 0xE0020..=0xE007F
        )
        || (cp & 0xFFFE) == 0xFFFE
}

/// Right-to-left characters (Hebrew, Arabic and related blocks).
fn is_rand_al_cat(c: char) -> bool {
    matches!(
        c as u32,
        0x05BE
            | 0x05C0
            | 0x05C3
            | 0x05D0..=0x05F4
            | 0x0608
            | 0x060B
            | 0x060D
            | 0x061B..=0x064A
            | 0x066D..=0x06D5
            | 0x06E5..=0x06E6
            | 0x06EE..=0x06FF
            | 0x0700..=0x074F
            | 0x0780..=0x07B1
            | 0xFB1D..=0xFDFF
            | 0xFE70..=0xFEFC
    )
}

/// Prepare `data` per SASLprep.
pub fn saslprep(data: &str) -> Result<String> {
    let mapped: String = data
        .chars()
        .filter(|&c| !maps_to_nothing(c))
        .map(|c| if is_non_ascii_space(c) { ' ' } else { c })
        .collect();
    let normalized: String = mapped.nfkc().collect();

    if let Some(bad) = normalized.chars().find(|&c| is_prohibited(c)) {
        return Err(PdfError::SaslPrepError(format!(
            "prohibited character U+{:04X}",
            bad as u32
        )));
    }

    let has_rtl = normalized.chars().any(is_rand_al_cat);
    if has_rtl {
        let first = normalized.chars().next().is_some_and(is_rand_al_cat);
        let last = normalized.chars().last().is_some_and(is_rand_al_cat);
        let has_ltr = normalized
            .chars()
            .any(|c| c.is_alphabetic() && !is_rand_al_cat(c));
        if !first || !last || has_ltr {
            return Err(PdfError::SaslPrepError(
                "failed bidirectional check".into(),
            ));
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_spaces_and_soft_hyphen() {
        assert_eq!(saslprep("I\u{00AD}X").unwrap(), "IX");
        assert_eq!(saslprep("a\u{00A0}b").unwrap(), "a b");
        assert_eq!(saslprep("user").unwrap(), "user");
    }

    #[test]
    fn nfkc_normalizes_compatibility_forms() {
        assert_eq!(saslprep("\u{00AA}").unwrap(), "a");
        assert_eq!(saslprep("\u{2168}").unwrap(), "IX");
    }

    #[test]
    fn rejects_control_characters() {
        assert!(saslprep("\u{0007}").is_err());
    }

    #[test]
    fn rejects_mixed_direction() {
        assert!(saslprep("\u{0627}1").is_err());
        assert!(saslprep("\u{0627}\u{0628}").is_ok());
    }
}
