//! Canonical form for transcribed speech
//!
//! Speech recognizers are inconsistent about harakat, hamza placement and
//! letter case, so every utterance is folded before matching.

use std::fmt;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Transcribed text after normalization
///
/// Lower-cased, compatibility-decomposed, stripped of combining marks and
/// trimmed. Only constructible through [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedUtterance(String);

impl NormalizedUtterance {
    /// Borrow the normalized text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when nothing was heard
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `pattern` occurs anywhere in this utterance
    #[must_use]
    pub fn contains(&self, pattern: &Self) -> bool {
        self.0.contains(pattern.as_str())
    }
}

impl fmt::Display for NormalizedUtterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUtterance {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize raw recognizer output
///
/// Total and idempotent. Decomposition runs again after lower-casing because
/// case mapping can itself emit combining marks (`İ` lowers to `i` + U+0307).
#[must_use]
pub fn normalize(raw: &str) -> NormalizedUtterance {
    let folded = strip_marks(raw).to_lowercase();
    NormalizedUtterance(strip_marks(&folded).trim().to_string())
}

fn strip_marks(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}
