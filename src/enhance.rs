//! Caption enhancement with recognized family members
//!
//! Face recognition is expensive, so it only runs when the caption already
//! says a person is in the picture.

use regex::{Regex, RegexBuilder};

use crate::perception::{CapturedImage, PerceptionGateway, distinct_names};
use crate::prompts::Prompts;
use crate::{Error, Result};

/// English words that indicate a person in a caption
pub const ENGLISH_PERSON_KEYWORDS: &[&str] = &[
    "person",
    "people",
    "man",
    "woman",
    "men",
    "women",
    "boy",
    "girl",
    "child",
    "children",
    "baby",
    "adult",
    "guy",
    "lady",
    "gentleman",
    "individual",
    "human",
    "someone",
    "somebody",
    "figure",
    "character",
];

/// Arabic words that indicate a person in a caption
pub const ARABIC_PERSON_KEYWORDS: &[&str] = &[
    "شخص", "أشخاص", "رجل", "امرأة", "رجال", "نساء", "ولد", "بنت", "طفل", "أطفال", "طفلة", "بالغ",
    "شاب", "فتاة", "سيدة", "أحد", "شخصية", "فرد",
];

/// A caption with the family members merged into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancedCaption {
    /// Caption text, with the names appended when any were recognized
    pub text: String,
    /// Recognized names, ordered and distinct
    pub names: Vec<String>,
}

impl EnhancedCaption {
    /// Caption without names
    #[must_use]
    pub fn plain(caption: &str) -> Self {
        Self {
            text: caption.to_string(),
            names: Vec::new(),
        }
    }
}

/// Merges recognized names into captions that mention people
#[derive(Debug, Clone)]
pub struct CaptionEnhancer {
    keywords: Regex,
    prompts: Prompts,
}

impl CaptionEnhancer {
    /// Create an enhancer with the bilingual keyword list
    ///
    /// # Errors
    ///
    /// Returns error if the keyword pattern cannot be compiled
    pub fn new(prompts: Prompts) -> Result<Self> {
        let keywords = ENGLISH_PERSON_KEYWORDS
            .iter()
            .chain(ARABIC_PERSON_KEYWORDS);
        Self::with_keywords(keywords, prompts)
    }

    /// Create an enhancer with a custom keyword list
    ///
    /// # Errors
    ///
    /// Returns error if the list is empty or the pattern cannot be compiled
    pub fn with_keywords<I, S>(keywords: I, prompts: Prompts) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(&k))
            .collect();

        if alternatives.is_empty() {
            return Err(Error::Config("person keyword list is empty".to_string()));
        }

        let keywords = RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("invalid person keywords: {e}")))?;

        Ok(Self { keywords, prompts })
    }

    /// True if the caption names a person as a whole word
    #[must_use]
    pub fn mentions_person(&self, caption: &str) -> bool {
        self.keywords.is_match(caption)
    }

    /// Merge recognized family members into `caption`
    ///
    /// Never fails: without a person keyword, or when recognition fails or
    /// finds nobody, the caption comes back unchanged with no names.
    pub async fn enhance(
        &self,
        caption: &str,
        image: &CapturedImage,
        gateway: &PerceptionGateway,
    ) -> EnhancedCaption {
        if !self.mentions_person(caption) {
            tracing::debug!("no person in caption, skipping face recognition");
            return EnhancedCaption::plain(caption);
        }

        tracing::info!("person in caption, running face recognition");
        match gateway.recognize_faces(image).await {
            Ok(names) => {
                let names = distinct_names(names);
                if names.is_empty() {
                    return EnhancedCaption::plain(caption);
                }
                EnhancedCaption {
                    text: self.prompts.caption_with_family(caption, &names),
                    names,
                }
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "face recognition failed, keeping plain caption");
                EnhancedCaption::plain(caption)
            }
        }
    }
}
