//! Spoken phrases
//!
//! Every sentence the assistant says lives here so a deployment can re-word
//! or re-localize them from the config file. Templates use `{names}` and
//! `{caption}` placeholders.

use serde::Deserialize;

use crate::{Error, Result};

/// Phrases spoken by the session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Introduction before the first listen
    pub greeting: String,
    /// Spoken after the wake phrase
    pub menu: String,
    /// Heard something other than the wake phrase
    pub not_heard: String,
    /// Heard a command that matched nothing
    pub not_understood: String,
    /// Spoken on exit
    pub farewell: String,
    /// Camera produced no image
    pub capture_error: String,
    /// Family photo stored
    pub photo_saved: String,
    /// Names recognized in a family photo (`{names}`)
    pub family_found: String,
    /// Nobody recognized, or recognition failed
    pub no_family: String,
    /// Explore picture taken, description in progress
    pub describing: String,
    /// Captioning failed
    pub caption_error: String,
    /// Caption merged with recognized names (`{caption}`, `{names}`)
    pub caption_with_family: String,
    /// Second utterance after a description listing names (`{names}`)
    pub family_addendum: String,
    /// Separator between names in a spoken list
    pub name_separator: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            greeting: "أهلاً بك! أنا مُبصر. قل: أهلا مبصر لنبدأ.".to_string(),
            menu: "تمام! يمكنك قول استكشف المكان، التقط صورة، أو شكرًا مبصر.".to_string(),
            not_heard: "لم أسمع أهلا مبصر، حاول مرة أخرى.".to_string(),
            not_understood: "لم أفهم الطلب، أعد المحاولة.".to_string(),
            farewell: "إلى اللقاء!".to_string(),
            capture_error: "وقعت مشكلة أثناء التصوير.".to_string(),
            photo_saved: "تم التقاط الصورة وحفظها.".to_string(),
            family_found: "الأشخاص الموجودين في الصورة: {names}".to_string(),
            no_family: "لا يوجد أحد من أفراد العائلة في الصورة.".to_string(),
            describing: "تم التقاط الصورة، جاري إنشاء الوصف...".to_string(),
            caption_error: "لم أتمكن من إنشاء وصف للصورة.".to_string(),
            caption_with_family: "{caption} كما يوجد في الصورة: {names}.".to_string(),
            family_addendum: "كما يوجد من أفراد العائلة: {names}".to_string(),
            name_separator: "، ".to_string(),
        }
    }
}

impl Prompts {
    /// Join names with the locale separator
    #[must_use]
    pub fn join_names(&self, names: &[String]) -> String {
        names.join(&self.name_separator)
    }

    /// "People in the picture: …"
    #[must_use]
    pub fn family_found(&self, names: &[String]) -> String {
        self.family_found.replace("{names}", &self.join_names(names))
    }

    /// "Also in the family: …"
    #[must_use]
    pub fn family_addendum(&self, names: &[String]) -> String {
        self.family_addendum.replace("{names}", &self.join_names(names))
    }

    /// Check every template carries its placeholders exactly once
    ///
    /// # Errors
    ///
    /// Returns error naming the first template with a missing or repeated
    /// placeholder
    pub fn validate(&self) -> Result<()> {
        let templates = [
            ("family_found", &self.family_found, &["{names}"][..]),
            ("family_addendum", &self.family_addendum, &["{names}"][..]),
            (
                "caption_with_family",
                &self.caption_with_family,
                &["{caption}", "{names}"][..],
            ),
        ];

        for (name, template, placeholders) in templates {
            for placeholder in placeholders {
                let count = template.matches(*placeholder).count();
                if count != 1 {
                    return Err(Error::Config(format!(
                        "prompt {name} must contain {placeholder} exactly once, found {count}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Caption text with names appended
    #[must_use]
    pub fn caption_with_family(&self, caption: &str, names: &[String]) -> String {
        // Names first so a caption containing "{names}" is left alone
        self.caption_with_family
            .replace("{names}", &self.join_names(names))
            .replace("{caption}", caption)
    }
}
