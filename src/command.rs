//! Command classification
//!
//! Maps a [`NormalizedUtterance`] to a [`CommandKind`] by substring
//! containment against the configured vocabularies.

use std::fmt;

use crate::normalize::{NormalizedUtterance, normalize};

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Wake phrase, e.g. "أهلا مبصر"
    Wake,
    /// Describe the surroundings
    Explore,
    /// Take a family photo and name who is in it
    Photo,
    /// End the session
    Exit,
    /// Speech was heard but matched nothing
    Unrecognized,
    /// Nothing was heard
    Empty,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wake => "wake",
            Self::Explore => "explore",
            Self::Photo => "photo",
            Self::Exit => "exit",
            Self::Unrecognized => "unrecognized",
            Self::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Ordered patterns for one command kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandVocabulary {
    patterns: Vec<NormalizedUtterance>,
}

impl CommandVocabulary {
    /// Build a vocabulary from raw phrases
    ///
    /// Phrases are normalized; empty and duplicate patterns are dropped so a
    /// blank config entry cannot match every utterance.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<NormalizedUtterance> = Vec::new();
        for phrase in phrases {
            let pattern = normalize(phrase.as_ref());
            if !pattern.is_empty() && !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
        Self { patterns }
    }

    /// True if any pattern is a substring of `utterance`
    #[must_use]
    pub fn matches(&self, utterance: &NormalizedUtterance) -> bool {
        self.patterns.iter().any(|p| utterance.contains(p))
    }

    /// Normalized patterns in configuration order
    #[must_use]
    pub fn patterns(&self) -> &[NormalizedUtterance] {
        &self.patterns
    }

    /// True if the vocabulary has no usable pattern
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// All command vocabularies, built once at start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabularies {
    pub wake: CommandVocabulary,
    pub explore: CommandVocabulary,
    pub photo: CommandVocabulary,
    pub exit: CommandVocabulary,
}

impl Default for Vocabularies {
    fn default() -> Self {
        Self {
            wake: CommandVocabulary::new(DEFAULT_WAKE),
            explore: CommandVocabulary::new(DEFAULT_EXPLORE),
            photo: CommandVocabulary::new(DEFAULT_PHOTO),
            exit: CommandVocabulary::new(DEFAULT_EXIT),
        }
    }
}

/// Default wake phrases
pub const DEFAULT_WAKE: &[&str] = &["أَهْلًا مُبْصِر", "مَرْحَبًا مُبْصِر", "السَّلَامُ عَلَيْك"];

/// Default explore phrases
pub const DEFAULT_EXPLORE: &[&str] = &["اِسْتَكْشِفْ المَكَان", "اِسْتَكْشَاف المَكَان", "اِسْتِكْشَاف"];

/// Default photo phrases
pub const DEFAULT_PHOTO: &[&str] = &["اِلْتَقِطْ صُورَة", "صَوِّرْ", "أَخَذْ صُورَة"];

/// Default exit phrases
pub const DEFAULT_EXIT: &[&str] = &["شُكْرًا مُبْصِر", "إِنْهَاء", "خُرُوج"];

impl Vocabularies {
    /// Classify an utterance
    ///
    /// Priority is Wake, Photo, Explore, Exit: an utterance matching several
    /// vocabularies resolves to the first of these.
    #[must_use]
    pub fn classify(&self, utterance: &NormalizedUtterance) -> CommandKind {
        if utterance.is_empty() {
            return CommandKind::Empty;
        }

        let ordered = [
            (CommandKind::Wake, &self.wake),
            (CommandKind::Photo, &self.photo),
            (CommandKind::Explore, &self.explore),
            (CommandKind::Exit, &self.exit),
        ];

        ordered
            .into_iter()
            .find(|(_, vocabulary)| vocabulary.matches(utterance))
            .map_or(CommandKind::Unrecognized, |(kind, _)| kind)
    }

    /// Classify an utterance heard after waking
    ///
    /// Users often address the assistant by name before a command, so a wake
    /// phrase only counts on its own; photo, explore and exit take over when
    /// they also match.
    #[must_use]
    pub fn classify_awake(&self, utterance: &NormalizedUtterance) -> CommandKind {
        let kind = self.classify(utterance);
        if kind != CommandKind::Wake {
            return kind;
        }

        [
            (CommandKind::Photo, &self.photo),
            (CommandKind::Explore, &self.explore),
            (CommandKind::Exit, &self.exit),
        ]
        .into_iter()
        .find(|(_, vocabulary)| vocabulary.matches(utterance))
        .map_or(CommandKind::Wake, |(kind, _)| kind)
    }
}

/// Classify `utterance` against `vocabularies`
#[must_use]
pub fn classify(utterance: &NormalizedUtterance, vocabularies: &Vocabularies) -> CommandKind {
    vocabularies.classify(utterance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(raw: &str) -> CommandKind {
        classify(&normalize(raw), &Vocabularies::default())
    }

    #[test]
    fn test_default_phrases() {
        assert_eq!(kind_of("مرحبا مبصر"), CommandKind::Wake);
        assert_eq!(kind_of("أهلا مبصر"), CommandKind::Wake);
        assert_eq!(kind_of("التقط صورة"), CommandKind::Photo);
        assert_eq!(kind_of("استكشف المكان"), CommandKind::Explore);
        assert_eq!(kind_of("شكرا مبصر"), CommandKind::Exit);
        assert_eq!(kind_of("خروج"), CommandKind::Exit);
    }

    #[test]
    fn test_empty_is_not_unrecognized() {
        assert_eq!(kind_of(""), CommandKind::Empty);
        assert_eq!(kind_of("  \t"), CommandKind::Empty);
        assert_eq!(kind_of("ما هو الطقس"), CommandKind::Unrecognized);
    }

    #[test]
    fn test_photo_beats_explore() {
        // "صور" is a photo pattern, "استكشاف" an explore pattern
        let utterance = normalize("صور استكشاف");
        let vocabularies = Vocabularies::default();
        assert!(vocabularies.photo.matches(&utterance));
        assert!(vocabularies.explore.matches(&utterance));
        assert_eq!(classify(&utterance, &vocabularies), CommandKind::Photo);
    }

    #[test]
    fn test_wake_beats_everything() {
        assert_eq!(kind_of("اهلا مبصر التقط صورة"), CommandKind::Wake);
        assert_eq!(kind_of("مرحبا مبصر خروج"), CommandKind::Wake);
    }

    #[test]
    fn test_awake_prefers_command_after_name() {
        let vocabularies = Vocabularies::default();
        let awake = |raw: &str| vocabularies.classify_awake(&normalize(raw));

        assert_eq!(awake("مرحبا مبصر التقط صورة"), CommandKind::Photo);
        assert_eq!(awake("أهلا مبصر استكشف المكان"), CommandKind::Explore);
        assert_eq!(awake("مرحبا مبصر خروج"), CommandKind::Exit);
        assert_eq!(awake("مرحبا مبصر"), CommandKind::Wake);
        assert_eq!(awake("ما هو الطقس"), CommandKind::Unrecognized);
        assert_eq!(awake(""), CommandKind::Empty);
    }

    #[test]
    fn test_explore_beats_exit() {
        let vocabularies = Vocabularies {
            wake: CommandVocabulary::new(["wake up"]),
            explore: CommandVocabulary::new(["look"]),
            photo: CommandVocabulary::new(["snap"]),
            exit: CommandVocabulary::new(["bye"]),
        };
        assert_eq!(
            classify(&normalize("look then bye"), &vocabularies),
            CommandKind::Explore
        );
    }

    #[test]
    fn test_blank_patterns_are_dropped() {
        let vocabulary = CommandVocabulary::new(["", "   ", "خروج", "خُرُوج"]);
        assert_eq!(vocabulary.patterns().len(), 1);
        assert!(!vocabulary.matches(&normalize("مرحبا")));
    }
}
