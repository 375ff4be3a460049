//! Writing styles accepted by the text-generation endpoints.
//!
//! Both style sets are closed. Anything unrecognized, including a missing
//! style, falls back to `Romantic`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterStyle {
    #[default]
    Romantic,
    Funny,
    Comforting,
    Passionate,
    Sweet,
}

impl LetterStyle {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("funny") => Self::Funny,
            Some("comforting") => Self::Comforting,
            Some("passionate") => Self::Passionate,
            Some("sweet") => Self::Sweet,
            _ => Self::Romantic,
        }
    }

    pub fn tone(&self) -> &'static str {
        match self {
            Self::Romantic => "deeply romantic and heartfelt",
            Self::Funny => "playful and funny, with light teasing",
            Self::Comforting => "warm, gentle and reassuring",
            Self::Passionate => "intense and passionate",
            Self::Sweet => "sweet, tender and a little shy",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoemStyle {
    #[default]
    Romantic,
    Funny,
    Poetic,
    Passionate,
    Sweet,
}

impl PoemStyle {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("funny") => Self::Funny,
            Some("poetic") => Self::Poetic,
            Some("passionate") => Self::Passionate,
            Some("sweet") => Self::Sweet,
            _ => Self::Romantic,
        }
    }

    pub fn tone(&self) -> &'static str {
        match self {
            Self::Romantic => "romantic and heartfelt",
            Self::Funny => "humorous and whimsical",
            Self::Poetic => "lyrical, rich in imagery and metaphor",
            Self::Passionate => "fiery and passionate",
            Self::Sweet => "sweet and tender",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_styles_parse_with_fallback() {
        assert_eq!(LetterStyle::parse_or_default(Some("Funny")), LetterStyle::Funny);
        assert_eq!(LetterStyle::parse_or_default(Some("comforting")), LetterStyle::Comforting);
        assert_eq!(LetterStyle::parse_or_default(Some("poetic")), LetterStyle::Romantic);
        assert_eq!(LetterStyle::parse_or_default(None), LetterStyle::Romantic);
    }

    #[test]
    fn poem_styles_swap_comforting_for_poetic() {
        assert_eq!(PoemStyle::parse_or_default(Some("poetic")), PoemStyle::Poetic);
        assert_eq!(PoemStyle::parse_or_default(Some("comforting")), PoemStyle::Romantic);
        assert_eq!(PoemStyle::parse_or_default(Some(" sweet ")), PoemStyle::Sweet);
    }
}
