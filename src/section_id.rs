use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectionIdError {
    #[error("section id is empty")]
    Empty,
    #[error("invalid section id component '{0}'")]
    InvalidComponent(String),
    #[error("section id '{0}' has more than two components")]
    TooManyComponents(String),
}

/// A `<chapter>` or `<chapter>.<subsection>` token.
///
/// Ordering compares the numeric pair, so `2.9 < 2.10`, and a bare chapter id
/// sorts before every section of that chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionId {
    chapter: u32,
    subsection: Option<u32>,
}

impl SectionId {
    pub fn chapter(chapter: u32) -> Self {
        Self {
            chapter,
            subsection: None,
        }
    }

    pub fn section(chapter: u32, subsection: u32) -> Self {
        Self {
            chapter,
            subsection: Some(subsection),
        }
    }

    pub fn chapter_number(&self) -> u32 {
        self.chapter
    }

    /// True when the id names a chapter's table of contents rather than a leaf section.
    pub fn is_chapter_overview(&self) -> bool {
        self.subsection.is_none()
    }
}

/// The chapter key of a raw id: everything before the first `.`.
pub fn chapter_key(raw: &str) -> &str {
    raw.split_once('.').map_or(raw, |(key, _)| key)
}

pub fn is_chapter_overview_id(raw: &str) -> bool {
    !raw.contains('.')
}

fn parse_component(part: &str) -> Result<u32, SectionIdError> {
    let valid = !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && !part.starts_with('0');
    if !valid {
        return Err(SectionIdError::InvalidComponent(part.to_string()));
    }
    part.parse::<u32>()
        .map_err(|_| SectionIdError::InvalidComponent(part.to_string()))
}

impl FromStr for SectionId {
    type Err = SectionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SectionIdError::Empty);
        }

        let mut parts = s.split('.');
        let chapter = parse_component(parts.next().unwrap_or_default())?;
        let subsection = parts.next().map(parse_component).transpose()?;
        if parts.next().is_some() {
            return Err(SectionIdError::TooManyComponents(s.to_string()));
        }

        Ok(Self {
            chapter,
            subsection,
        })
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subsection {
            Some(sub) => write!(f, "{}.{}", self.chapter, sub),
            None => write!(f, "{}", self.chapter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chapter_and_section_ids() {
        assert_eq!("3".parse::<SectionId>(), Ok(SectionId::chapter(3)));
        assert_eq!("3.7".parse::<SectionId>(), Ok(SectionId::section(3, 7)));
        assert_eq!("12.10".parse::<SectionId>().unwrap().to_string(), "12.10");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!("".parse::<SectionId>(), Err(SectionIdError::Empty));
        assert!(matches!(
            "abc".parse::<SectionId>(),
            Err(SectionIdError::InvalidComponent(_))
        ));
        assert!(matches!(
            "1..2".parse::<SectionId>(),
            Err(SectionIdError::InvalidComponent(_))
        ));
        assert!(matches!(
            "01.2".parse::<SectionId>(),
            Err(SectionIdError::InvalidComponent(_))
        ));
        assert!(matches!(
            "0.1".parse::<SectionId>(),
            Err(SectionIdError::InvalidComponent(_))
        ));
        assert!(matches!(
            "1.2.3".parse::<SectionId>(),
            Err(SectionIdError::TooManyComponents(_))
        ));
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let nine: SectionId = "2.9".parse().unwrap();
        let ten: SectionId = "2.10".parse().unwrap();
        assert!(nine < ten);
        assert!("2.10" < "2.9");
        assert!(SectionId::chapter(2) < nine);
        assert!(ten < SectionId::section(3, 1));
    }

    #[test]
    fn overview_ids_have_no_dot() {
        assert!(is_chapter_overview_id("3"));
        assert!(!is_chapter_overview_id("3.1"));
        assert!(SectionId::chapter(3).is_chapter_overview());
        assert!(!SectionId::section(3, 1).is_chapter_overview());
    }

    #[test]
    fn chapter_key_is_prefix_before_first_dot() {
        assert_eq!(chapter_key("9.1"), "9");
        assert_eq!(chapter_key("4"), "4");
        assert_eq!(chapter_key(""), "");
        assert_eq!(chapter_key(".5"), "");
    }
}
