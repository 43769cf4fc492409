use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::section_id::{SectionId, SectionIdError};

const BUNDLED_CATALOG: &str = include_str!("../content/catalog.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("chapter number must be positive")]
    ZeroChapter,
    #[error("chapter {0} is declared twice")]
    DuplicateChapter(u32),
    #[error("chapter {chapter}: invalid section id '{id}': {source}")]
    InvalidId {
        chapter: u32,
        id: String,
        source: SectionIdError,
    },
    #[error("chapter {chapter}: section '{id}' does not belong to this chapter")]
    ForeignSection { chapter: u32, id: String },
    #[error("section {0} is declared twice")]
    DuplicateSection(SectionId),
    #[error("{0} has an empty title")]
    EmptyTitle(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    chapters: Vec<ChapterRecord>,
}

#[derive(Debug, Deserialize)]
struct ChapterRecord {
    number: u32,
    title: String,
    #[serde(default)]
    intro: String,
    #[serde(default)]
    sections: Vec<SectionRecord>,
}

#[derive(Debug, Deserialize)]
struct SectionRecord {
    id: String,
    title: String,
    #[serde(default, alias = "summary")]
    body: String,
    #[serde(default, alias = "reference")]
    code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    /// Markdown explanation shown above the code sample.
    pub body: String,
    /// The code sample the reader reproduces in typing practice.
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub number: u32,
    pub title: String,
    pub intro: String,
    /// Declared order is reading order.
    pub sections: Vec<Section>,
}

impl Chapter {
    pub fn id(&self) -> SectionId {
        SectionId::chapter(self.number)
    }
}

/// Chapters keyed by number. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    chapters: BTreeMap<u32, Chapter>,
}

impl Catalog {
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUNDLED_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog = Self::from_toml_str(&source)
            .with_context(|| format!("Invalid catalog {}", path.display()))?;
        debug!(
            path = %path.display(),
            chapters = catalog.chapters.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(source)?;
        Self::from_records(file.chapters)
    }

    fn from_records(records: Vec<ChapterRecord>) -> Result<Self, CatalogError> {
        let mut chapters = BTreeMap::new();
        let mut seen = HashSet::new();

        for record in records {
            if record.number == 0 {
                return Err(CatalogError::ZeroChapter);
            }
            if record.title.trim().is_empty() {
                return Err(CatalogError::EmptyTitle(format!("chapter {}", record.number)));
            }

            let mut sections = Vec::with_capacity(record.sections.len());
            for section in record.sections {
                let id: SectionId =
                    section
                        .id
                        .parse()
                        .map_err(|source| CatalogError::InvalidId {
                            chapter: record.number,
                            id: section.id.clone(),
                            source,
                        })?;
                if id.chapter_number() != record.number || id.is_chapter_overview() {
                    return Err(CatalogError::ForeignSection {
                        chapter: record.number,
                        id: section.id,
                    });
                }
                if !seen.insert(id) {
                    return Err(CatalogError::DuplicateSection(id));
                }
                if section.title.trim().is_empty() {
                    return Err(CatalogError::EmptyTitle(format!("section {id}")));
                }
                sections.push(Section {
                    id,
                    title: section.title,
                    body: section.body,
                    reference: section.code,
                });
            }

            match chapters.entry(record.number) {
                Entry::Occupied(_) => return Err(CatalogError::DuplicateChapter(record.number)),
                Entry::Vacant(slot) => {
                    slot.insert(Chapter {
                        number: record.number,
                        title: record.title,
                        intro: record.intro,
                        sections,
                    });
                }
            }
        }

        Ok(Self { chapters })
    }

    /// Looks up a chapter by the textual key in front of the first `.` of an id.
    pub fn chapter_by_key(&self, key: &str) -> Option<&Chapter> {
        let id: SectionId = key.parse().ok()?;
        if !id.is_chapter_overview() {
            return None;
        }
        self.chapters.get(&id.chapter_number())
    }

    pub fn chapter(&self, number: u32) -> Option<&Chapter> {
        self.chapters.get(&number)
    }

    /// Chapters in ascending number order.
    pub fn chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.values()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
[[chapters]]
number = 2
title = "Types"

[[chapters.sections]]
id = "2.9"
title = "Bitwise Operators"
summary = "Bits."
code = "x & y;"

[[chapters.sections]]
id = "2.10"
title = "Assignment"
body = "Assign."
reference = "x += 3;"

[[chapters]]
number = 1
title = "Tutorial"
intro = "Start here."
"#;

    #[test]
    fn parses_records_and_aliases() {
        let catalog = Catalog::from_toml_str(SMALL).unwrap();
        let chapter = catalog.chapter_by_key("2").unwrap();
        assert_eq!(chapter.sections.len(), 2);
        assert_eq!(chapter.sections[0].body, "Bits.");
        assert_eq!(chapter.sections[0].reference, "x & y;");
        assert_eq!(chapter.sections[1].body, "Assign.");
        assert_eq!(chapter.sections[1].reference, "x += 3;");
        assert_eq!(catalog.chapter(1).unwrap().intro, "Start here.");
    }

    #[test]
    fn chapters_iterate_in_number_order() {
        let catalog = Catalog::from_toml_str(SMALL).unwrap();
        let numbers: Vec<u32> = catalog.chapters().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn chapter_by_key_rejects_malformed_keys() {
        let catalog = Catalog::from_toml_str(SMALL).unwrap();
        assert!(catalog.chapter_by_key("").is_none());
        assert!(catalog.chapter_by_key("02").is_none());
        assert!(catalog.chapter_by_key("two").is_none());
        assert!(catalog.chapter_by_key("9").is_none());
    }

    #[test]
    fn rejects_section_from_another_chapter() {
        let source = r#"
[[chapters]]
number = 1
title = "One"
[[chapters.sections]]
id = "2.1"
title = "Misplaced"
"#;
        assert!(matches!(
            Catalog::from_toml_str(source),
            Err(CatalogError::ForeignSection { chapter: 1, .. })
        ));
    }

    #[test]
    fn rejects_duplicates_and_bad_ids() {
        let duplicate = r#"
[[chapters]]
number = 1
title = "One"
[[chapters.sections]]
id = "1.1"
title = "A"
[[chapters.sections]]
id = "1.1"
title = "B"
"#;
        assert!(matches!(
            Catalog::from_toml_str(duplicate),
            Err(CatalogError::DuplicateSection(_))
        ));

        let bad_id = r#"
[[chapters]]
number = 1
title = "One"
[[chapters.sections]]
id = "1.x"
title = "A"
"#;
        assert!(matches!(
            Catalog::from_toml_str(bad_id),
            Err(CatalogError::InvalidId { .. })
        ));

        let twice = r#"
[[chapters]]
number = 1
title = "One"
[[chapters]]
number = 1
title = "Again"
"#;
        assert!(matches!(
            Catalog::from_toml_str(twice),
            Err(CatalogError::DuplicateChapter(1))
        ));
    }

    #[test]
    fn rejects_overview_id_as_section() {
        let source = r#"
[[chapters]]
number = 1
title = "One"
[[chapters.sections]]
id = "1"
title = "Overview"
"#;
        assert!(matches!(
            Catalog::from_toml_str(source),
            Err(CatalogError::ForeignSection { .. })
        ));
    }

    #[test]
    fn bundled_catalog_covers_the_whole_book() {
        let catalog = Catalog::bundled().unwrap();
        let numbers: Vec<u32> = catalog.chapters().map(|c| c.number).collect();
        assert_eq!(numbers, (1..=8).collect::<Vec<_>>());

        for chapter in catalog.chapters() {
            assert!(!chapter.intro.trim().is_empty(), "chapter {}", chapter.number);
            assert!(!chapter.sections.is_empty(), "chapter {}", chapter.number);
            assert!(
                chapter.sections.windows(2).all(|pair| pair[0].id < pair[1].id),
                "chapter {} is out of order",
                chapter.number
            );
            for section in &chapter.sections {
                assert!(!section.reference.is_empty(), "section {}", section.id);
            }
        }

        let chapter = catalog.chapter(2).unwrap();
        let ids: Vec<String> = chapter.sections.iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids.first().map(String::as_str), Some("2.1"));
        assert_eq!(ids.last().map(String::as_str), Some("2.12"));
        assert_eq!(ids.len(), 12);
        assert_eq!(catalog.chapter(3).unwrap().sections.len(), 8);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        fs::write(&path, SMALL).unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.chapters().count(), 2);

        let missing = dir.path().join("missing.toml");
        assert!(Catalog::load(&missing).is_err());
    }
}
