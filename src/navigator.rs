use thiserror::Error;
use tracing::debug;

use crate::catalog::{Catalog, Chapter, Section};
use crate::section_id::{chapter_key, is_chapter_overview_id, SectionId};

/// Expected, user-reachable lookup failures (stale or hand-typed ids).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("chapter '{key}' not found")]
    ChapterNotFound { key: String },
    #[error("section '{id}' not found")]
    SectionNotFound { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    /// Swiping left pulls the next page in.
    pub fn navigation(self) -> Direction {
        match self {
            SwipeDirection::Left => Direction::Forward,
            SwipeDirection::Right => Direction::Backward,
        }
    }
}

/// Already-classified gesture events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SwipeStart(SwipeDirection),
    SwipeLeft,
    SwipeRight,
    /// The gesture ended without completing a swipe.
    SwipeEnd,
}

/// Position of the current section inside its chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub chapter: u32,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    ChapterOverview { chapter: u32 },
    NotFound(LookupError),
    SectionReady(Cursor),
}

/// Visual-only direction indicator for an in-progress swipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingDirection(Option<SwipeDirection>);

impl PendingDirection {
    pub fn get(&self) -> Option<SwipeDirection> {
        self.0
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    fn observe(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::SwipeStart(direction) => self.0 = Some(direction),
            Gesture::SwipeLeft | Gesture::SwipeRight | Gesture::SwipeEnd => self.0 = None,
        }
    }
}

pub struct Navigator {
    catalog: Catalog,
}

impl Navigator {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolve_chapter(&self, id: &str) -> Result<&Chapter, LookupError> {
        let key = chapter_key(id);
        self.catalog
            .chapter_by_key(key)
            .ok_or_else(|| LookupError::ChapterNotFound {
                key: key.to_string(),
            })
    }

    pub fn resolve_section<'a>(
        &self,
        chapter: &'a Chapter,
        id: &str,
    ) -> Result<&'a Section, LookupError> {
        let not_found = || LookupError::SectionNotFound { id: id.to_string() };
        let parsed: SectionId = id.parse().map_err(|_| not_found())?;
        chapter
            .sections
            .iter()
            .find(|section| section.id == parsed)
            .ok_or_else(not_found)
    }

    pub fn is_chapter_overview_id(&self, id: &str) -> bool {
        is_chapter_overview_id(id)
    }

    pub fn index_of(&self, chapter: &Chapter, id: SectionId) -> Option<usize> {
        chapter.sections.iter().position(|section| section.id == id)
    }

    /// Neighbour in declared order. No wraparound at either end.
    pub fn adjacent(
        &self,
        chapter: &Chapter,
        index: usize,
        direction: Direction,
    ) -> Option<SectionId> {
        let target = match direction {
            Direction::Forward => index.checked_add(1)?,
            Direction::Backward => index.checked_sub(1)?,
        };
        chapter.sections.get(target).map(|section| section.id)
    }

    pub fn view(&self, id: &str) -> ViewState {
        let chapter = match self.resolve_chapter(id) {
            Ok(chapter) => chapter,
            Err(err) => return ViewState::NotFound(err),
        };

        if self.is_chapter_overview_id(id) {
            return ViewState::ChapterOverview {
                chapter: chapter.number,
            };
        }

        match self.resolve_section(chapter, id) {
            Ok(section) => match self.index_of(chapter, section.id) {
                Some(index) => ViewState::SectionReady(Cursor {
                    chapter: chapter.number,
                    index,
                }),
                None => ViewState::NotFound(LookupError::SectionNotFound { id: id.to_string() }),
            },
            Err(err) => ViewState::NotFound(err),
        }
    }

    pub fn section_at(&self, cursor: Cursor) -> Option<(&Chapter, &Section)> {
        let chapter = self.catalog.chapter(cursor.chapter)?;
        let section = chapter.sections.get(cursor.index)?;
        Some((chapter, section))
    }

    pub fn step(&self, current: &str, direction: Direction) -> Option<SectionId> {
        let ViewState::SectionReady(cursor) = self.view(current) else {
            return None;
        };
        let chapter = self.catalog.chapter(cursor.chapter)?;
        self.adjacent(chapter, cursor.index, direction)
    }

    /// Target of a gesture from `current`, or `None` when it is a no-op.
    pub fn target_for(&self, current: &str, gesture: Gesture) -> Option<SectionId> {
        let direction = match gesture {
            Gesture::SwipeLeft => SwipeDirection::Left.navigation(),
            Gesture::SwipeRight => SwipeDirection::Right.navigation(),
            Gesture::SwipeStart(_) | Gesture::SwipeEnd => return None,
        };
        let target = self.step(current, direction);
        debug!(current, ?gesture, target = ?target, "gesture resolved");
        target
    }

    /// Updates the pending indicator and resolves the gesture. The indicator is
    /// cleared on every completion or cancel, whether or not a target exists.
    pub fn handle_gesture(
        &self,
        pending: &mut PendingDirection,
        current: &str,
        gesture: Gesture,
    ) -> Option<SectionId> {
        pending.observe(gesture);
        self.target_for(current, gesture)
    }
}
