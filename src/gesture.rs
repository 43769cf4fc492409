//! Turns raw terminal mouse drags into classified swipe gestures.

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::navigator::{Gesture, SwipeDirection};

pub struct SwipeTracker {
    threshold: u16,
    origin: Option<(u16, u16)>,
    announced: Option<SwipeDirection>,
}

impl SwipeTracker {
    pub fn new(threshold: u16) -> Self {
        Self {
            threshold: threshold.max(1),
            origin: None,
            announced: None,
        }
    }

    /// Horizontal travel must reach the threshold and dominate vertical travel
    /// (cells are roughly twice as tall as wide).
    fn classify(&self, column: u16, row: u16) -> Option<SwipeDirection> {
        let (start_col, start_row) = self.origin?;
        let dx = i32::from(column) - i32::from(start_col);
        let dy = i32::from(row) - i32::from(start_row);
        if dx.unsigned_abs() < u32::from(self.threshold) || dx.abs() < dy.abs() * 2 {
            return None;
        }
        if dx < 0 {
            Some(SwipeDirection::Left)
        } else {
            Some(SwipeDirection::Right)
        }
    }

    pub fn on_mouse(&mut self, event: MouseEvent) -> Option<Gesture> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.origin = Some((event.column, event.row));
                self.announced = None;
                None
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let direction = self.classify(event.column, event.row)?;
                if self.announced == Some(direction) {
                    return None;
                }
                self.announced = Some(direction);
                Some(Gesture::SwipeStart(direction))
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let completed = self.classify(event.column, event.row);
                let announced = self.announced.take();
                self.origin = None;
                match (completed, announced) {
                    (Some(SwipeDirection::Left), _) => Some(Gesture::SwipeLeft),
                    (Some(SwipeDirection::Right), _) => Some(Gesture::SwipeRight),
                    (None, Some(_)) => Some(Gesture::SwipeEnd),
                    (None, None) => None,
                }
            }
            _ => None,
        }
    }

    /// Abandons a drag in progress, e.g. when the view changes underneath it.
    pub fn cancel(&mut self) -> Option<Gesture> {
        self.origin = None;
        self.announced.take().map(|_| Gesture::SwipeEnd)
    }
}
