use serde::Serialize;

use crate::error::{KioskError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn step(self) -> isize {
        match self {
            Direction::Previous => -1,
            Direction::Next => 1,
        }
    }

    /// Direction for a signed delta; zero has none.
    pub fn from_sign(delta: f32) -> Option<Self> {
        if delta < 0.0 {
            Some(Direction::Previous)
        } else if delta > 0.0 {
            Some(Direction::Next)
        } else {
            None
        }
    }
}

/// Current position in the carousel row. The index is always inside
/// `0..item_count`; moving past either end is refused rather than wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionModel {
    selected_index: usize,
    item_count: usize,
}

impl SelectionModel {
    pub fn new(item_count: usize) -> Result<Self> {
        if item_count == 0 {
            return Err(KioskError::EmptyCatalog);
        }
        Ok(Self {
            selected_index: 0,
            item_count,
        })
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn is_first(&self) -> bool {
        self.selected_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.selected_index + 1 == self.item_count
    }

    /// Steps one item in `direction`. Returns `false` and leaves the index
    /// untouched when that would leave the row; callers use the refusal to
    /// play the boundary cue.
    pub fn advance(&mut self, direction: Direction) -> bool {
        let next = match direction {
            Direction::Previous => self.selected_index.checked_sub(1),
            Direction::Next => Some(self.selected_index + 1).filter(|idx| *idx < self.item_count),
        };
        match next {
            Some(index) => {
                self.selected_index = index;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.selected_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_row_is_rejected() {
        assert!(matches!(
            SelectionModel::new(0),
            Err(KioskError::EmptyCatalog)
        ));
    }

    #[test]
    fn previous_at_first_item_is_refused() {
        let mut selection = SelectionModel::new(3).expect("non-empty");
        assert!(!selection.advance(Direction::Previous));
        assert_eq!(selection.selected_index(), 0);
    }

    #[test]
    fn walks_to_the_end_and_stops() {
        let mut selection = SelectionModel::new(9).expect("non-empty");
        for _ in 0..3 {
            assert!(selection.advance(Direction::Next));
        }
        assert_eq!(selection.selected_index(), 3);
        for _ in 0..5 {
            assert!(selection.advance(Direction::Next));
        }
        assert_eq!(selection.selected_index(), 8);
        assert!(selection.is_last());
        assert!(!selection.advance(Direction::Next));
        assert_eq!(selection.selected_index(), 8);
    }

    #[test]
    fn arbitrary_sequences_stay_in_bounds() {
        let mut selection = SelectionModel::new(4).expect("non-empty");
        // Deterministic pseudo-random walk.
        let mut seed: u32 = 0x9e37_79b9;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let direction = if seed & 1 == 0 {
                Direction::Previous
            } else {
                Direction::Next
            };
            let before = selection.selected_index();
            let moved = selection.advance(direction);
            let after = selection.selected_index();
            assert!(after < selection.item_count());
            if moved {
                assert_eq!(after as isize - before as isize, direction.step());
            } else {
                assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn single_item_refuses_both_directions() {
        let mut selection = SelectionModel::new(1).expect("non-empty");
        assert!(selection.is_first() && selection.is_last());
        assert!(!selection.advance(Direction::Next));
        assert!(!selection.advance(Direction::Previous));
    }
}
