use std::collections::BTreeMap;

use serde_derive::Serialize;

use crate::category::Category;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    /// Column code used by the journal: 0 for left-to-right, 1 for right-to-left.
    #[inline]
    pub fn code(&self) -> u8 {
        match self {
            Direction::LeftToRight => 0,
            Direction::RightToLeft => 1,
        }
    }
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirectionCounts {
    pub left_to_right: u64,
    pub right_to_left: u64,
}

impl DirectionCounts {
    #[inline]
    pub fn total(&self) -> u64 {
        self.left_to_right + self.right_to_left
    }

    #[inline]
    pub fn get(&self, direction: Direction) -> u64 {
        match direction {
            Direction::LeftToRight => self.left_to_right,
            Direction::RightToLeft => self.right_to_left,
        }
    }
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub left_to_right: u64,
    pub right_to_left: u64,
    pub total: u64,
}

/// Per-category directional counts. Cells only ever go up; [`Counters::reset`] is the one
/// way back to zero.
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Counters {
    cells: BTreeMap<Category, DirectionCounts>,
}

impl Counters {
    pub fn new(categories: &[Category]) -> Self {
        Self {
            cells: categories
                .iter()
                .map(|&c| (c, DirectionCounts::default()))
                .collect(),
        }
    }

    /// `None` for a category that was not enabled; nothing is counted then.
    pub fn increment(
        &mut self,
        category: Category,
        direction: Direction,
    ) -> Option<DirectionCounts> {
        let cell = self.cells.get_mut(&category)?;

        match direction {
            Direction::LeftToRight => cell.left_to_right += 1,
            Direction::RightToLeft => cell.right_to_left += 1,
        }

        Some(*cell)
    }

    #[inline]
    pub fn get(&self, category: Category) -> DirectionCounts {
        self.cells.get(&category).copied().unwrap_or_default()
    }

    pub fn totals(&self) -> Totals {
        let (ltr, rtl) = self
            .cells
            .values()
            .fold((0, 0), |(l, r), c| (l + c.left_to_right, r + c.right_to_left));

        Totals {
            left_to_right: ltr,
            right_to_left: rtl,
            total: ltr + rtl,
        }
    }

    pub fn reset(&mut self) {
        self.cells.values_mut().for_each(|c| *c = DirectionCounts::default());
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Category, DirectionCounts)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }
}
