use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

use serde::Serialize;

/// Lifecycle of a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UnitState {
    Pending = 0,
    Assigned = 1,
    Rendering = 2,
    Done = 3,
    Failed = 4,
}

impl UnitState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Assigned,
            2 => Self::Rendering,
            3 => Self::Done,
            4 => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Rendering => "rendering",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-unit state cells. Each cell is written by the worker that claimed the
/// unit and read by the coordinator once workers are joined.
#[derive(Debug)]
pub struct UnitBoard {
    cells: Vec<AtomicU8>,
}

impl UnitBoard {
    pub fn new(units: usize) -> Self {
        Self {
            cells: (0..units)
                .map(|_| AtomicU8::new(UnitState::Pending as u8))
                .collect(),
        }
    }

    pub fn mark(&self, unit: usize, state: UnitState) {
        if let Some(cell) = self.cells.get(unit) {
            cell.store(state as u8, Ordering::Release);
        }
    }

    pub fn state(&self, unit: usize) -> Option<UnitState> {
        self.cells
            .get(unit)
            .map(|cell| UnitState::from_raw(cell.load(Ordering::Acquire)))
    }

    pub fn snapshot(&self) -> Vec<UnitState> {
        self.cells
            .iter()
            .map(|cell| UnitState::from_raw(cell.load(Ordering::Acquire)))
            .collect()
    }

    /// Indices of units that did not reach `Done`.
    pub fn unfinished(&self) -> Vec<usize> {
        self.snapshot()
            .into_iter()
            .enumerate()
            .filter(|(_, state)| *state != UnitState::Done)
            .map(|(unit, _)| unit)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_all_pending() {
        let board = UnitBoard::new(3);
        assert_eq!(board.snapshot(), vec![UnitState::Pending; 3]);
        assert_eq!(board.unfinished(), vec![0, 1, 2]);
    }

    #[test]
    fn tracks_transitions_per_unit() {
        let board = UnitBoard::new(3);
        board.mark(0, UnitState::Assigned);
        board.mark(1, UnitState::Rendering);
        board.mark(2, UnitState::Done);
        assert_eq!(board.state(0), Some(UnitState::Assigned));
        assert_eq!(board.state(1), Some(UnitState::Rendering));
        assert_eq!(board.unfinished(), vec![0, 1]);

        board.mark(0, UnitState::Done);
        board.mark(1, UnitState::Failed);
        assert_eq!(board.unfinished(), vec![1]);
        assert_eq!(board.state(3), None);
    }
}
