//! Load ordering: which candidate tiles get the concurrency budget.

use std::cmp::Ordering;

/// Priority of one load candidate. Lower compares first: nearer tiles
/// win, and among equally near tiles the one with the larger
/// screen-space error (the coarser-looking one) wins.
#[derive(Debug, Clone, Copy)]
pub struct LoadPriority {
    pub distance: f64,
    pub screen_space_error: f64,
}

impl PartialEq for LoadPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LoadPriority {}

impl PartialOrd for LoadPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LoadPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| other.screen_space_error.total_cmp(&self.screen_space_error))
    }
}
