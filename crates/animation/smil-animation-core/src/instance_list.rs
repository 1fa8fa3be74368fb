//! Sorted, deduplicated sets of time instants.

use serde::{Deserialize, Serialize};

use crate::error::AnimationResult;
use crate::time::TimeInstant;

/// Ascending list of resolved instants.
///
/// `Indefinite` is never stored; schedules track that case with a flag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceList {
    items: Vec<TimeInstant>,
}

impl InstanceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity hint; fails with `ResourceExhausted` if the allocation cannot be made.
    pub fn reserve(&mut self, additional: usize) -> AnimationResult<()> {
        self.items.try_reserve(additional)?;
        Ok(())
    }

    /// Insert `t` keeping the list sorted. Returns `true` when the value was new.
    /// Unresolved and indefinite instants are ignored.
    pub fn add(&mut self, t: TimeInstant) -> AnimationResult<bool> {
        if !t.is_resolved() || t.is_indefinite() {
            return Ok(false);
        }
        match self.items.binary_search(&t) {
            Ok(_) => Ok(false),
            Err(pos) => {
                self.items.try_reserve(1)?;
                self.items.insert(pos, t);
                Ok(true)
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = TimeInstant>>(&mut self, iter: I) -> AnimationResult<()> {
        for t in iter {
            self.add(t)?;
        }
        Ok(())
    }

    /// Smallest stored value `> t`, or `Unresolved`.
    pub fn first_past(&self, t: TimeInstant) -> TimeInstant {
        let idx = self.items.partition_point(|x| *x <= t);
        self.items.get(idx).copied().unwrap_or(TimeInstant::UNRESOLVED)
    }

    /// Smallest stored value `>= t`, or `Unresolved`.
    pub fn first_at_or_after(&self, t: TimeInstant) -> TimeInstant {
        let idx = self.items.partition_point(|x| *x < t);
        self.items.get(idx).copied().unwrap_or(TimeInstant::UNRESOLVED)
    }

    /// Largest stored value `<= t`, or `Unresolved`.
    pub fn last_at_or_before(&self, t: TimeInstant) -> TimeInstant {
        let idx = self.items.partition_point(|x| *x <= t);
        if idx == 0 {
            TimeInstant::UNRESOLVED
        } else {
            self.items[idx - 1]
        }
    }

    pub fn contains(&self, t: TimeInstant) -> bool {
        self.items.binary_search(&t).is_ok()
    }

    /// Drop every instant for which `keep` returns false.
    pub fn retain(&mut self, keep: impl FnMut(&TimeInstant) -> bool) {
        self.items.retain(keep);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn first(&self) -> Option<TimeInstant> {
        self.items.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeInstant> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[TimeInstant] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ms: i64) -> TimeInstant {
        TimeInstant::from_ms(ms)
    }

    #[test]
    fn add_keeps_sorted_and_unique() {
        let mut list = InstanceList::new();
        for ms in [500, -20, 300, 500, 0, 300, 1200] {
            list.add(t(ms)).unwrap();
        }
        assert_eq!(list.as_slice(), &[t(-20), t(0), t(300), t(500), t(1200)]);
        assert!(!list.add(TimeInstant::INDEFINITE).unwrap());
        assert!(!list.add(TimeInstant::UNRESOLVED).unwrap());
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn queries() {
        let mut list = InstanceList::new();
        list.extend([t(0), t(300), t(500)]).unwrap();
        assert_eq!(list.first_past(t(300)), t(500));
        assert_eq!(list.first_at_or_after(t(300)), t(300));
        assert_eq!(list.first_past(t(500)), TimeInstant::UNRESOLVED);
        assert_eq!(list.first_past(TimeInstant::EARLIEST), t(0));
        assert_eq!(list.last_at_or_before(t(499)), t(300));
        assert_eq!(list.last_at_or_before(t(-1)), TimeInstant::UNRESOLVED);
    }
}
