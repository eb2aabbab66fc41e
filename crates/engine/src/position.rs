//! Dense display-ordering for the managed collections.
//!
//! Active rows of a collection occupy positions `1..=N` with no gaps or
//! duplicates. Deleting a row does not renumber anything (the tombstone keeps
//! its last position frozen); the sequence is re-compacted the next time a
//! row is repositioned.

use crate::{EngineError, ResultEngine};

/// Capability interface for entities carrying a display position.
pub trait Positioned {
    fn position(&self) -> i64;
    fn set_position(&mut self, position: i64);
}

/// Position for a row appended to the collection.
///
/// The maximum is taken over **all** rows, deleted ones included, so a new
/// row never collides with a frozen tombstone position. Returns 1 for an
/// empty collection.
pub(crate) fn next_position<I>(positions: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    positions.into_iter().max().map_or(1, |max| max + 1)
}

/// Relocates `active[target]` to `new_position`, shifting the minimum number
/// of neighbors.
///
/// `active` must hold the active subset of one collection, ordered by
/// position. The slice is first compacted to dense ranks `1..=N` (absorbing
/// any gaps left by earlier deletions), then the target is moved:
///
/// - moving down: rows in `(old, new]` shift up by one,
/// - moving up: rows in `[new, old)` shift down by one.
///
/// Returns the indices of every row whose position changed, so the caller can
/// stamp and persist exactly those rows. No row is mutated when
/// `new_position` is out of `[1, N]`.
pub(crate) fn move_to<T: Positioned>(
    active: &mut [T],
    target: usize,
    new_position: i64,
) -> ResultEngine<Vec<usize>> {
    let count = active.len() as i64;
    if new_position < 1 || new_position > count {
        return Err(EngineError::PositionOutOfRange {
            requested: new_position,
            max: count,
        });
    }

    let before: Vec<i64> = active.iter().map(Positioned::position).collect();

    // Compact to dense ranks; the slice arrives ordered by position.
    for (index, row) in active.iter_mut().enumerate() {
        row.set_position(index as i64 + 1);
    }

    let old_position = target as i64 + 1;
    if old_position < new_position {
        for row in &mut active[target + 1..new_position as usize] {
            row.set_position(row.position() - 1);
        }
    } else if old_position > new_position {
        for row in &mut active[new_position as usize - 1..target] {
            row.set_position(row.position() + 1);
        }
    }
    active[target].set_position(new_position);

    Ok(active
        .iter()
        .enumerate()
        .filter(|(index, row)| row.position() != before[*index])
        .map(|(index, _)| index)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        name: &'static str,
        position: i64,
    }

    impl Positioned for Row {
        fn position(&self) -> i64 {
            self.position
        }
        fn set_position(&mut self, position: i64) {
            self.position = position;
        }
    }

    fn rows(entries: &[(&'static str, i64)]) -> Vec<Row> {
        entries
            .iter()
            .map(|(name, position)| Row {
                name,
                position: *position,
            })
            .collect()
    }

    fn positions(rows: &[Row]) -> Vec<(&'static str, i64)> {
        rows.iter().map(|row| (row.name, row.position)).collect()
    }

    #[test]
    fn next_position_includes_frozen_tombstones() {
        assert_eq!(next_position([]), 1);
        assert_eq!(next_position([1, 2, 3]), 4);
        // 3 belongs to a deleted row: still counted.
        assert_eq!(next_position([1, 2, 3, 5]), 6);
    }

    #[test]
    fn move_down_shifts_range_up() {
        let mut active = rows(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]);
        let changed = move_to(&mut active, 0, 3).unwrap();
        assert_eq!(
            positions(&active),
            vec![("a", 3), ("b", 1), ("c", 2), ("d", 4)]
        );
        assert_eq!(changed, vec![0, 1, 2]);
    }

    #[test]
    fn move_up_shifts_range_down() {
        let mut active = rows(&[("a", 1), ("b", 2), ("c", 3)]);
        let changed = move_to(&mut active, 2, 1).unwrap();
        assert_eq!(positions(&active), vec![("a", 2), ("b", 3), ("c", 1)]);
        assert_eq!(changed, vec![0, 1, 2]);
    }

    #[test]
    fn move_to_same_slot_is_a_no_op() {
        let mut active = rows(&[("a", 1), ("b", 2), ("c", 3)]);
        let changed = move_to(&mut active, 1, 2).unwrap();
        assert!(changed.is_empty());
        assert_eq!(positions(&active), vec![("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn gaps_from_deletions_are_compacted_first() {
        // Row at 3 was deleted earlier; survivors kept 2 and 4.
        let mut active = rows(&[("a", 2), ("b", 4), ("c", 5)]);
        let changed = move_to(&mut active, 2, 1).unwrap();
        assert_eq!(positions(&active), vec![("a", 2), ("b", 3), ("c", 1)]);
        assert_eq!(changed, vec![0, 1, 2]);
    }

    #[test]
    fn out_of_range_leaves_rows_untouched() {
        let mut active = rows(&[("a", 1), ("b", 2)]);
        let err = move_to(&mut active, 0, 3).unwrap_err();
        assert_eq!(
            err,
            EngineError::PositionOutOfRange {
                requested: 3,
                max: 2
            }
        );
        assert_eq!(positions(&active), vec![("a", 1), ("b", 2)]);

        let err = move_to(&mut active, 0, 0).unwrap_err();
        assert_eq!(
            err,
            EngineError::PositionOutOfRange {
                requested: 0,
                max: 2
            }
        );
    }

    #[test]
    fn dense_after_any_move() {
        let mut active = rows(&[("a", 1), ("b", 3), ("c", 6), ("d", 7), ("e", 9)]);
        move_to(&mut active, 3, 2).unwrap();
        let mut sorted: Vec<i64> = active.iter().map(Positioned::position).collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }
}
