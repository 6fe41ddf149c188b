//! Locally materialized rows of a session.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::schema::Record;

/// Index-addressed rows; `None` is a placeholder for a row whose data has
/// not arrived yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Window {
    rows: Vec<Option<Record>>,
}

/// Row ranges touched by [`Window::apply_diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSummary {
    /// Rows replaced in place.
    pub changed: Range<usize>,
    /// Rows removed after the replaced ones, in pre-diff indices.
    pub removed: Range<usize>,
    /// Rows inserted after the replaced ones, in post-diff indices.
    pub inserted: Range<usize>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row data, `None` for placeholders and out-of-range indices.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.rows.get(index).and_then(Option::as_ref)
    }

    pub fn is_placeholder(&self, index: usize) -> bool {
        matches!(self.rows.get(index), Some(None))
    }

    pub fn rows(&self) -> &[Option<Record>] {
        &self.rows
    }

    /// Iterate over rows whose data has arrived.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().flatten()
    }

    /// Number of non-placeholder rows.
    pub fn filled(&self) -> usize {
        self.rows.iter().filter(|row| row.is_some()).count()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Grow the window by appending rows at the end.
    pub fn append(&mut self, records: Vec<Record>) -> Range<usize> {
        let start = self.rows.len();
        self.rows.extend(records.into_iter().map(Some));
        start..self.rows.len()
    }

    /// Set the length, adding placeholders or dropping rows at the end.
    pub fn resize(&mut self, len: usize) {
        self.rows.resize(len, None);
    }

    /// Store rows at `start` without changing the length.
    pub fn fill(&mut self, start: usize, records: Vec<Record>) -> Result<Range<usize>> {
        let end = match start.checked_add(records.len()) {
            Some(end) if end <= self.rows.len() => end,
            _ => {
                return Err(Error::Protocol(format!(
                    "{} rows at {} outside of window of {} rows",
                    records.len(),
                    start,
                    self.rows.len()
                )))
            }
        };
        for (slot, record) in self.rows[start..end].iter_mut().zip(records) {
            *slot = Some(record);
        }
        Ok(start..end)
    }

    /// Replace `count` rows starting at `start` with `records`.
    ///
    /// The first `min(records.len(), count)` rows are replaced in place;
    /// surplus old rows are removed and surplus new rows inserted after
    /// them. The range is checked before anything changes and the update is
    /// a single splice, so a reader sees either the old or the new rows.
    pub fn apply_diff(
        &mut self,
        records: Vec<Record>,
        start: usize,
        count: usize,
    ) -> Result<DiffSummary> {
        let end = start
            .checked_add(count)
            .filter(|end| *end <= self.rows.len())
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "diff range {}+{} outside of window of {} rows",
                    start,
                    count,
                    self.rows.len()
                ))
            })?;

        let added = records.len();
        let overlap = added.min(count);
        self.rows.splice(start..end, records.into_iter().map(Some));

        Ok(DiffSummary {
            changed: start..start + overlap,
            removed: start + overlap..end,
            inserted: start + overlap..start + added,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> Record {
        Record::new(name, name, "item")
    }

    fn window(names: &[&str]) -> Window {
        let mut w = Window::new();
        w.append(names.iter().map(|n| record(n)).collect());
        w
    }

    fn names(w: &Window) -> Vec<String> {
        w.records().map(|r| r.name.clone()).collect()
    }

    #[test]
    fn test_replace_then_remove() {
        let mut w = window(&["A", "B", "C", "D", "E"]);
        let summary = w.apply_diff(vec![record("X")], 1, 2).unwrap();
        assert_eq!(names(&w), vec!["A", "X", "D", "E"]);
        assert_eq!(summary.changed, 1..2);
        assert_eq!(summary.removed, 2..3);
        assert!(summary.inserted.is_empty());
    }

    #[test]
    fn test_empty_diff_is_noop() {
        let mut w = window(&["A", "B", "C"]);
        let before = w.clone();
        let summary = w.apply_diff(vec![], 2, 0).unwrap();
        assert_eq!(w, before);
        assert!(summary.changed.is_empty());
        assert!(summary.removed.is_empty());
        assert!(summary.inserted.is_empty());
    }

    #[test]
    fn test_pure_insertion() {
        let mut w = window(&["A", "B"]);
        let summary = w.apply_diff(vec![record("X"), record("Y")], 1, 0).unwrap();
        assert_eq!(names(&w), vec!["A", "X", "Y", "B"]);
        assert_eq!(summary.inserted, 1..3);
    }

    #[test]
    fn test_insertion_at_end() {
        let mut w = window(&["A"]);
        w.apply_diff(vec![record("B")], 1, 0).unwrap();
        assert_eq!(names(&w), vec!["A", "B"]);
    }

    #[test]
    fn test_pure_removal() {
        let mut w = window(&["A", "B", "C", "D"]);
        let summary = w.apply_diff(vec![], 1, 2).unwrap();
        assert_eq!(names(&w), vec!["A", "D"]);
        assert_eq!(summary.removed, 1..3);
    }

    #[test]
    fn test_replace_then_insert() {
        let mut w = window(&["A", "B", "C"]);
        let summary = w
            .apply_diff(vec![record("X"), record("Y"), record("Z")], 1, 1)
            .unwrap();
        assert_eq!(names(&w), vec!["A", "X", "Y", "Z", "C"]);
        assert_eq!(summary.changed, 1..2);
        assert_eq!(summary.inserted, 2..4);
    }

    #[test]
    fn test_out_of_range_diff_leaves_window_untouched() {
        let mut w = window(&["A", "B"]);
        let before = w.clone();
        assert!(matches!(
            w.apply_diff(vec![record("X")], 1, 5),
            Err(Error::Protocol(_))
        ));
        assert!(w.apply_diff(vec![], 3, 0).is_err());
        assert_eq!(w, before);
    }

    #[test]
    fn test_placeholders_and_fill() {
        let mut w = Window::new();
        w.resize(4);
        assert_eq!(w.len(), 4);
        assert!(w.is_placeholder(2));
        assert_eq!(w.filled(), 0);

        let range = w.fill(2, vec![record("C"), record("D")]).unwrap();
        assert_eq!(range, 2..4);
        assert_eq!(w.get(3).map(|r| r.name.as_str()), Some("D"));
        assert_eq!(w.filled(), 2);
        assert!(w.get(0).is_none());

        assert!(w.fill(3, vec![record("E"), record("F")]).is_err());
        assert!(w.fill(usize::MAX, vec![record("E")]).is_err());
    }
}
