//! Swimlane-by-column difference counts
//!
//! Row `r` belongs to swimlane label `r`; column `c` covers the `c`-th bucket
//! counted from the start of the visible time range.

use shared::ZoomResponse;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketMatrix {
    rows: Vec<Vec<u32>>,
    columns: usize,
}

impl BucketMatrix {
    pub fn empty(columns: usize) -> Self {
        Self {
            rows: Vec::new(),
            columns,
        }
    }

    /// Builds a matrix from raw rows, zero-filling or truncating each to `columns`.
    pub fn from_rows<I>(rows: I, columns: usize) -> Self
    where
        I: IntoIterator<Item = Vec<u32>>,
    {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns, 0);
                row
            })
            .collect();
        Self { rows, columns }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Count at `(row, column)`, zero outside the matrix.
    pub fn value(&self, row: i32, column: i32) -> u32 {
        if row < 0 || column < 0 {
            return 0;
        }
        self.rows
            .get(row as usize)
            .and_then(|cells| cells.get(column as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Whether any bucket of `row` in `[start, end)` holds differences.
    /// The range is clamped to the matrix and a missing row has none.
    pub fn non_empty_cell_exists(&self, row: i32, start: i32, end: i32) -> bool {
        if row < 0 {
            return false;
        }
        let Some(cells) = self.rows.get(row as usize) else {
            return false;
        };
        let start = start.max(0) as usize;
        let end = (end.max(0) as usize).min(cells.len());
        start < end && cells[start..end].iter().any(|count| *count > 0)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Swimlanes after applying one zoom response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSwimlanes {
    pub labels: Vec<String>,
    pub buckets: BucketMatrix,
    pub max_rows: usize,
}

/// Merges a zoom response into the current swimlane layout.
///
/// Known pairs keep their rows, new pairs are appended in response order and
/// pairs absent from the response are dropped. `max_rows` only ever grows so
/// the canvas does not shrink while the user is looking at it.
pub fn merge_swimlanes(
    previous_labels: &[String],
    max_rows: usize,
    columns: usize,
    response: &ZoomResponse,
) -> MergedSwimlanes {
    let mut labels: Vec<String> = previous_labels
        .iter()
        .filter(|label| response.contains_key(label.as_str()))
        .cloned()
        .collect();
    for pair_key in response.keys() {
        if !labels.contains(pair_key) {
            labels.push(pair_key.clone());
        }
    }

    let buckets = BucketMatrix::from_rows(
        labels
            .iter()
            .map(|label| response.get(label).cloned().unwrap_or_default()),
        columns,
    );

    MergedSwimlanes {
        max_rows: max_rows.max(labels.len()),
        labels,
        buckets,
    }
}
