//! Column sorting for rendered ticket rows.
//!
//! Sorting works on an index permutation so callers keep their rows and the
//! tickets backing them in lockstep. Sub-rows are never sorted on their own;
//! they travel with their parent.

use std::cmp::Ordering;

/// Which column to order by, named as in the header, and in which direction.
///
/// The name rather than the position is kept so toggling other columns
/// never moves the sort onto a different field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn ascending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    /// Selecting the same column again flips the direction.
    pub fn toggled(current: Option<&SortSpec>, column: &str) -> Self {
        match current {
            Some(spec) if spec.column == column => Self {
                column: column.to_string(),
                descending: !spec.descending,
            },
            _ => Self::ascending(column),
        }
    }
}

/// Return row indices ordered by the cells at `column`.
///
/// A column whose non-empty cells all parse as numbers sorts numerically,
/// otherwise case-insensitively. Empty cells always sort last. Ties keep
/// their original order.
pub fn sort_order(rows: &[Vec<String>], column: usize, descending: bool) -> Vec<usize> {
    let cell = |idx: usize| -> &str {
        rows[idx]
            .get(column)
            .map(String::as_str)
            .unwrap_or("")
    };

    let numeric = rows
        .iter()
        .filter_map(|r| r.get(column))
        .filter(|c| !c.trim().is_empty())
        .all(|c| c.trim().parse::<f64>().is_ok());

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let (ca, cb) = (cell(a).trim(), cell(b).trim());
        match (ca.is_empty(), cb.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        let ord = if numeric {
            let na = ca.parse::<f64>().unwrap_or(0.0);
            let nb = cb.parse::<f64>().unwrap_or(0.0);
            na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
        } else {
            ca.to_lowercase().cmp(&cb.to_lowercase())
        };
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(cells: &[&str]) -> Vec<Vec<String>> {
        cells.iter().map(|c| vec![c.to_string()]).collect()
    }

    #[test]
    fn test_numeric_sort() {
        let data = rows(&["10", "2", "", "0.5"]);
        assert_eq!(sort_order(&data, 0, false), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_alpha_sort_is_case_insensitive() {
        let data = rows(&["beta", "Alpha", "gamma"]);
        assert_eq!(sort_order(&data, 0, false), vec![1, 0, 2]);
    }

    #[test]
    fn test_descending_keeps_empty_last() {
        let data = rows(&["1", "", "3"]);
        assert_eq!(sort_order(&data, 0, true), vec![2, 0, 1]);
    }

    #[test]
    fn test_toggle_flips_direction() {
        let first = SortSpec::toggled(None, "Points");
        assert!(!first.descending);
        let second = SortSpec::toggled(Some(&first), "Points");
        assert!(second.descending);
        let other = SortSpec::toggled(Some(&second), "Key");
        assert_eq!(other, SortSpec::ascending("Key"));
    }
}
