use std::ops::Range;

use crate::config::InsertCheck;

/// One hunk of a staged file's diff against its last commit.
///
/// `from_first_line` is 0-indexed into the last committed snapshot. A pure
/// insertion has `from_line_count == 0` and inserts immediately above
/// `from_first_line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub path: String,
    pub from_first_line: usize,
    pub from_line_count: usize,
    /// Replacement lines from the staged content, terminators included.
    /// `None` when the hunk was parsed without staged content.
    pub into_lines: Option<Vec<Vec<u8>>>,
}

impl Transformation {
    pub fn is_insertion(&self) -> bool {
        self.from_line_count == 0
    }

    /// Lines of the last committed snapshot replaced by `into_lines`.
    /// Empty for insertions, so applying splices without removing anything.
    pub fn range_to_apply_edit(&self) -> Range<usize> {
        self.from_first_line..self.from_first_line + self.from_line_count
    }

    /// 1-indexed inclusive line range to blame in the last committed snapshot.
    ///
    /// Modifications blame exactly the lines they replace. Insertions blame
    /// their neighbours according to `insert_checks`; `None` means there is
    /// no neighbour to ask about (inserting at the top under `Above`).
    pub fn lines_for_attribution(&self, insert_checks: InsertCheck) -> Option<(u32, u32)> {
        let first = self.from_first_line as u32;
        if !self.is_insertion() {
            return Some((first + 1, first + self.from_line_count as u32));
        }

        // 1-indexed, the line above the insertion point is `first` and the
        // line below is `first + 1`
        let above = first;
        let below = first + 1;
        match insert_checks {
            InsertCheck::Above if above == 0 => None,
            InsertCheck::Above => Some((above, above)),
            InsertCheck::Below => Some((below, below)),
            InsertCheck::Around | InsertCheck::Recent => Some((above.max(1), below)),
        }
    }
}
