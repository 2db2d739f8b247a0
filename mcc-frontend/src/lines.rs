//! Line number table.
//!
//! Diagnostics want line/column pairs but the compiler tracks byte offsets,
//! so we record the byte offset of every line start once per file and binary
//! search it on demand. Only `\n` terminates a line; a `\r` occupies one
//! column like any other byte.

/// A 1-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumn {
    /// 1-based line number.
    pub line: u32,
    /// 1-based byte column.
    pub column: u32,
}

/// Byte offsets of every line start in a file.
#[derive(Debug, Clone)]
pub struct LineTable {
    line_starts: Box<[u32]>,
}

impl LineTable {
    /// Build the table for `source`.
    pub fn compute(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            line_starts: line_starts.into_boxed_slice(),
        }
    }

    /// Number of lines (a trailing newline starts a final empty line).
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Byte offset of the start of a 1-based `line`.
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize - 1).copied()
    }

    /// Map a byte offset to its line and column.
    pub fn line_and_column(&self, offset: u32) -> LineColumn {
        // Index of the first line start greater than the offset, which is
        // the 1-based line number.
        let line = self.line_starts.partition_point(|&start| start <= offset) as u32;
        LineColumn {
            line,
            column: offset - self.line_starts[line as usize - 1] + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let table = LineTable::compute("abc");
        assert_eq!(table.line_count(), 1);
        assert_eq!(table.line_and_column(0), LineColumn { line: 1, column: 1 });
        assert_eq!(table.line_and_column(2), LineColumn { line: 1, column: 3 });
    }

    #[test]
    fn line_breaks() {
        let source = "ab\ncd\n\nef";
        let table = LineTable::compute(source);
        assert_eq!(table.line_count(), 4);
        assert_eq!(table.line_and_column(3), LineColumn { line: 2, column: 1 });
        assert_eq!(table.line_and_column(6), LineColumn { line: 3, column: 1 });
        assert_eq!(table.line_and_column(7), LineColumn { line: 4, column: 1 });
        assert_eq!(table.line_and_column(8), LineColumn { line: 4, column: 2 });
    }

    #[test]
    fn carriage_return_counts_one_column() {
        let table = LineTable::compute("a\r\nb");
        assert_eq!(table.line_and_column(1), LineColumn { line: 1, column: 2 });
        assert_eq!(table.line_and_column(3), LineColumn { line: 2, column: 1 });
    }

    #[test]
    fn round_trip() {
        let source = "int main(void) {\n  return 42;\n}\n";
        let table = LineTable::compute(source);
        for offset in 0..source.len() as u32 {
            let lc = table.line_and_column(offset);
            assert!(lc.column >= 1);
            assert_eq!(table.line_start(lc.line).unwrap() + lc.column - 1, offset);
        }
    }
}
