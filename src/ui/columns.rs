//! Column specification and layout for the file list.
//!
//! A column spec is a short string of column characters, eg. `nsm` for
//! name, size and modification time. Name columns stretch to share the
//! width left over by the fixed-width ones.

use crate::core::sort::SortMethod;

/// Width of the selection marker gutter on the left of every row.
pub const GUTTER: usize = 2;

const MAX_COLUMNS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Size,
    Permissions,
    ModifyTime,
    ChangeTime,
    AccessTime,
    Rank,
}

impl Column {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'n' => Column::Name,
            's' => Column::Size,
            'p' => Column::Permissions,
            'm' => Column::ModifyTime,
            'c' => Column::ChangeTime,
            'a' => Column::AccessTime,
            'r' => Column::Rank,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Column::Name => 'n',
            Column::Size => 's',
            Column::Permissions => 'p',
            Column::ModifyTime => 'm',
            Column::ChangeTime => 'c',
            Column::AccessTime => 'a',
            Column::Rank => 'r',
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Size => "Size",
            Column::Permissions => "Perm",
            Column::ModifyTime => "Modified",
            Column::ChangeTime => "Changed",
            Column::AccessTime => "Accessed",
            Column::Rank => "#",
        }
    }

    /// Width of a fixed column, `None` for stretchy ones.
    pub fn fixed_width(self, time_width: usize) -> Option<usize> {
        match self {
            Column::Name => None,
            Column::Size => Some(10),
            Column::Permissions => Some(4),
            Column::ModifyTime | Column::ChangeTime | Column::AccessTime => Some(time_width),
            Column::Rank => Some(4),
        }
    }

    /// Sort method a header click on this column selects.
    pub fn sort_method(self) -> SortMethod {
        match self {
            Column::Name => SortMethod::Name,
            Column::Size => SortMethod::Size,
            Column::Permissions => SortMethod::Permissions,
            Column::ModifyTime => SortMethod::ModifyTime,
            Column::ChangeTime => SortMethod::ChangeTime,
            Column::AccessTime => SortMethod::AccessTime,
            Column::Rank => SortMethod::Random,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Vec<Column>,
}

impl ColumnSpec {
    /// Parses a column string. Unknown characters and over-long specs are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.chars().count() > MAX_COLUMNS {
            return None;
        }
        let columns = s.chars().map(Column::from_char).collect::<Option<Vec<_>>>()?;
        Some(ColumnSpec { columns })
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

impl Default for ColumnSpec {
    fn default() -> Self {
        ColumnSpec {
            columns: vec![Column::Name, Column::Size, Column::ModifyTime],
        }
    }
}

impl std::fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.columns.iter().try_for_each(|c| write!(f, "{}", c.as_char()))
    }
}

/// One placed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub column: Column,
    pub x: usize,
    pub width: usize,
}

/// Column placement for a given terminal width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    cells: Vec<Cell>,
}

impl Layout {
    /// Places the columns after the gutter, one space apart. Fixed columns
    /// get their own width and stretchy columns split the remainder evenly,
    /// the last stretchy one taking any leftover cell.
    pub fn compute(spec: &ColumnSpec, total_width: usize, time_width: usize) -> Self {
        let cols = spec.columns();
        let separators = cols.len().saturating_sub(1);
        let fixed: usize = cols.iter().filter_map(|c| c.fixed_width(time_width)).sum();
        let stretchy = cols.iter().filter(|c| c.fixed_width(time_width).is_none()).count();

        let remaining = total_width.saturating_sub(GUTTER + separators + fixed);
        let (share, extra) = match stretchy {
            0 => (0, 0),
            k => (remaining / k, remaining % k),
        };

        let mut cells = Vec::with_capacity(cols.len());
        let mut x = GUTTER;
        let mut seen_stretchy = 0;
        for column in cols {
            let width = match column.fixed_width(time_width) {
                Some(w) => w,
                None => {
                    seen_stretchy += 1;
                    if seen_stretchy == stretchy {
                        share + extra
                    } else {
                        share
                    }
                }
            };
            let width = width.min(total_width.saturating_sub(x));
            cells.push(Cell {
                column: *column,
                x,
                width,
            });
            x += width + 1;
        }
        Layout { cells }
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Column under screen column `x`, if any.
    pub fn column_at(&self, x: usize) -> Option<Column> {
        self.cells
            .iter()
            .find(|cell| x >= cell.x && x < cell.x + cell.width)
            .map(|cell| cell.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let spec = ColumnSpec::parse("nspr").expect("valid");
        assert_eq!(spec.columns().len(), 4);
        assert_eq!(spec.to_string(), "nspr");
        assert!(ColumnSpec::parse("nx").is_none());
        assert!(ColumnSpec::parse("").is_none());
        assert!(ColumnSpec::parse(&"n".repeat(17)).is_none());
    }

    #[test]
    fn name_columns_share_remaining_width() {
        let spec = ColumnSpec::parse("nsn").expect("valid");
        let layout = Layout::compute(&spec, 80, 16);
        let widths: Vec<usize> = layout.cells().iter().map(|c| c.width).collect();
        // 80 - gutter 2 - separators 2 - size 10 = 66
        assert_eq!(widths, vec![33, 10, 33]);
        assert_eq!(layout.cells()[0].x, GUTTER);
        assert_eq!(layout.cells()[1].x, GUTTER + 34);
    }

    #[test]
    fn uneven_split_goes_to_last_name_column() {
        let spec = ColumnSpec::parse("nn").expect("valid");
        let layout = Layout::compute(&spec, 10, 16);
        let widths: Vec<usize> = layout.cells().iter().map(|c| c.width).collect();
        assert_eq!(widths, vec![3, 4]);
    }

    #[test]
    fn header_hit_testing() {
        let spec = ColumnSpec::parse("ns").expect("valid");
        let layout = Layout::compute(&spec, 40, 16);
        assert_eq!(layout.column_at(GUTTER), Some(Column::Name));
        assert_eq!(layout.column_at(39), Some(Column::Size));
        assert_eq!(layout.column_at(0), None);
    }
}
