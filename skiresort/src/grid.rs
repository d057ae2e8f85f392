use std::{fmt, ops::Index, str::FromStr};

use itertools::{iproduct, Itertools};
use nom::{
    bytes::complete::take_till1,
    character::complete::{space0, space1},
    multi::separated_list0,
    sequence::{delimited, separated_pair},
    IResult,
};
use nom_supreme::error::ErrorTree;
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use util::{parse_exact, parse_number, parse_unsigned, Span};

pub type Elevation = i32;

/// A cell position, `x` is the column and `y` the row, both 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub x: usize,
    pub y: usize,
}

impl Coordinate {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn one_based(&self) -> (usize, usize) {
        (self.x + 1, self.y + 1)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (col, row) = self.one_based();
        write!(f, "({col},{row})")
    }
}

/// Neighbor directions, in the order the explorer tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Direction {
    West,
    East,
    North,
    South,
}

impl Direction {
    fn offset(&self) -> (isize, isize) {
        match *self {
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::North => (0, -1),
            Direction::South => (0, 1),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridParseError {
    #[error("File is empty.")]
    EmptyInput,

    #[error("First line of file must contain row count and column count.")]
    MalformedHeader { offset: usize },

    #[error("Expected {expected} rows, found {found}.")]
    RowCountMismatch { expected: usize, found: usize },

    #[error("Wrong column count in line {row}: expected {expected}, found {found}.")]
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Can't parse number in line {row} in column {col}.")]
    CellParseError {
        row: usize,
        col: usize,
        offset: usize,
    },
}

impl GridParseError {
    /// Index of the offending input line (the header is line 0) and the byte
    /// offset within it, for errors that point at a single token.
    pub fn location(&self) -> Option<(usize, usize)> {
        match *self {
            GridParseError::MalformedHeader { offset } => Some((0, offset)),
            GridParseError::CellParseError { row, offset, .. } => Some((row, offset)),
            _ => None,
        }
    }
}

/// Immutable elevation map, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Elevation>,
}

fn parse_header(i: Span) -> IResult<Span, (usize, usize), ErrorTree<Span>> {
    delimited(
        space0,
        separated_pair(parse_unsigned, space1, parse_unsigned),
        space0,
    )(i)
}

fn parse_tokens(i: Span) -> IResult<Span, Vec<Span>, ErrorTree<Span>> {
    delimited(
        space0,
        separated_list0(space1, take_till1(|c: char| c == ' ' || c == '\t')),
        space0,
    )(i)
}

fn parse_row(line: &str, row: usize, width: usize) -> Result<Vec<Elevation>, GridParseError> {
    let tokens =
        parse_exact(line, parse_tokens).map_err(|_| GridParseError::ColumnCountMismatch {
            row,
            expected: width,
            found: line.split_whitespace().count(),
        })?;

    if tokens.len() != width {
        return Err(GridParseError::ColumnCountMismatch {
            row,
            expected: width,
            found: tokens.len(),
        });
    }

    tokens
        .iter()
        .enumerate()
        .map(|(col, token)| {
            parse_exact(token.fragment(), parse_number::<Elevation, ErrorTree<Span>>).map_err(
                |e| GridParseError::CellParseError {
                    row,
                    col: col + 1,
                    offset: token.location_offset() + e.offset(),
                },
            )
        })
        .collect()
}

impl Grid {
    pub fn new(
        width: usize,
        height: usize,
        cells: Vec<Elevation>,
    ) -> Result<Self, GridParseError> {
        if width == 0 || height == 0 {
            return Err(GridParseError::EmptyInput);
        }
        // `found` counts partial rows as rows.
        if width.checked_mul(height) != Some(cells.len()) {
            return Err(GridParseError::RowCountMismatch {
                expected: height,
                found: cells.len().div_ceil(width),
            });
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Reads the header line (`rows cols`) followed by exactly `rows` lines of
    /// `cols` elevations each.
    pub fn parse_lines<I, S>(lines: I) -> Result<Self, GridParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = lines.into_iter();

        let header = lines.next().ok_or(GridParseError::EmptyInput)?;
        let (height, width) = parse_exact(header.as_ref(), parse_header)
            .map_err(|e| GridParseError::MalformedHeader { offset: e.offset() })?;

        if width == 0 || height == 0 {
            return Err(GridParseError::EmptyInput);
        }

        // Sized by what the lines deliver, never by the header.
        let mut cells = Vec::new();
        let mut row = 0;
        while let Some(line) = lines.next() {
            if row == height {
                return Err(GridParseError::RowCountMismatch {
                    expected: height,
                    found: height + 1 + lines.count(),
                });
            }

            cells.extend(parse_row(line.as_ref(), row + 1, width)?);
            row += 1;
        }

        if row < height {
            return Err(GridParseError::RowCountMismatch {
                expected: height,
                found: row,
            });
        }

        tracing::debug!(width, height, "parsed grid");

        Self::new(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.x < self.width && c.y < self.height
    }

    pub fn get(&self, c: Coordinate) -> Option<Elevation> {
        self.contains(c).then(|| self.cells[c.y * self.width + c.x])
    }

    /// All cells, row 0 left to right, then row 1, and so on.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> {
        iproduct!(0..self.height, 0..self.width).map(|(y, x)| Coordinate::new(x, y))
    }

    pub fn neighbor(&self, c: Coordinate, direction: Direction) -> Option<Coordinate> {
        let (dx, dy) = direction.offset();
        let x = c.x.checked_add_signed(dx)?;
        let y = c.y.checked_add_signed(dy)?;
        let n = Coordinate::new(x, y);
        self.contains(n).then_some(n)
    }
}

impl Index<Coordinate> for Grid {
    type Output = Elevation;

    fn index(&self, c: Coordinate) -> &Self::Output {
        assert!(self.contains(c), "{c:?} outside of {}x{} grid", self.width, self.height);
        &self.cells[c.y * self.width + c.x]
    }
}

impl FromStr for Grid {
    type Err = GridParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lines(s.lines())
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.height, self.width)?;
        for row in self.cells.chunks(self.width) {
            writeln!(f, "{}", row.iter().join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    const TEST_INPUT: &str = include_str!("../data/test_input");

    #[test]
    fn parses_test_input() {
        let grid = Grid::from_str(TEST_INPUT).unwrap();
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid[Coordinate::new(2, 1)], 9);
        assert_eq!(grid[Coordinate::new(0, 3)], 4);
        assert_eq!(grid.get(Coordinate::new(4, 0)), None);
    }

    #[test]
    fn header_is_rows_then_cols() {
        let grid = Grid::from_str("2 3\n9 8 7\n4 5 6").unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid[Coordinate::new(2, 0)], 7);
        assert_eq!(grid[Coordinate::new(0, 1)], 4);
    }

    #[test]
    fn single_cell() {
        let grid = Grid::from_str("1 1\n5").unwrap();
        assert_eq!(grid.coordinates().collect::<Vec<_>>(), vec![Coordinate::new(0, 0)]);
        assert_eq!(grid[Coordinate::new(0, 0)], 5);
    }

    #[test]
    fn signed_cells_and_tabs() {
        let grid = Grid::from_str("1 3\n-4\t+2  0 ").unwrap();
        assert_eq!(grid.coordinates().map(|c| grid[c]).collect::<Vec<_>>(), vec![-4, 2, 0]);
    }

    #[rstest]
    #[case("", GridParseError::EmptyInput)]
    #[case("0 0", GridParseError::EmptyInput)]
    #[case("2 0\n\n", GridParseError::EmptyInput)]
    #[case("abc 3", GridParseError::MalformedHeader { offset: 0 })]
    #[case("3", GridParseError::MalformedHeader { offset: 1 })]
    #[case("1 2 3", GridParseError::MalformedHeader { offset: 4 })]
    #[case("-1 2", GridParseError::MalformedHeader { offset: 0 })]
    #[case("2 3\n1 2 3", GridParseError::RowCountMismatch { expected: 2, found: 1 })]
    #[case("1 3\n1 2 3\n4 5 6\n7 8 9", GridParseError::RowCountMismatch { expected: 1, found: 3 })]
    #[case("2 3\n1 2 3\n4 5", GridParseError::ColumnCountMismatch { row: 2, expected: 3, found: 2 })]
    #[case("2 2\n1 2 3\n4 5", GridParseError::ColumnCountMismatch { row: 1, expected: 2, found: 3 })]
    #[case("2 2\n1 2\n4 x", GridParseError::CellParseError { row: 2, col: 2, offset: 2 })]
    #[case("1 2\n1 4-", GridParseError::CellParseError { row: 1, col: 2, offset: 3 })]
    fn parse_failures(#[case] input: &str, #[case] expected: GridParseError) {
        assert_eq!(Grid::from_str(input), Err(expected));
    }

    #[rstest]
    #[case("4294967296 4294967296", GridParseError::RowCountMismatch { expected: 4294967296, found: 0 })]
    #[case("4294967296 4294967296\n1", GridParseError::ColumnCountMismatch { row: 1, expected: 4294967296, found: 1 })]
    #[case("1000000000000000000 8\n1 2 3 4 5 6 7 8", GridParseError::RowCountMismatch { expected: 1000000000000000000, found: 1 })]
    #[case("18446744073709551615 2\n1 2\n3 4", GridParseError::RowCountMismatch { expected: 18446744073709551615, found: 2 })]
    fn huge_headers_fail_without_allocating(#[case] input: &str, #[case] expected: GridParseError) {
        assert_eq!(Grid::from_str(input), Err(expected));
    }

    #[rstest]
    #[case(0, 2, vec![], GridParseError::EmptyInput)]
    #[case(3, 0, vec![], GridParseError::EmptyInput)]
    #[case(3, 2, vec![0; 7], GridParseError::RowCountMismatch { expected: 2, found: 3 })]
    #[case(3, 2, vec![0; 5], GridParseError::RowCountMismatch { expected: 2, found: 2 })]
    #[case(usize::MAX, 2, vec![0; 4], GridParseError::RowCountMismatch { expected: 2, found: 1 })]
    fn new_rejects_bad_dimensions(
        #[case] width: usize,
        #[case] height: usize,
        #[case] cells: Vec<Elevation>,
        #[case] expected: GridParseError,
    ) {
        assert_eq!(Grid::new(width, height, cells), Err(expected));
    }

    #[test]
    fn column_error_before_row_overflow() {
        let res = Grid::from_str("1 2\n1\n3 4");
        assert_eq!(
            res,
            Err(GridParseError::ColumnCountMismatch {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        for input in [TEST_INPUT, "2 2\n1 q\n3 4", "4 4\n1 2 3 4"] {
            assert_eq!(Grid::from_str(input), Grid::from_str(input));
        }
    }

    #[test]
    fn display_round_trip() {
        let grid = Grid::from_str(TEST_INPUT).unwrap();
        assert_eq!(grid.to_string(), TEST_INPUT);
        assert_eq!(Grid::from_str(&grid.to_string()).unwrap(), grid);

        let grid = Grid::new(3, 2, vec![-1, 0, 7, 2147483647, -2147483648, 5]).unwrap();
        assert_eq!(Grid::from_str(&grid.to_string()).unwrap(), grid);
    }

    #[test]
    fn neighbors_stay_in_bounds() {
        let grid = Grid::from_str("2 2\n1 2\n3 4").unwrap();
        let corner = Coordinate::new(0, 0);
        let found = Direction::iter()
            .filter_map(|d| grid.neighbor(corner, d))
            .collect::<Vec<_>>();
        assert_eq!(found, vec![Coordinate::new(1, 0), Coordinate::new(0, 1)]);

        let other = Coordinate::new(1, 1);
        let found = Direction::iter()
            .filter_map(|d| grid.neighbor(other, d))
            .collect::<Vec<_>>();
        assert_eq!(found, vec![Coordinate::new(0, 1), Coordinate::new(1, 0)]);
    }

    #[test]
    fn location_of_cell_error() {
        let err = Grid::from_str("2 2\n1 2\n4 x").unwrap_err();
        assert_eq!(err.location(), Some((2, 2)));
        assert_eq!(GridParseError::EmptyInput.location(), None);
    }
}
