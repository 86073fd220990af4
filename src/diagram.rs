//! Plain-text board diagrams.
//!
//! ```text
//! [w] abcdefgh
//!    +--------+
//!  8 | b b b b| 8
//!  ...
//!  1 |w w w w | 1
//!    +--------+
//!     abcdefgh
//! ```
//!
//! Only the lines holding exactly two `|` are board rows; the player
//! marker on the first line is `[w]` or `[b]`.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::MAX_BOARD_SIZE;
use crate::game::{Board, Color, Piece, Square, column_letter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    #[error("missing player marker, expected [w] or [b]")]
    MissingPlayer,
    #[error("no board rows found")]
    NoRows,
    #[error("{0} rows do not fit a board")]
    TooLarge(usize),
    #[error("row {row} has {found} columns, expected {expected}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("bad symbol: {0:?}")]
    BadSymbol(char),
    #[error("symbol on dead square: {0:?}")]
    SymbolOnDeadSquare(char),
}

fn player_marker(source: &str) -> Option<Color> {
    let source = source.trim_start();
    if source.starts_with("[w]") {
        Some(Color::White)
    } else if source.starts_with("[b]") {
        Some(Color::Black)
    } else {
        None
    }
}

fn parse(source: &str, player: Color) -> Result<Board, DiagramError> {
    let rows: Vec<&str> = source
        .lines()
        .filter(|line| line.matches('|').count() == 2)
        .collect();
    if rows.is_empty() {
        return Err(DiagramError::NoRows);
    }
    let size = rows.len();
    if size > MAX_BOARD_SIZE {
        return Err(DiagramError::TooLarge(size));
    }

    let mut board = Board::blank(size, player);
    for (index, line) in rows.iter().enumerate() {
        let y = size - 1 - index;
        let interior = line.split('|').nth(1).unwrap_or_default();
        let found = interior.chars().count();
        if found != size {
            return Err(DiagramError::ColumnCount {
                row: y + 1,
                expected: size,
                found,
            });
        }
        for (x, symbol) in interior.chars().enumerate() {
            let square = Square::new(x, y);
            if !square.is_dark() {
                if symbol != ' ' {
                    return Err(DiagramError::SymbolOnDeadSquare(symbol));
                }
                continue;
            }
            if symbol == '.' {
                continue;
            }
            let piece = Piece::from_symbol(symbol).ok_or(DiagramError::BadSymbol(symbol))?;
            board.set_up(square, piece);
        }
    }
    Ok(board)
}

impl Board {
    /// Read a diagram; the player marker is required.
    pub fn load(source: &str) -> Result<Board, DiagramError> {
        let player = player_marker(source).ok_or(DiagramError::MissingPlayer)?;
        parse(source, player)
    }

    /// Read a diagram that may omit the player marker, in which case
    /// `player` moves.
    pub fn load_with_player(source: &str, player: Color) -> Result<Board, DiagramError> {
        parse(source, player_marker(source).unwrap_or(player))
    }

    pub fn dump(&self) -> String {
        let size = self.size();
        let columns: String = (0..size).filter_map(column_letter).collect();
        let border = format!("   +{}+", "-".repeat(size));

        let mut lines = vec![
            format!("[{}] {}", self.player().symbol(), columns),
            border.clone(),
        ];
        for y in (0..size).rev() {
            let row: String = (0..size)
                .map(|x| {
                    let square = Square::new(x, y);
                    if !square.is_dark() {
                        ' '
                    } else {
                        self.piece_at(square).map_or('.', |piece| piece.symbol())
                    }
                })
                .collect();
            lines.push(format!("{:2} |{}|{:2}", y + 1, row, y + 1));
        }
        lines.push(border);
        lines.push(format!("    {}", columns));
        lines.push(String::new());
        lines.join("\n")
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

impl FromStr for Board {
    type Err = DiagramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::load(s)
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.dump())
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Board::load(&source).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENING: &str = "[w] abcdefgh
   +--------+
 8 | b b b b| 8
 7 |b b b b | 7
 6 | b b b b| 6
 5 |. . . . | 5
 4 | . . . .| 4
 3 |w w w w | 3
 2 | w w w w| 2
 1 |w w w w | 1
   +--------+
    abcdefgh
";

    const MIXED: &str = "[w] abcdefgh
   +--------+
 8 | b b B b| 8
 7 |b w b . | 7
 6 | b b B b| 6
 5 |. . w b | 5
 4 | . B . .| 4
 3 |w B w W | 3
 2 | w w W b| 2
 1 |w B w w | 1
   +--------+
    abcdefgh
";

    #[test]
    fn test_dump() {
        assert_eq!(Board::new().dump(), OPENING);
        assert_eq!(Board::new().to_string(), OPENING);
    }

    #[test]
    fn test_load_opening() {
        assert_eq!(Board::load(OPENING).unwrap(), Board::new());
    }

    #[test]
    fn test_roundtrip() {
        let board = Board::load(MIXED).unwrap();
        assert_eq!(board.dump(), MIXED);
        assert_eq!(board.piece_at(Square::new(1, 0)), Some(Piece::king(Color::Black)));
        assert_eq!(board.piece_at(Square::new(6, 2)), Some(Piece::king(Color::White)));

        let black = MIXED.replacen("[w]", "[b]", 1);
        let board: Board = black.parse().unwrap();
        assert_eq!(board.player(), Color::Black);
        assert_eq!(board.dump(), black);
    }

    #[test]
    fn test_small_board_roundtrip() {
        let source = "[b] abcd
   +----+
 4 | . b| 4
 3 |. . | 3
 2 | W .| 2
 1 |w . | 1
   +----+
    abcd
";
        let board = Board::load(source).unwrap();
        assert_eq!(board.size(), 4);
        assert_eq!(board.dump(), source);
    }

    #[test]
    fn test_missing_player() {
        let source = "
            | . . . .|
            |. . . . |
            | . . . .|
            |. . . . |
            | . . . .|
            |. . . . |
            | . . . .|
            |. . w . |
        ";
        assert_eq!(Board::load(source), Err(DiagramError::MissingPlayer));

        let board = Board::load_with_player(source, Color::Black).unwrap();
        assert_eq!(board.player(), Color::Black);
        assert_eq!(board.piece_at(Square::new(4, 0)), Some(Piece::man(Color::White)));

        // The marker wins over the fallback.
        let board = Board::load_with_player(OPENING, Color::Black).unwrap();
        assert_eq!(board.player(), Color::White);
    }

    #[test]
    fn test_no_rows() {
        assert_eq!(Board::load("[w]\n"), Err(DiagramError::NoRows));
        assert_eq!(Board::load("[b] |||\n"), Err(DiagramError::NoRows));
    }

    #[test]
    fn test_bad_column_count() {
        let source = "[w]
            | .|
            |. . |
        ";
        assert_eq!(
            Board::load(source),
            Err(DiagramError::ColumnCount {
                row: 1,
                expected: 2,
                found: 4
            })
        );
    }

    #[test]
    fn test_bad_symbol() {
        let source = "[w]
            | x|
            |. |
        ";
        assert_eq!(Board::load(source), Err(DiagramError::BadSymbol('x')));
    }

    #[test]
    fn test_symbol_on_dead_square() {
        let source = "[w]
            |w.|
            |. |
        ";
        assert_eq!(
            Board::load(source),
            Err(DiagramError::SymbolOnDeadSquare('w'))
        );
        let source = "[w]
            | .|
            |.b|
        ";
        assert_eq!(
            Board::load(source),
            Err(DiagramError::SymbolOnDeadSquare('b'))
        );
    }

    #[test]
    fn test_too_large() {
        let row = format!("|{}|\n", " ".repeat(27));
        let source = format!("[w]\n{}", row.repeat(27));
        assert_eq!(Board::load(&source), Err(DiagramError::TooLarge(27)));
    }

    #[test]
    fn test_serde_uses_diagram() {
        let board = Board::load(MIXED).unwrap();
        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(json, serde_json::to_string(MIXED).unwrap());
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);

        assert!(serde_json::from_str::<Board>("\"[w]\\n\"").is_err());
    }
}
