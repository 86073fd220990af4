use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::BoardConfig;
use crate::diagram::DiagramError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row direction a man of this color moves in.
    pub fn forward(&self) -> isize {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Row on which a man of this color is crowned.
    pub fn promotion_row(&self, size: usize) -> usize {
        match self {
            Color::White => size - 1,
            Color::Black => 0,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("White"),
            Color::Black => f.write_str("Black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    Man,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub rank: Rank,
}

impl Piece {
    pub fn man(color: Color) -> Self {
        Piece {
            color,
            rank: Rank::Man,
        }
    }

    pub fn king(color: Color) -> Self {
        Piece {
            color,
            rank: Rank::King,
        }
    }

    pub fn is_king(&self) -> bool {
        self.rank == Rank::King
    }

    /// The same piece crowned; kings stay kings.
    pub fn promoted(self) -> Self {
        Piece::king(self.color)
    }

    /// Diagram symbol: lowercase for men, uppercase for kings.
    pub fn symbol(&self) -> char {
        match self.rank {
            Rank::Man => self.color.symbol(),
            Rank::King => self.color.symbol().to_ascii_uppercase(),
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'w' => Some(Piece::man(Color::White)),
            'b' => Some(Piece::man(Color::Black)),
            'W' => Some(Piece::king(Color::White)),
            'B' => Some(Piece::king(Color::Black)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square {
    pub x: usize,
    pub y: usize,
}

impl Square {
    pub fn new(x: usize, y: usize) -> Self {
        Square { x, y }
    }

    /// The neighbouring square `(dx, dy)` away, if it is still on a
    /// board of `size`.
    pub fn offset(&self, dx: isize, dy: isize, size: usize) -> Option<Square> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        (x < size && y < size).then_some(Square::new(x, y))
    }

    pub fn is_dark(&self) -> bool {
        (self.x + self.y) % 2 == 0
    }
}

/// Column letter for `x`, if the column has one.
pub(crate) fn column_letter(x: usize) -> Option<char> {
    u8::try_from(x)
        .ok()
        .filter(|&x| x < 26)
        .map(|x| (b'a' + x) as char)
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match column_letter(self.x) {
            Some(column) => write!(f, "{}{}", column, self.y + 1),
            None => write!(f, "({}, {})", self.x, self.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquareParseError {
    #[error("empty square name")]
    Empty,
    #[error("bad column: {0}")]
    BadColumn(char),
    #[error("bad row: {0}")]
    BadRow(String),
}

impl FromStr for Square {
    type Err = SquareParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let column = chars.next().ok_or(SquareParseError::Empty)?;
        let lower = column.to_ascii_lowercase();
        if !lower.is_ascii_lowercase() {
            return Err(SquareParseError::BadColumn(column));
        }
        let row = chars.as_str();
        if row.is_empty() || !row.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SquareParseError::BadRow(row.to_string()));
        }
        let y = match row.parse::<usize>() {
            Ok(y) if y >= 1 => y - 1,
            _ => return Err(SquareParseError::BadRow(row.to_string())),
        };
        Ok(Square::new((lower as u8 - b'a') as usize, y))
    }
}

/// Render a move or prefix as `e1-c3-e5`.
pub fn format_move(squares: &[Square]) -> String {
    squares
        .iter()
        .map(Square::to_string)
        .collect::<Vec<_>>()
        .join("-")
}

/// Parse a move written as `e1-c3-e5`.
pub fn parse_move(s: &str) -> Result<Vec<Square>, SquareParseError> {
    s.split('-').map(str::parse).collect()
}

/// One hop of a move: where the piece lands and what it jumps, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubMove {
    pub target: Square,
    pub capture: Option<Square>,
}

impl SubMove {
    pub fn step(target: Square) -> Self {
        SubMove {
            target,
            capture: None,
        }
    }

    pub fn jump(target: Square, capture: Square) -> Self {
        SubMove {
            target,
            capture: Some(capture),
        }
    }

    pub fn is_capture(&self) -> bool {
        self.capture.is_some()
    }
}

/// Next hops keyed by their target square.
pub type SubMoves = BTreeMap<Square, SubMove>;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Bad prefix: {0}")]
    BadPrefix(String),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Invalid board size: {0}")]
    InvalidSize(String),
    #[error("Square {0} cannot hold a piece")]
    BadSquare(Square),
    #[error("Bad diagram: {0}")]
    Diagram(#[from] DiagramError),
}

/// Replay state of a capture chain in progress.
#[derive(Debug, Default)]
struct Chain {
    removed: HashSet<Square>,
    jumping: bool,
}

/// Collects candidate hops across all rays; captures dominate steps.
struct HopCollector {
    hops: SubMoves,
    capturing: bool,
}

impl HopCollector {
    fn new(capturing: bool) -> Self {
        HopCollector {
            hops: SubMoves::new(),
            capturing,
        }
    }

    fn add(&mut self, target: Square, capture: Option<Square>) {
        if capture.is_some() && !self.capturing {
            self.capturing = true;
            self.hops.clear();
        }
        if capture.is_none() && self.capturing {
            return;
        }
        self.hops.insert(target, SubMove { target, capture });
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    size: usize,
    pieces: HashMap<Square, Piece>,
    player: Color,
    /// Memoized submoves per prefix; cleared on every mutation.
    cache: RefCell<HashMap<Vec<Square>, SubMoves>>,
}

impl Board {
    /// Standard 8x8 opening position, white to move.
    pub fn new() -> Self {
        Self::standard(&BoardConfig::default())
    }

    pub fn from_config(config: &BoardConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self::standard(config))
    }

    pub fn with_size(size: usize) -> Result<Self, GameError> {
        Self::from_config(&BoardConfig::new(size))
    }

    /// A board with no pieces on it.
    pub fn empty(size: usize, player: Color) -> Result<Self, GameError> {
        BoardConfig {
            size,
            opening_rows: 0,
        }
        .validate()?;
        Ok(Self::blank(size, player))
    }

    pub(crate) fn blank(size: usize, player: Color) -> Self {
        Board {
            size,
            pieces: HashMap::new(),
            player,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Setup for loaders that already checked the square.
    pub(crate) fn set_up(&mut self, square: Square, piece: Piece) {
        self.pieces.insert(square, piece);
    }

    fn standard(config: &BoardConfig) -> Self {
        let size = config.size;
        let mut board = Self::blank(size, Color::White);
        for x in 0..size {
            for y in 0..config.opening_rows {
                let white = Square::new(x, y);
                if white.is_dark() {
                    board.pieces.insert(white, Piece::man(Color::White));
                }
                let black = Square::new(x, size - 1 - y);
                if black.is_dark() {
                    board.pieces.insert(black, Piece::man(Color::Black));
                }
            }
        }
        board
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn player(&self) -> Color {
        self.player
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pieces.get(&square).copied()
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces.iter().map(|(&square, &piece)| (square, piece))
    }

    /// On the board and on a dark square.
    pub fn is_playable(&self, square: Square) -> bool {
        square.x < self.size && square.y < self.size && square.is_dark()
    }

    /// Put a piece on the board, returning whatever stood there.
    pub fn place(&mut self, square: Square, piece: Piece) -> Result<Option<Piece>, GameError> {
        if !self.is_playable(square) {
            return Err(GameError::BadSquare(square));
        }
        self.invalidate();
        Ok(self.pieces.insert(square, piece))
    }

    pub fn remove(&mut self, square: Square) -> Option<Piece> {
        let piece = self.pieces.remove(&square);
        if piece.is_some() {
            self.invalidate();
        }
        piece
    }

    pub fn set_player(&mut self, player: Color) {
        if self.player != player {
            self.player = player;
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        let cache = self.cache.get_mut();
        if !cache.is_empty() {
            trace!(entries = cache.len(), "clearing submove cache");
            cache.clear();
        }
    }

    fn cached(&self, prefix: &[Square], compute: impl FnOnce() -> SubMoves) -> SubMoves {
        let hit = self.cache.borrow().get(prefix).cloned();
        if let Some(hops) = hit {
            return hops;
        }
        trace!(prefix = %format_move(prefix), "submove cache miss");
        let hops = compute();
        self.cache
            .borrow_mut()
            .insert(prefix.to_vec(), hops.clone());
        hops
    }

    fn bad_prefix(&self, prefix: &[Square]) -> GameError {
        let prefix = format_move(prefix);
        debug!(%prefix, player = %self.player, "rejected prefix");
        GameError::BadPrefix(prefix)
    }

    /// Legal next hops after `prefix`. An empty prefix yields the legal
    /// origins for this turn, each paired with a placeholder step.
    pub fn submoves(&self, prefix: &[Square]) -> Result<SubMoves, GameError> {
        let Some(&origin) = prefix.first() else {
            return Ok(self.cached(prefix, || self.turn_origins()));
        };
        let piece = match self.piece_at(origin) {
            Some(piece) if piece.color == self.player => piece,
            _ => return Err(self.bad_prefix(prefix)),
        };

        let mut chain = Chain::default();
        for i in 1..prefix.len() {
            let hops = self.hops(&prefix[..i], piece, &chain);
            let hop = hops
                .get(&prefix[i])
                .ok_or_else(|| self.bad_prefix(&prefix[..=i]))?;
            match hop.capture {
                Some(captured) => {
                    chain.removed.insert(captured);
                    chain.jumping = true;
                }
                // A simple step always ends the move.
                None => return Ok(self.cached(prefix, SubMoves::new)),
            }
        }
        Ok(self.hops(prefix, piece, &chain))
    }

    fn hops(&self, prefix: &[Square], piece: Piece, chain: &Chain) -> SubMoves {
        self.cached(prefix, || self.scan(prefix, piece, chain))
    }

    /// Walk every diagonal ray from the last square of `prefix`.
    fn scan(&self, prefix: &[Square], piece: Piece, chain: &Chain) -> SubMoves {
        let from = prefix[prefix.len() - 1];
        let forward = [piece.color.forward()];
        let y_dirs: &[isize] = if piece.is_king() { &[-1, 1] } else { &forward };

        let mut collector = HopCollector::new(chain.jumping);
        for dx in [-1, 1] {
            for &dy in y_dirs {
                let mut current = from;
                let mut captured = None;
                while let Some(next) = current
                    .offset(dx, dy, self.size)
                    .filter(|&square| self.is_playable(square))
                {
                    current = next;
                    // Pieces already jumped in this chain count as empty.
                    let occupant = if chain.removed.contains(&next) {
                        None
                    } else {
                        self.piece_at(next)
                    };
                    match occupant {
                        None => collector.add(next, captured),
                        Some(other) if other.color == piece.color => break,
                        Some(_) if captured.is_none() => {
                            captured = Some(next);
                            continue;
                        }
                        Some(_) => break,
                    }
                    if !piece.is_king() {
                        break;
                    }
                }
            }
        }
        collector.hops
    }

    /// Origins allowed this turn: kings that capture beat men that
    /// capture, which beat plain steps.
    fn turn_origins(&self) -> SubMoves {
        let mut origins = SubMoves::new();
        let mut best = 0u8;
        for (&square, &piece) in &self.pieces {
            if piece.color != self.player {
                continue;
            }
            let hops = self.hops(&[square], piece, &Chain::default());
            let Some(priority) = hops
                .values()
                .map(|hop| match (hop.capture, piece.rank) {
                    (None, _) => 0,
                    (Some(_), Rank::Man) => 1,
                    (Some(_), Rank::King) => 2,
                })
                .max()
            else {
                continue;
            };
            if priority < best {
                continue;
            }
            if priority > best {
                best = priority;
                origins.clear();
            }
            origins.insert(square, SubMove::step(square));
        }
        origins
    }

    /// Squares reachable next from `prefix`. The first square of a
    /// non-empty prefix must be a legal origin this turn.
    pub fn possible_moves(&self, prefix: &[Square]) -> Result<BTreeSet<Square>, GameError> {
        if let Some(origin) = prefix.first() {
            if !self.submoves(&[])?.contains_key(origin) {
                return Err(self.bad_prefix(prefix));
            }
        }
        Ok(self.submoves(prefix)?.into_keys().collect())
    }

    pub fn move_finished(&self, prefix: &[Square]) -> Result<bool, GameError> {
        Ok(self.possible_moves(prefix)?.is_empty())
    }

    pub fn legal_origins(&self) -> BTreeSet<Square> {
        self.cached(&[], || self.turn_origins()).into_keys().collect()
    }

    /// The side to move has nothing legal left.
    pub fn is_finished(&self) -> bool {
        self.legal_origins().is_empty()
    }

    pub fn winner(&self) -> Option<Color> {
        self.is_finished().then(|| self.player.opponent())
    }

    /// Play a complete move, returning the captured pieces in the order
    /// they were jumped. Nothing changes if the move is not complete and
    /// legal.
    pub fn execute(&mut self, mv: &[Square]) -> Result<Vec<Piece>, GameError> {
        let (Some(&origin), Some(&target)) = (mv.first(), mv.last()) else {
            return Err(GameError::IllegalMove("empty move".to_string()));
        };
        match self.move_finished(mv) {
            Ok(true) => {}
            Ok(false) => {
                return Err(GameError::IllegalMove(format!(
                    "{} is not a complete move",
                    format_move(mv)
                )));
            }
            Err(err) => return Err(GameError::IllegalMove(err.to_string())),
        }

        let mut jumped = Vec::new();
        for i in 1..mv.len() {
            let hop = self.submoves(&mv[..i])?.get(&mv[i]).copied().ok_or_else(|| {
                GameError::IllegalMove(format!("{} is not a legal hop", format_move(&mv[..=i])))
            })?;
            match hop.capture {
                Some(captured) => jumped.push(captured),
                None if i + 1 < mv.len() => {
                    return Err(GameError::IllegalMove(format!(
                        "{} continues after a simple step",
                        format_move(mv)
                    )));
                }
                None => {}
            }
        }
        let mut piece = self
            .piece_at(origin)
            .ok_or_else(|| GameError::IllegalMove(format!("no piece on {}", origin)))?;

        self.pieces.remove(&origin);
        let captured: Vec<Piece> = jumped
            .iter()
            .filter_map(|square| self.pieces.remove(square))
            .collect();
        let crowned = !piece.is_king() && target.y == piece.color.promotion_row(self.size);
        if target.y == piece.color.promotion_row(self.size) {
            piece = piece.promoted();
        }
        self.pieces.insert(target, piece);
        self.player = self.player.opponent();
        self.invalidate();

        debug!(
            mv = %format_move(mv),
            captured = captured.len(),
            crowned,
            next = %self.player,
            "move executed"
        );
        Ok(captured)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.player == other.player && self.pieces == other.pieces
    }
}

impl Eq for Board {}
