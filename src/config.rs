use serde::{Deserialize, Serialize};

use crate::game::GameError;

/// Board size constants
pub const DEFAULT_BOARD_SIZE: usize = 8;
pub const DEFAULT_OPENING_ROWS: usize = 3;
/// Square names use a single column letter, so 26 columns at most.
pub const MAX_BOARD_SIZE: usize = 26;

/// Geometry of a board and its standard opening layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub size: usize,
    /// Rows filled with men for each side in the opening position.
    pub opening_rows: usize,
}

impl BoardConfig {
    /// Config for a square board of `size`, with as many opening rows
    /// as fit (three at most).
    pub fn new(size: usize) -> Self {
        BoardConfig {
            size,
            opening_rows: DEFAULT_OPENING_ROWS.min(size / 2),
        }
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.size == 0 || self.size > MAX_BOARD_SIZE {
            return Err(GameError::InvalidSize(format!(
                "board size {} is outside 1..={}",
                self.size, MAX_BOARD_SIZE
            )));
        }
        if self.opening_rows * 2 > self.size {
            return Err(GameError::InvalidSize(format!(
                "{} opening rows per side do not fit on a {}x{} board",
                self.opening_rows, self.size, self.size
            )));
        }
        Ok(())
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            size: DEFAULT_BOARD_SIZE,
            opening_rows: DEFAULT_OPENING_ROWS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_standard_board() {
        let config = BoardConfig::default();
        assert_eq!(config.size, 8);
        assert_eq!(config.opening_rows, 3);
        assert!(config.validate().is_ok());
        assert_eq!(BoardConfig::new(8), config);
    }

    #[test]
    fn test_small_boards_shrink_opening() {
        assert_eq!(BoardConfig::new(4).opening_rows, 2);
        assert_eq!(BoardConfig::new(1).opening_rows, 0);
        assert!(BoardConfig::new(1).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(BoardConfig::new(0).validate().is_err());
        assert!(BoardConfig::new(MAX_BOARD_SIZE + 1).validate().is_err());

        let crowded = BoardConfig {
            size: 6,
            opening_rows: 4,
        };
        assert!(matches!(
            crowded.validate(),
            Err(GameError::InvalidSize(_))
        ));
    }
}
