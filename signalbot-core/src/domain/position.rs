use serde::{Deserialize, Serialize};

/// Position direction. The backtest only ever opens longs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
}

/// An open simulated position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_index: usize,
    pub entry_price: f64,
}

impl Position {
    pub fn long(entry_index: usize, entry_price: f64) -> Self {
        Self {
            side: PositionSide::Long,
            entry_index,
            entry_price,
        }
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        match self.side {
            PositionSide::Long => current_price - self.entry_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_unrealized_pnl() {
        let pos = Position::long(60, 100.0);
        assert_eq!(pos.unrealized_pnl(110.0), 10.0);
        assert_eq!(pos.unrealized_pnl(95.0), -5.0);
    }
}
