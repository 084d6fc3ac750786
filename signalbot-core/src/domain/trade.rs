//! Trade: a completed round trip from a simulated position.

use super::position::{Position, PositionSide};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Closed by a SELL signal.
    Signal,
    /// Valued at the last close when the run ended with the position open.
    MarkToMarket,
}

/// A closed round-trip trade: entry → exit, one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: PositionSide,
    pub entry_index: usize,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_price: f64,
    pub pnl: f64,
    /// Return on entry price, in percent.
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Close `position` at `exit_price` on candle `exit_index`.
    pub fn close(
        position: &Position,
        exit_index: usize,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let pnl = position.unrealized_pnl(exit_price);
        let pnl_pct = if position.entry_price != 0.0 {
            pnl / position.entry_price * 100.0
        } else {
            0.0
        };
        Self {
            side: position.side,
            entry_index: position.entry_index,
            entry_price: position.entry_price,
            exit_index,
            exit_price,
            pnl,
            pnl_pct,
            exit_reason,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}
