//! Domain types for SignalBot

pub mod candle;
pub mod position;
pub mod signal;
pub mod trade;

pub use candle::{first_out_of_order, Candle, Interval};
pub use position::{Position, PositionSide};
pub use signal::{OrderSide, Signal};
pub use trade::{ExitReason, Trade};
