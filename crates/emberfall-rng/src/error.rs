//! Error types for dice parsing.

/// Why a dice formula could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    /// The formula was empty or only whitespace.
    #[error("empty dice formula")]
    Empty,

    /// The formula does not match `[X]dY[+|-Z]`.
    #[error("malformed dice formula: {0:?}")]
    Malformed(String),

    /// More dice than a single formula may roll.
    #[error("too many dice: {count} (max {max})")]
    TooManyDice { count: u32, max: u32 },
}
