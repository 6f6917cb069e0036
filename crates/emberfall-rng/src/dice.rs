//! Dice primitives and `XdY+Z` formulas.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::DiceError;

/// Upper bound on the dice a single formula may roll.
pub const MAX_DICE: u32 = 1_000;

/// Sums `n` draws of a `sides`-sided die. Returns 0 when either is ≤ 0.
pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R, n: i32, sides: i32) -> i32 {
    if n <= 0 || sides <= 0 {
        return 0;
    }
    (0..n).map(|_| rng.random_range(1..=sides)).sum()
}

pub fn d4<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    roll_dice(rng, 1, 4)
}

pub fn d6<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    roll_dice(rng, 1, 6)
}

pub fn d8<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    roll_dice(rng, 1, 8)
}

pub fn d10<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    roll_dice(rng, 1, 10)
}

pub fn d12<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    roll_dice(rng, 1, 12)
}

pub fn d20<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    roll_dice(rng, 1, 20)
}

pub fn d100<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    roll_dice(rng, 1, 100)
}

// ---------------------------------------------------------------------------
// DiceFormula
// ---------------------------------------------------------------------------

/// A parsed `[X]dY[+|-Z]` formula.
///
/// Parsing is case-insensitive and ignores whitespace anywhere, so
/// `" 2 D6 + 1 "` equals `"2d6+1"`. A missing count means one die.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceFormula {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceFormula {
    pub fn parse(input: &str) -> Result<Self, DiceError> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if compact.is_empty() {
            return Err(DiceError::Empty);
        }
        let malformed = || DiceError::Malformed(input.to_string());

        let (count_part, rest) = compact.split_once('d').ok_or_else(malformed)?;
        let count = if count_part.is_empty() {
            1
        } else {
            parse_digits(count_part).ok_or_else(malformed)?
        };

        let sides_end = rest.find(['+', '-']).unwrap_or(rest.len());
        let (sides_part, modifier_part) = rest.split_at(sides_end);
        let sides = parse_digits(sides_part).ok_or_else(malformed)?;
        if sides == 0 {
            return Err(malformed());
        }

        let modifier = if modifier_part.is_empty() {
            0
        } else {
            // `find` only stopped on an ASCII sign, so byte 1 is a boundary.
            let (sign, digits) = modifier_part.split_at(1);
            let magnitude = parse_digits(digits)
                .and_then(|m| i32::try_from(m).ok())
                .ok_or_else(malformed)?;
            if sign == "-" { -magnitude } else { magnitude }
        };

        if count > MAX_DICE {
            return Err(DiceError::TooManyDice {
                count,
                max: MAX_DICE,
            });
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Expected total: `count·(sides+1)/2 + modifier`.
    pub fn average(&self) -> f64 {
        f64::from(self.count) * (f64::from(self.sides) + 1.0) / 2.0 + f64::from(self.modifier)
    }

    /// Rolls every die and applies the modifier. The total never drops
    /// below 1.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> DiceRoll {
        // Both fit: count ≤ MAX_DICE, sides came from a u32 digit string
        // and `random_range` needs them as i32 for the sum.
        let sides = i32::try_from(self.sides).unwrap_or(i32::MAX);
        let rolls: Vec<i32> = (0..self.count)
            .map(|_| rng.random_range(1..=sides))
            .collect();
        let dice_total = rolls.iter().fold(0i32, |acc, r| acc.saturating_add(*r));
        DiceRoll {
            formula: self.to_string(),
            rolls,
            modifier: self.modifier,
            dice_total,
            total: dice_total.saturating_add(self.modifier).max(1),
        }
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for DiceFormula {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// The outcome of rolling a [`DiceFormula`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    /// Normalized formula, e.g. `"2d6+1"`.
    pub formula: String,
    /// Each die, in roll order.
    pub rolls: Vec<i32>,
    pub modifier: i32,
    /// Sum of `rolls` before the modifier.
    pub dice_total: i32,
    /// `max(1, dice_total + modifier)`.
    pub total: i32,
}

/// Parses and rolls `formula`.
///
/// # Errors
/// Any [`DiceError`] from parsing.
pub fn roll_dice_string<R: Rng + ?Sized>(rng: &mut R, formula: &str) -> Result<DiceRoll, DiceError> {
    Ok(DiceFormula::parse(formula)?.roll(rng))
}

/// Non-failing variant of [`roll_dice_string`] for call sites that fall
/// back to flat numbers. Absent, empty and malformed input all yield `None`
/// without touching the generator.
pub fn try_roll_dice_string<R: Rng + ?Sized>(rng: &mut R, formula: Option<&str>) -> Option<DiceRoll> {
    let formula = DiceFormula::parse(formula?).ok()?;
    Some(formula.roll(rng))
}

/// Expected total of `formula`, or `None` if absent or unparseable.
pub fn average_dice_roll(formula: Option<&str>) -> Option<f64> {
    DiceFormula::parse(formula?).ok().map(|f| f.average())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_formula() {
        let f = DiceFormula::parse("3d4-2").unwrap();
        assert_eq!(
            f,
            DiceFormula {
                count: 3,
                sides: 4,
                modifier: -2
            }
        );
    }

    #[test]
    fn test_parse_defaults_count_to_one() {
        assert_eq!(DiceFormula::parse("d20").unwrap().count, 1);
    }

    #[test]
    fn test_parse_ignores_case_and_whitespace() {
        let a = DiceFormula::parse(" 2 D6 + 1 ").unwrap();
        let b = DiceFormula::parse("2d6+1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["invalid", "2d", "d", "2d6+", "2d6+-1", "2x6", "2d0", "-2d6", "2d6+1d4"] {
            assert!(
                matches!(DiceFormula::parse(bad), Err(DiceError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(DiceFormula::parse(""), Err(DiceError::Empty));
        assert_eq!(DiceFormula::parse("   "), Err(DiceError::Empty));
    }

    #[test]
    fn test_parse_caps_dice_count() {
        assert_eq!(
            DiceFormula::parse("1001d6"),
            Err(DiceError::TooManyDice {
                count: 1001,
                max: MAX_DICE
            })
        );
    }

    #[test]
    fn test_display_normalizes() {
        assert_eq!(DiceFormula::parse("D8 + 3").unwrap().to_string(), "1d8+3");
        assert_eq!(DiceFormula::parse("3d4-2").unwrap().to_string(), "3d4-2");
        assert_eq!(DiceFormula::parse("2d6").unwrap().to_string(), "2d6");
    }

    #[test]
    fn test_averages() {
        assert_eq!(average_dice_roll(Some("2d6")), Some(7.0));
        assert_eq!(average_dice_roll(Some("1d8+3")), Some(7.5));
        assert_eq!(average_dice_roll(Some("nope")), None);
        assert_eq!(average_dice_roll(None), None);
    }
}
