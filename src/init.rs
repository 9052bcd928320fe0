//! Parameter initializers.
//!
//! An `Init` is a strategy only; randomness always comes from the RNG handle passed in, so a
//! seeded RNG makes construction reproducible.

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Weight initialization scheme.
pub enum Init {
    /// Uniform in `[-0.5, 0.5)`.
    #[default]
    Random,
    /// Uniform in `[low, high)`; `low == high` is a constant fill.
    Range { low: f32, high: f32 },
    /// Xavier/Glorot uniform: `[-l, l)` with `l = sqrt(6 / (fan_in + fan_out))`.
    Glorot,
}

impl Init {
    pub fn validate(self) -> Result<()> {
        if let Init::Range { low, high } = self {
            if !(low.is_finite() && high.is_finite()) {
                return Err(Error::InvalidConfig(format!(
                    "init range bounds must be finite, got [{low}, {high})"
                )));
            }
            if low > high {
                return Err(Error::InvalidConfig(format!(
                    "init range low must be <= high, got [{low}, {high})"
                )));
            }
        }
        Ok(())
    }

    /// Sample a `rows x cols` matrix for a layer with the given fan-in/fan-out.
    pub fn sample<R: Rng + ?Sized>(
        self,
        rows: usize,
        cols: usize,
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Matrix {
        match self {
            Init::Random => Matrix::random(rows, cols, rng),
            Init::Range { low, high } => Matrix::random_range(rows, cols, low, high, rng),
            Init::Glorot => {
                let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                Matrix::random_range(rows, cols, -limit, limit, rng)
            }
        }
    }
}
