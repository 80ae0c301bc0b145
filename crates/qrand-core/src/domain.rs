use std::fmt::{Display, Formatter};
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Largest count a single run may request.
pub const MAX_REQUESTED_COUNT: u32 = 65_536;

/// Number of random integers requested from a source.
///
/// Validated once when the run starts and passed unchanged to every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestedCount(NonZeroU32);

impl RequestedCount {
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        Self::from_i64(i64::from(value))
    }

    /// Parse a base-10 integer string, rejecting anything that is not a
    /// positive integer within [`MAX_REQUESTED_COUNT`].
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingCount);
        }

        let value = trimmed
            .parse::<i64>()
            .map_err(|_| ValidationError::CountNotNumeric {
                value: trimmed.to_owned(),
            })?;
        Self::from_i64(value)
    }

    fn from_i64(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::CountNotPositive { value });
        }
        if value > i64::from(MAX_REQUESTED_COUNT) {
            return Err(ValidationError::CountTooLarge {
                value,
                max: MAX_REQUESTED_COUNT,
            });
        }

        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(ValidationError::CountNotPositive { value })
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Display for RequestedCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestedCount {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}
