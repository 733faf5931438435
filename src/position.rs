use crate::error::PositionError;
use crate::types::Position;
use std::str::FromStr;

/// Where the user currently is. The store never calls this; the caller asks
/// for a fix and passes the position to `create_workout`.
pub trait PositionProvider {
    fn current_position(&self) -> Result<Position, PositionError>;
}

/// A provider with a configured answer: a fixed fix, no fix at all, or a
/// user who refused to share their location.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum FixedPosition {
    Known(Position),
    #[default]
    Unknown,
    Denied,
}

impl FixedPosition {
    pub const fn new(position: Option<Position>) -> Self {
        match position {
            Some(p) => Self::Known(p),
            None => Self::Unknown,
        }
    }

    pub const fn denied() -> Self {
        Self::Denied
    }
}

impl PositionProvider for FixedPosition {
    fn current_position(&self) -> Result<Position, PositionError> {
        match *self {
            Self::Known(p) => Ok(p),
            Self::Unknown => Err(PositionError::Unavailable),
            Self::Denied => Err(PositionError::Denied),
        }
    }
}

/// Parses `"lat,lon"`, e.g. `"76,-23"` or `"48.85, 2.35"`.
impl FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: &str| PositionError::Parse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| parse_err("expected LAT,LON"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| parse_err("latitude is not a number"))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| parse_err("longitude is not a number"))?;

        if !lat.is_finite() || !lon.is_finite() {
            return Err(parse_err("coordinates must be finite"));
        }

        Ok(Self::new(lat, lon))
    }
}
