use serde::{Deserialize, Serialize};

/// Horizontal walk direction as it appears on the wire: `-1` or `+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Sign used when integrating movement.
    pub fn sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Direction toward a target x, seen from `from`.
    pub fn toward(from: f64, to: f64) -> Self {
        if to < from {
            Self::Left
        } else {
            Self::Right
        }
    }
}

impl From<Direction> for i8 {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

pub struct InvalidDirection;

impl std::fmt::Display for InvalidDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("direction must be -1 or 1")
    }
}

impl TryFrom<i8> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Left),
            1 => Ok(Self::Right),
            _ => Err(InvalidDirection),
        }
    }
}

/// Sprite facing, `"left"` / `"right"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    Right,
}

impl From<Direction> for Facing {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Left => Self::Left,
            Direction::Right => Self::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_wire_values() {
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "-1");
        assert_eq!(
            serde_json::from_str::<Direction>("1").unwrap(),
            Direction::Right
        );
        assert!(serde_json::from_str::<Direction>("0").is_err());
    }

    #[test]
    fn toward_prefers_right_on_equal_x() {
        assert_eq!(Direction::toward(10.0, 10.0), Direction::Right);
        assert_eq!(Direction::toward(10.0, 3.0), Direction::Left);
    }

    #[test]
    fn facing_is_lowercase() {
        assert_eq!(serde_json::to_string(&Facing::Left).unwrap(), "\"left\"");
    }
}
