use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Room,
    Service,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Room => "room",
            BookingType::Service => "service",
        }
    }
}

impl Display for BookingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "room" => Ok(BookingType::Room),
            "service" => Ok(BookingType::Service),
            other => Err(format!("Unsupported booking type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_values_exactly() {
        assert_eq!("room".parse::<BookingType>(), Ok(BookingType::Room));
        assert_eq!("service".parse::<BookingType>(), Ok(BookingType::Service));
        assert!("Room".parse::<BookingType>().is_err());
    }
}
