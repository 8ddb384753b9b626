use crate::common::address::{Address, GroupAddress, Short};
use std::fmt;
use std::str::FromStr;

/// A light entity as seen from MQTT, either a single lamp or a group
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LightRef {
    Lamp(Short),
    Group(GroupAddress),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid light id \"{0}\"")]
pub struct ParseLightRefError(pub String);

impl From<LightRef> for Address {
    fn from(light: LightRef) -> Address {
        match light {
            LightRef::Lamp(s) => s.into(),
            LightRef::Group(g) => g.into(),
        }
    }
}

impl fmt::Display for LightRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LightRef::Lamp(s) => write!(f, "lamp_{}", s),
            LightRef::Group(g) => write!(f, "group_{}", g),
        }
    }
}

impl FromStr for LightRef {
    type Err = ParseLightRefError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLightRefError(s.to_string());
        let (kind, addr) = s.split_once('_').ok_or_else(err)?;
        match kind {
            "lamp" => Ok(LightRef::Lamp(addr.parse().map_err(|_| err())?)),
            "group" => Ok(LightRef::Group(addr.parse().map_err(|_| err())?)),
            _ => Err(err()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_test() {
        assert_eq!("lamp_3".parse(), Ok(LightRef::Lamp(Short::new(3))));
        assert_eq!("group_15".parse(), Ok(LightRef::Group(GroupAddress::new(15))));
        assert!("group_16".parse::<LightRef>().is_err());
        assert!("lamp_64".parse::<LightRef>().is_err());
        assert!("lamp".parse::<LightRef>().is_err());
        assert!("bulb_1".parse::<LightRef>().is_err());
        assert!("lamp_x".parse::<LightRef>().is_err());
        assert_eq!(LightRef::Group(GroupAddress::new(2)).to_string(), "group_2");
    }
}
