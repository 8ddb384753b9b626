use super::cmd_defs::AddressByte;
use core::str::FromStr;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid address")]
    InvalidAddress,
}

/// Short address of a single gear, 0..=63
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Short(u8);

impl Short {
    pub const COUNT: u8 = 64;

    pub fn new(a: u8) -> Short {
        assert!(a < Self::COUNT);
        Short(a)
    }

    pub fn try_new(a: u8) -> Result<Short, AddressError> {
        if a < Self::COUNT {
            Ok(Short(a))
        } else {
            Err(AddressError::InvalidAddress)
        }
    }

    /// All short addresses in ascending order
    pub fn all() -> impl Iterator<Item = Short> {
        (0..Self::COUNT).map(Short)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<Short> for AddressByte {
    fn from(short: Short) -> Self {
        AddressByte((short.0 << 1) | 1)
    }
}

impl fmt::Display for Short {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

impl FromStr for Short {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u8::from_str(s).map_or(Err(AddressError::InvalidAddress), Self::try_new)
    }
}

/// Group address, 0..=15
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupAddress(u8);

impl GroupAddress {
    pub const COUNT: u8 = 16;

    pub fn new(a: u8) -> GroupAddress {
        assert!(a < Self::COUNT);
        GroupAddress(a)
    }

    pub fn try_new(a: u8) -> Result<GroupAddress, AddressError> {
        if a < Self::COUNT {
            Ok(GroupAddress(a))
        } else {
            Err(AddressError::InvalidAddress)
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<GroupAddress> for AddressByte {
    fn from(group: GroupAddress) -> AddressByte {
        AddressByte((group.0 << 1) | 0x81)
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

impl FromStr for GroupAddress {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u8::from_str(s).map_or(Err(AddressError::InvalidAddress), Self::try_new)
    }
}

/// Target of a forward frame
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Address {
    Short(Short),
    Group(GroupAddress),
    Broadcast,
}

impl Address {
    /// Decode the address part of the first byte of a forward frame.
    /// Special commands have no address and are rejected.
    pub fn from_bus_address(bus: u8) -> Result<Address, AddressError> {
        match bus >> 1 {
            a @ 0x00..=0x3f => Ok(Address::Short(Short(a))),
            a @ 0x40..=0x4f => Ok(Address::Group(GroupAddress(a & 0x0f))),
            0x7f => Ok(Address::Broadcast),
            _ => Err(AddressError::InvalidAddress),
        }
    }
}

impl From<Short> for Address {
    fn from(short: Short) -> Address {
        Address::Short(short)
    }
}

impl From<GroupAddress> for Address {
    fn from(group: GroupAddress) -> Address {
        Address::Group(group)
    }
}

impl From<Address> for AddressByte {
    fn from(addr: Address) -> AddressByte {
        match addr {
            Address::Short(s) => s.into(),
            Address::Group(g) => g.into(),
            Address::Broadcast => AddressByte(0xff),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Short(s) => write!(fmt, "A{}", s),
            Address::Group(g) => write!(fmt, "G{}", g),
            Address::Broadcast => fmt.write_str("broadcast"),
        }
    }
}
