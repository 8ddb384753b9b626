// Answer meaning "no value", e.g. a scene the gear is not part of
pub const MASK: u8 = 0xff;

// Answer to a YES/NO query
pub const YES: u8 = 0xff;
