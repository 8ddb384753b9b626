/// First byte of a forward frame, as it appears on the bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AddressByte(pub u8);
