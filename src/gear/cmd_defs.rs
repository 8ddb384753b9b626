//! 16-bit forward frames for control gear (IEC 62386-102).
//!
//! Only the commands the bridge uses are defined. The const parameters
//! of [`Command`] tell whether the gear answers and whether the command
//! must be sent twice.
use crate::common::cmd_defs::AddressByte;

pub struct Command<const ANSWER: bool, const TWICE: bool>(pub [u8; 2]);

macro_rules! cmd_type {
    () => {Command<false,false>};
    (Answer) => {Command<true,false>};
}

macro_rules! dev_cmd_def {
    ($sym: ident, $opcode: expr $(,$attr: ident)?) => {
        #[allow(non_snake_case)]
        #[inline(always)]
        pub fn $sym<A>(addr: A) -> cmd_type!($($attr)?)
        where
            A: Into<AddressByte>,
        {
            Command([addr.into().0, $opcode])
        }
    };
}

macro_rules! offset_cmd_def {
    ($sym: ident, $opcode: expr $(,$attr: ident)?) => {
        #[allow(non_snake_case)]
        #[inline(always)]
        pub fn $sym<A>(addr: A, offset: u8) -> cmd_type!($($attr)?)
        where
            A: Into<AddressByte>,
        {
            Command([addr.into().0, $opcode + (offset & 0x0f)])
        }
    };
}

pub const OPCODE_OFF: u8 = 0x00;
pub const OPCODE_RECALL_MAX_LEVEL: u8 = 0x05;
pub const OPCODE_RECALL_MIN_LEVEL: u8 = 0x06;
pub const OPCODE_GOTO_SCENE: u8 = 0x10;
pub const OPCODE_QUERY_CONTROL_GEAR_PRESENT: u8 = 0x91;
pub const OPCODE_QUERY_PHYSICAL_MINIMUM: u8 = 0x9a;
pub const OPCODE_QUERY_ACTUAL_LEVEL: u8 = 0xa0;
pub const OPCODE_QUERY_MAX_LEVEL: u8 = 0xa1;
pub const OPCODE_QUERY_MIN_LEVEL: u8 = 0xa2;
pub const OPCODE_QUERY_SCENE_LEVEL: u8 = 0xb0;
pub const OPCODE_QUERY_GROUPS_0_7: u8 = 0xc0;
pub const OPCODE_QUERY_GROUPS_8_15: u8 = 0xc1;

/// Direct arc power control. The selector bit is cleared.
#[allow(non_snake_case)]
#[inline(always)]
pub fn DAPC<A>(addr: A, level: u8) -> Command<false, false>
where
    A: Into<AddressByte>,
{
    Command([addr.into().0 & 0xfe, level])
}

dev_cmd_def!(OFF, OPCODE_OFF);
dev_cmd_def!(RECALL_MAX_LEVEL, OPCODE_RECALL_MAX_LEVEL);
dev_cmd_def!(RECALL_MIN_LEVEL, OPCODE_RECALL_MIN_LEVEL);

offset_cmd_def!(GOTO_SCENE, OPCODE_GOTO_SCENE);

dev_cmd_def!(QUERY_CONTROL_GEAR_PRESENT, OPCODE_QUERY_CONTROL_GEAR_PRESENT, Answer);
dev_cmd_def!(QUERY_PHYSICAL_MINIMUM, OPCODE_QUERY_PHYSICAL_MINIMUM, Answer);
dev_cmd_def!(QUERY_ACTUAL_LEVEL, OPCODE_QUERY_ACTUAL_LEVEL, Answer);
dev_cmd_def!(QUERY_MAX_LEVEL, OPCODE_QUERY_MAX_LEVEL, Answer);
dev_cmd_def!(QUERY_MIN_LEVEL, OPCODE_QUERY_MIN_LEVEL, Answer);

offset_cmd_def!(QUERY_SCENE_LEVEL, OPCODE_QUERY_SCENE_LEVEL, Answer);

dev_cmd_def!(QUERY_GROUPS_0_7, OPCODE_QUERY_GROUPS_0_7, Answer);
dev_cmd_def!(QUERY_GROUPS_8_15, OPCODE_QUERY_GROUPS_8_15, Answer);
