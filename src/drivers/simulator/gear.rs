use crate::common::address::Address;
use crate::common::defs::{MASK, YES};
use crate::gear::cmd_defs as cmd;

/// Simulated control gear. Level changes take effect immediately, there
/// is no fading.
#[derive(Debug, Clone)]
pub struct DaliSimGear {
    pub short_address: u8,
    pub actual_level: u8,
    pub min_level: u8,
    pub max_level: u8,
    pub physical_min: u8,
    pub gear_groups: u16,
    pub scene: [u8; 16],
    /// Answer nothing but the presence query
    pub faulty: bool,
}

impl DaliSimGear {
    pub fn new(short_address: u8) -> DaliSimGear {
        DaliSimGear {
            short_address,
            actual_level: 0,
            min_level: 1,
            max_level: 0xfe,
            physical_min: 1,
            gear_groups: 0,
            scene: [MASK; 16],
            faulty: false,
        }
    }

    pub fn groups(mut self, groups: &[u8]) -> Self {
        for g in groups {
            self.gear_groups |= 1 << (g & 0x0f);
        }
        self
    }

    pub fn scene(mut self, index: u8, level: u8) -> Self {
        self.scene[(index & 0x0f) as usize] = level;
        self
    }

    pub fn limits(mut self, min_level: u8, max_level: u8) -> Self {
        self.min_level = min_level;
        self.max_level = max_level;
        self.physical_min = self.physical_min.min(min_level);
        self
    }

    pub fn level(mut self, level: u8) -> Self {
        self.actual_level = level;
        self
    }

    pub fn faulty(mut self) -> Self {
        self.faulty = true;
        self
    }

    fn clamp_level(&self, level: u8) -> u8 {
        if level == 0 {
            0
        } else {
            level.clamp(self.min_level, self.max_level)
        }
    }

    fn addressed(&self, addr: u8) -> bool {
        match Address::from_bus_address(addr) {
            Ok(Address::Short(s)) => s.value() == self.short_address,
            Ok(Address::Group(g)) => self.gear_groups & (1 << g.value()) != 0,
            Ok(Address::Broadcast) => true,
            Err(_) => false,
        }
    }

    /// Handle a 16-bit forward frame. Returns the backward frame, if any.
    pub fn forward16(&mut self, frame: [u8; 2]) -> Option<u8> {
        if !self.addressed(frame[0]) {
            return None;
        }
        if frame[0] & 0x01 == 0 {
            if frame[1] != MASK {
                self.actual_level = self.clamp_level(frame[1]);
            }
            return None;
        }
        device_cmd(self, frame[1])
    }
}

fn device_cmd(dev: &mut DaliSimGear, opcode: u8) -> Option<u8> {
    if opcode == cmd::OPCODE_QUERY_CONTROL_GEAR_PRESENT {
        return Some(YES);
    }
    if dev.faulty {
        return None;
    }
    match opcode {
        cmd::OPCODE_OFF => {
            dev.actual_level = 0;
            None
        }
        cmd::OPCODE_RECALL_MAX_LEVEL => {
            dev.actual_level = dev.max_level;
            None
        }
        cmd::OPCODE_RECALL_MIN_LEVEL => {
            dev.actual_level = dev.min_level;
            None
        }
        0x10..=0x1f => {
            let level = dev.scene[(opcode & 0x0f) as usize];
            if level != MASK {
                dev.actual_level = dev.clamp_level(level);
            }
            None
        }
        cmd::OPCODE_QUERY_PHYSICAL_MINIMUM => Some(dev.physical_min),
        cmd::OPCODE_QUERY_ACTUAL_LEVEL => Some(dev.actual_level),
        cmd::OPCODE_QUERY_MAX_LEVEL => Some(dev.max_level),
        cmd::OPCODE_QUERY_MIN_LEVEL => Some(dev.min_level),
        0xb0..=0xbf => Some(dev.scene[(opcode & 0x0f) as usize]),
        cmd::OPCODE_QUERY_GROUPS_0_7 => Some((dev.gear_groups & 0xff) as u8),
        cmd::OPCODE_QUERY_GROUPS_8_15 => Some((dev.gear_groups >> 8) as u8),
        _ => None,
    }
}
