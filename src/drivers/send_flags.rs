const PRIORITY_MASK: u16 = 0x07;
const SEND_TWICE_BIT: u16 = 0x08;
const EXPECT_ANSWER_BIT: u16 = 0x10;

/// Options for a bus transaction.
///
/// Combining flags with `|` lets the right hand priority replace the left
/// hand one, while the boolean options accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(u16);

pub const PRIORITY_1: Flags = Flags::priority_flag(1);
pub const PRIORITY_2: Flags = Flags::priority_flag(2);
pub const PRIORITY_3: Flags = Flags::priority_flag(3);
pub const PRIORITY_4: Flags = Flags::priority_flag(4);
pub const PRIORITY_5: Flags = Flags::priority_flag(5);
pub const EXPECT_ANSWER: Flags = Flags(EXPECT_ANSWER_BIT);
pub const SEND_TWICE: Flags = Flags(SEND_TWICE_BIT);
pub const NO_FLAG: Flags = Flags(0);
pub const PRIORITY_DEFAULT: Flags = PRIORITY_5;

impl Flags {
    const fn priority_flag(p: u16) -> Flags {
        Flags(p & PRIORITY_MASK)
    }

    pub const fn send_twice(&self) -> bool {
        (self.0 & SEND_TWICE_BIT) != 0
    }

    pub const fn expect_answer(&self) -> bool {
        (self.0 & EXPECT_ANSWER_BIT) != 0
    }

    /// Priority 1..=5, 5 when not set
    pub fn priority(&self) -> u16 {
        let p = self.0 & PRIORITY_MASK;
        if (1..=5).contains(&p) {
            p
        } else {
            5
        }
    }
}

impl Default for Flags {
    fn default() -> Flags {
        NO_FLAG
    }
}

impl std::ops::BitOr<Flags> for Flags {
    type Output = Self;
    fn bitor(self, other: Flags) -> Self::Output {
        let mut bits = self.0 | (other.0 & !PRIORITY_MASK);
        if other.0 & PRIORITY_MASK != 0 {
            bits = (bits & !PRIORITY_MASK) | (other.0 & PRIORITY_MASK);
        }
        Flags(bits)
    }
}

impl std::ops::BitOrAssign<Flags> for Flags {
    fn bitor_assign(&mut self, other: Flags) {
        *self = *self | other;
    }
}
