use super::driver::{DaliDriver, DaliFrame, DaliSendResult, DynFuture};
use super::send_flags::Flags;
use crate::drivers::send_flags::{EXPECT_ANSWER, NO_FLAG, SEND_TWICE};

pub mod send16 {
    use super::*;
    use crate::common::address::Address;
    use crate::gear::cmd_defs as cmd;
    use crate::gear::cmd_defs::Command;

    /// Send DALI commands
    ///
    /// # Arguments
    /// * `cmd` - DALI command
    /// * `flags` - Options for transaction
    pub fn cmd<'driver, const T: bool>(
        driver: &'driver mut dyn DaliDriver,
        cmd: Command<false, T>,
        flags: Flags,
    ) -> DynFuture<'driver, DaliSendResult> {
        driver.send_frame(
            DaliFrame::Frame16(cmd.0),
            flags | if T { SEND_TWICE } else { NO_FLAG },
        )
    }

    /// Make DALI query
    ///
    /// # Arguments
    /// * `cmd` - DALI query
    /// * `flags` - Options for transaction
    pub fn query<'driver>(
        driver: &'driver mut dyn DaliDriver,
        cmd: Command<true, false>,
        flags: Flags,
    ) -> DynFuture<'driver, DaliSendResult> {
        driver.send_frame(DaliFrame::Frame16(cmd.0), flags | EXPECT_ANSWER)
    }

    /// Send DALI DAPC commands
    ///
    /// # Arguments
    /// * `addr` - Address of device(s)
    /// * `level` - Physical level
    /// * `flags` - Options for transaction
    pub fn device_level<'driver>(
        driver: &'driver mut dyn DaliDriver,
        addr: Address,
        level: u8,
        flags: Flags,
    ) -> DynFuture<'driver, DaliSendResult> {
        driver.send_frame(DaliFrame::Frame16(cmd::DAPC(addr, level).0), flags)
    }
}
