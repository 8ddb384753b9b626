//! Bus gateway used by the device model.
//!
//! Every method is one request/response transaction on the driver,
//! except [`DaliBus::flash`] which runs a timed sequence.
use crate::common::address::{Address, Short};
use crate::common::defs::MASK;
use crate::drivers::command_utils::send16;
use crate::drivers::driver::{DaliDriver, DaliSendResult};
use crate::drivers::send_flags::{Flags, PRIORITY_DEFAULT};
use crate::gear::cmd_defs as cmd;
use crate::gear::cmd_defs::Command;
use log::{debug, warn};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("No answer from {0}")]
    NoAnswer(Address),
    #[error("Several gears answered at {0}")]
    Framing(Address),
    #[error("Driver error: {0}")]
    Driver(Box<dyn std::error::Error + Send + Sync>),
}

impl BusError {
    fn from_result(addr: Address, res: DaliSendResult) -> BusError {
        match res {
            DaliSendResult::Framing => BusError::Framing(addr),
            DaliSendResult::DriverError(e) => BusError::Driver(e),
            // A command sent as a query or vice versa is a bug in this
            // module, report it as missing answer
            DaliSendResult::Timeout | DaliSendResult::Ok | DaliSendResult::Answer(_) => {
                BusError::NoAnswer(addr)
            }
        }
    }
}

pub struct DaliBus {
    driver: Box<dyn DaliDriver>,
    flags: Flags,
}

impl DaliBus {
    pub fn new(driver: Box<dyn DaliDriver>) -> DaliBus {
        DaliBus {
            driver,
            flags: PRIORITY_DEFAULT,
        }
    }

    async fn query(&mut self, addr: Address, query: Command<true, false>) -> Result<u8, BusError> {
        send16::query(self.driver.as_mut(), query, self.flags)
            .await
            .check_answer()
            .map_err(|e| BusError::from_result(addr, e))
    }

    async fn command<const T: bool>(
        &mut self,
        addr: Address,
        command: Command<false, T>,
    ) -> Result<(), BusError> {
        send16::cmd(self.driver.as_mut(), command, self.flags)
            .await
            .check_send()
            .map_err(|e| BusError::from_result(addr, e))
    }

    /// True if a gear answered at `addr`. Several gears sharing the
    /// address also counts as present.
    pub async fn presence_query(&mut self, addr: Short) -> Result<bool, BusError> {
        match self.query(addr.into(), cmd::QUERY_CONTROL_GEAR_PRESENT(addr)).await {
            Ok(_) => Ok(true),
            Err(BusError::NoAnswer(_)) => Ok(false),
            Err(BusError::Framing(a)) => {
                warn!("Multiple gears answered at {}", a);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Group membership bitmasks for groups 0-7 and 8-15
    pub async fn query_group_membership(&mut self, addr: Short) -> Result<(u8, u8), BusError> {
        let low = self.query(addr.into(), cmd::QUERY_GROUPS_0_7(addr)).await?;
        let high = self.query(addr.into(), cmd::QUERY_GROUPS_8_15(addr)).await?;
        Ok((low, high))
    }

    /// Physical level stored for a scene, `MASK` if none is
    pub async fn query_scene_level(&mut self, addr: Short, index: u8) -> Result<u8, BusError> {
        match self.query(addr.into(), cmd::QUERY_SCENE_LEVEL(addr, index)).await {
            Err(BusError::NoAnswer(_)) => Ok(MASK),
            r => r,
        }
    }

    pub async fn query_physical_minimum(&mut self, addr: Short) -> Result<u8, BusError> {
        self.query(addr.into(), cmd::QUERY_PHYSICAL_MINIMUM(addr)).await
    }

    pub async fn query_min_level(&mut self, addr: Short) -> Result<u8, BusError> {
        self.query(addr.into(), cmd::QUERY_MIN_LEVEL(addr)).await
    }

    pub async fn query_max_level(&mut self, addr: Short) -> Result<u8, BusError> {
        self.query(addr.into(), cmd::QUERY_MAX_LEVEL(addr)).await
    }

    pub async fn query_actual_level(&mut self, addr: Short) -> Result<u8, BusError> {
        self.query(addr.into(), cmd::QUERY_ACTUAL_LEVEL(addr)).await
    }

    pub async fn send_direct_level(&mut self, target: Address, physical: u8) -> Result<(), BusError> {
        debug!("DAPC {} {}", target, physical);
        send16::device_level(self.driver.as_mut(), target, physical, self.flags)
            .await
            .check_send()
            .map_err(|e| BusError::from_result(target, e))
    }

    pub async fn send_go_to_scene(&mut self, target: Address, index: u8) -> Result<(), BusError> {
        debug!("GO TO SCENE {} {}", target, index);
        self.command(target, cmd::GOTO_SCENE(target, index)).await
    }

    pub async fn send_recall_max_level(&mut self, target: Address) -> Result<(), BusError> {
        self.command(target, cmd::RECALL_MAX_LEVEL(target)).await
    }

    pub async fn send_recall_min_level(&mut self, target: Address) -> Result<(), BusError> {
        self.command(target, cmd::RECALL_MIN_LEVEL(target)).await
    }

    /// Alternate between max and min level `count` times, then go to
    /// the physical level `restore`.
    pub async fn flash(
        &mut self,
        target: Address,
        count: u32,
        interval: Duration,
        restore: u8,
    ) -> Result<(), BusError> {
        for _ in 0..count {
            self.send_recall_max_level(target).await?;
            tokio::time::sleep(interval).await;
            self.send_recall_min_level(target).await?;
            tokio::time::sleep(interval).await;
        }
        self.send_direct_level(target, restore).await
    }
}
