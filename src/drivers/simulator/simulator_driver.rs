use crate::drivers::driver::{DaliDriver, DaliFrame, DaliSendResult, DriverInfo, DynFuture, OpenError};
use crate::drivers::send_flags::Flags;
use crate::drivers::simulator::gear::DaliSimGear;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, thiserror::Error)]
pub enum SimDriverError {
    #[error("Simulated bus is offline")]
    BusOffline,
    #[error("Simulator lock failed")]
    LockFailed,
    #[error("Only 16-bit frames are simulated")]
    UnsupportedFrame,
}

/// One completed bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub frame: DaliFrame,
    pub flags: Flags,
    /// Number of gears that answered
    pub answers: usize,
}

impl Transaction {
    pub fn frame16(&self) -> Option<[u8; 2]> {
        match self.frame {
            DaliFrame::Frame16(f) => Some(f),
            _ => None,
        }
    }
}

#[derive(Default)]
struct DaliSimBus {
    gears: Vec<DaliSimGear>,
    log: Vec<Transaction>,
    offline: bool,
}

impl DaliSimBus {
    fn transaction(&mut self, frame: DaliFrame, flags: Flags) -> DaliSendResult {
        if self.offline {
            return DaliSendResult::DriverError(Box::new(SimDriverError::BusOffline));
        }
        let DaliFrame::Frame16(data) = frame else {
            return DaliSendResult::DriverError(Box::new(SimDriverError::UnsupportedFrame));
        };
        let answers: Vec<u8> = self
            .gears
            .iter_mut()
            .filter_map(|g| g.forward16(data))
            .collect();
        self.log.push(Transaction {
            frame,
            flags,
            answers: answers.len(),
        });
        if !flags.expect_answer() {
            return DaliSendResult::Ok;
        }
        match answers[..] {
            [] => DaliSendResult::Timeout,
            [a] => DaliSendResult::Answer(a),
            _ => DaliSendResult::Framing,
        }
    }
}

/// Shared handle to a simulated bus. Any number of drivers can be
/// attached and the bus can be inspected from tests while in use.
#[derive(Clone, Default)]
pub struct DaliSimBusHandle(Arc<Mutex<DaliSimBus>>);

impl DaliSimBusHandle {
    pub fn new(gears: Vec<DaliSimGear>) -> DaliSimBusHandle {
        DaliSimBusHandle(Arc::new(Mutex::new(DaliSimBus {
            gears,
            ..Default::default()
        })))
    }

    pub fn driver(&self) -> DaliSimDriver {
        DaliSimDriver { bus: self.clone() }
    }

    fn with_bus<T>(&self, f: impl FnOnce(&mut DaliSimBus) -> T) -> Option<T> {
        self.0.lock().ok().map(|mut bus| f(&mut bus))
    }

    /// Current level of the gear with the given short address
    pub fn gear_level(&self, short: u8) -> Option<u8> {
        self.with_bus(|bus| {
            bus.gears
                .iter()
                .find(|g| g.short_address == short)
                .map(|g| g.actual_level)
        })
        .flatten()
    }

    /// Change a level behind the back of the bridge, like a wall switch would
    pub fn set_gear_level(&self, short: u8, level: u8) {
        self.with_bus(|bus| {
            for g in bus.gears.iter_mut().filter(|g| g.short_address == short) {
                g.actual_level = level;
            }
        });
    }

    pub fn set_offline(&self, offline: bool) {
        self.with_bus(|bus| bus.offline = offline);
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.with_bus(|bus| bus.log.clone()).unwrap_or_default()
    }

    /// Frames sent without expecting an answer
    pub fn commands(&self) -> Vec<[u8; 2]> {
        self.transactions()
            .iter()
            .filter(|t| !t.flags.expect_answer())
            .filter_map(Transaction::frame16)
            .collect()
    }

    /// Frames sent as queries
    pub fn queries(&self) -> Vec<[u8; 2]> {
        self.transactions()
            .iter()
            .filter(|t| t.flags.expect_answer())
            .filter_map(Transaction::frame16)
            .collect()
    }

    pub fn clear_log(&self) {
        self.with_bus(|bus| bus.log.clear());
    }
}

pub struct DaliSimDriver {
    bus: DaliSimBusHandle,
}

impl DaliDriver for DaliSimDriver {
    fn send_frame(&mut self, cmd: DaliFrame, flags: Flags) -> DynFuture<'_, DaliSendResult> {
        let result = self
            .bus
            .with_bus(|bus| bus.transaction(cmd, flags))
            .unwrap_or_else(|| DaliSendResult::DriverError(Box::new(SimDriverError::LockFailed)));
        Box::pin(async move {
            tokio::task::yield_now().await;
            result
        })
    }
}

fn driver_open(params: HashMap<String, String>) -> Result<Box<dyn DaliDriver>, OpenError> {
    let count = match params.get("count") {
        None => 4,
        Some(s) => match u8::from_str(s) {
            Ok(n) if n <= 64 => n,
            _ => {
                return Err(OpenError::ParameterError(
                    "count must be a number between 0 and 64".to_string(),
                ))
            }
        },
    };
    let gears = (0..count)
        .map(|a| DaliSimGear::new(a).groups(&[0]).scene(0, 0xfe).scene(1, 0x80))
        .collect();
    Ok(Box::new(DaliSimBusHandle::new(gears).driver()))
}

pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "SIMULATOR".to_string(),
        description: "Simulated bus with gears at the first count short addresses, all in group 0"
            .to_string(),
        open: driver_open,
    }
}
