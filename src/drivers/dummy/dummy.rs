use crate::drivers;
use drivers::driver::{DaliDriver, DaliFrame, DaliSendResult, DriverInfo, DynFuture, OpenError};
use drivers::send_flags::Flags;
use std::collections::HashMap;
use std::time::Duration;

pub struct DummyDriver;
impl DaliDriver for DummyDriver {
    fn send_frame(&mut self, _cmd: DaliFrame, flags: Flags) -> DynFuture<'_, DaliSendResult> {
        Box::pin(async move {
            if flags.send_twice() {
                tokio::time::sleep(Duration::from_millis(19)).await;
                DaliSendResult::Ok
            } else if flags.expect_answer() {
                tokio::time::sleep(Duration::from_millis(11)).await;
                DaliSendResult::Timeout
            } else {
                tokio::time::sleep(Duration::from_millis(9)).await;
                DaliSendResult::Ok
            }
        })
    }
}

fn driver_open(_params: HashMap<String, String>) -> Result<Box<dyn DaliDriver>, OpenError> {
    Ok(Box::new(DummyDriver))
}
pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "DUMMY".to_string(),
        description: "Dummy driver. Emulates an empty bus.".to_string(),
        open: driver_open,
    }
}
