pub mod gear;
pub mod simulator_driver;

pub use gear::DaliSimGear;
pub use simulator_driver::{driver_info, DaliSimBusHandle, DaliSimDriver, Transaction};
