use crate::drivers;
#[cfg(feature = "dali_rpi_driver")]
use drivers::dali_rpi::dali_rpi;
use drivers::driver::add_driver;
use drivers::dummy::dummy;
#[cfg(feature = "simulator")]
use drivers::simulator;

/// Register the drivers compiled into the crate. The first one registered
/// is used when the driver name `default` is given.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "dali_rpi_driver")]
    add_driver(dali_rpi::driver_info());
    #[cfg(feature = "simulator")]
    add_driver(simulator::driver_info());
    add_driver(dummy::driver_info());
    Ok(())
}
