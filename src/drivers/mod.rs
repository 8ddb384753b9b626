pub mod driver;
pub mod driver_init;
pub use driver::driver_names;
pub use driver::open;
pub use driver_init::init;

pub mod command_utils;
pub mod send_flags;

pub mod dummy {
    pub mod dummy;
}

#[cfg(feature = "simulator")]
pub mod simulator;

#[cfg(feature = "dali_rpi_driver")]
pub mod dali_rpi {
    pub mod dali_rpi;
}
