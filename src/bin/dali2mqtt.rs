use clap::Parser;
use dali2mqtt::bridge::Bridge;
use dali2mqtt::config::CmdArgs;
use dali2mqtt::drivers;
use dali2mqtt::drivers::driver::OpenError;
use dali2mqtt::light::bus::DaliBus;
use dali2mqtt::mqtt::client;
use dali2mqtt::names::DeviceNames;
use log::{error, info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CmdArgs::parse();
    let settings = match args.settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    // Checked by settings()
    let (Ok(max_level), Ok(config)) = (settings.log_filter(), settings.bridge_config()) else {
        return ExitCode::FAILURE;
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_ansi(settings.log_color)
        .init();

    if let Err(e) = drivers::init() {
        error!("Failed to initialize DALI drivers: {}", e);
    }
    let driver = match drivers::open(&settings.dali_driver) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to open DALI device: {}", e);
            if let OpenError::NotFound = e {
                println!("Available drivers:");
                for name in drivers::driver_names() {
                    println!("  {}", name);
                }
            }
            return ExitCode::FAILURE;
        }
    };
    info!("Opened DALI driver {}", settings.dali_driver);

    let names = match DeviceNames::load(&settings.devices_names).await {
        Ok(n) => n,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let bridge = Bridge::new(DaliBus::new(driver), config);
    if let Err(e) = client::run(&settings, bridge, names).await {
        error!("{}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
