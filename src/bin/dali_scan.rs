use clap::Parser;
use dali2mqtt::config::BridgeConfig;
use dali2mqtt::drivers;
use dali2mqtt::drivers::driver::OpenError;
use dali2mqtt::light::bus::DaliBus;
use dali2mqtt::light::group::GroupMode;
use dali2mqtt::light::scanner;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(about = "Scan a DALI bus and list lamps and groups")]
struct CmdArgs {
    /// Select DALI-device
    #[arg(short = 'd', long, default_value = "default")]
    device: String,
    /// Stop after this many lamps
    #[arg(short = 'n', long, default_value_t = 64, value_parser = clap::value_parser!(u8).range(1..=64))]
    lamps: u8,
    /// mean, max, min or off
    #[arg(short = 'g', long, default_value_t = GroupMode::Mean)]
    group_mode: GroupMode,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = CmdArgs::parse();
    if let Err(e) = drivers::init() {
        println!("Failed to initialize DALI drivers: {}", e);
    }
    let driver = match drivers::open(&args.device) {
        Ok(d) => d,
        Err(e) => {
            println!("Failed to open DALI device: {}", e);
            if let OpenError::NotFound = e {
                println!("Available drivers:");
                for name in drivers::driver_names() {
                    println!("  {}", name);
                }
            }
            return ExitCode::FAILURE;
        }
    };
    let config = BridgeConfig {
        max_lamps: args.lamps as usize,
        group_mode: args.group_mode,
    };
    let mut bus = DaliBus::new(driver);
    let registry = scanner::build_registry(&mut bus, &config).await;
    for lamp in registry.lamps() {
        let range = lamp.range();
        let scenes: Vec<u8> = lamp.supported_scenes().collect();
        println!(
            "{}: level {} (physical {}-{}, minimum {}), groups {:?}, scenes {:?}",
            lamp.light_ref(),
            lamp.level(),
            range.min_level,
            range.max_level,
            range.min_physical,
            lamp.groups().iter().map(|g| g.value()).collect::<Vec<_>>(),
            scenes
        );
    }
    for group in registry.groups() {
        println!(
            "{}: level {} ({}), lamps {:?}, scenes {:?}",
            group.light_ref(),
            group.level(),
            group.mode(),
            group.lamps().iter().map(|a| a.value()).collect::<Vec<_>>(),
            group.scenes()
        );
    }
    ExitCode::SUCCESS
}
