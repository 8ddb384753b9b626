//! Event processing between the outside world and the device model.
use crate::config::BridgeConfig;
use crate::light::bus::DaliBus;
use crate::light::error::DeviceError;
use crate::light::light_ref::LightRef;
use crate::light::registry::DeviceRegistry;
use crate::light::scanner;
use crate::light::state::{StatePublisher, StateUpdate};
use log::{info, warn};
use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LevelCommand {
    Off,
    /// Logical level
    Level(u8),
}

impl LevelCommand {
    pub fn level(&self) -> u8 {
        match self {
            LevelCommand::Off => 0,
            LevelCommand::Level(l) => *l,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SceneSelect {
    None,
    Scene(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command {
        light: LightRef,
        command: LevelCommand,
    },
    Flash {
        light: LightRef,
        count: u32,
        interval: Duration,
    },
    SceneSelect {
        light: LightRef,
        scene: SceneSelect,
    },
    Rescan,
    PollTick,
}

pub struct Bridge {
    bus: DaliBus,
    registry: DeviceRegistry,
    config: BridgeConfig,
}

impl Bridge {
    /// The registry starts out empty, call [`Bridge::on_rescan`] to fill it.
    pub fn new(bus: DaliBus, config: BridgeConfig) -> Bridge {
        Bridge {
            bus,
            registry: DeviceRegistry::new(),
            config,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn check_light(&self, light: LightRef) -> Result<(), DeviceError> {
        if self.registry.contains(light) {
            Ok(())
        } else {
            Err(DeviceError::UnknownLight(light))
        }
    }

    pub async fn on_command(
        &mut self,
        light: LightRef,
        command: LevelCommand,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        self.check_light(light)?;
        let level = command.level();
        match light {
            LightRef::Lamp(a) => {
                self.registry
                    .set_lamp_level(&mut self.bus, a, level, out)
                    .await
            }
            LightRef::Group(g) => {
                self.registry
                    .set_group_level(&mut self.bus, g, level, out)
                    .await
            }
        }
    }

    pub async fn on_flash(
        &mut self,
        light: LightRef,
        count: u32,
        interval: Duration,
    ) -> Result<(), DeviceError> {
        self.check_light(light)?;
        match light {
            LightRef::Lamp(a) => {
                self.registry
                    .flash_lamp(&mut self.bus, a, count, interval)
                    .await
            }
            LightRef::Group(g) => {
                self.registry
                    .flash_group(&mut self.bus, g, count, interval)
                    .await
            }
        }
    }

    pub async fn on_scene_select(
        &mut self,
        light: LightRef,
        scene: SceneSelect,
        out: &mut dyn StatePublisher,
    ) -> Result<(), DeviceError> {
        self.check_light(light)?;
        match (light, scene) {
            (_, SceneSelect::None) => self.registry.clear_scene(light, out),
            (LightRef::Lamp(a), SceneSelect::Scene(s)) => {
                self.registry
                    .set_lamp_scene(&mut self.bus, a, s, out)
                    .await
            }
            (LightRef::Group(g), SceneSelect::Scene(s)) => {
                self.registry
                    .set_group_scene(&mut self.bus, g, s, out)
                    .await
            }
        }
    }

    /// Replace the registry with a fresh scan of the bus. The bridge is
    /// reported unavailable while scanning.
    pub async fn on_rescan(&mut self, out: &mut dyn StatePublisher) {
        out.publish(StateUpdate::Availability(false));
        info!("Scanning DALI bus");
        self.registry = scanner::build_registry(&mut self.bus, &self.config).await;
        self.registry.publish_all(out);
        out.publish(StateUpdate::Availability(true));
    }

    pub async fn on_poll_tick(&mut self, out: &mut dyn StatePublisher) {
        self.registry.poll_all(&mut self.bus, out).await;
    }

    /// Process one event to completion. Failures are logged.
    pub async fn dispatch(&mut self, event: Event, out: &mut dyn StatePublisher) {
        let res = match event {
            Event::Command { light, command } => self.on_command(light, command, out).await,
            Event::Flash {
                light,
                count,
                interval,
            } => self.on_flash(light, count, interval).await,
            Event::SceneSelect { light, scene } => self.on_scene_select(light, scene, out).await,
            Event::Rescan => {
                self.on_rescan(out).await;
                Ok(())
            }
            Event::PollTick => {
                self.on_poll_tick(out).await;
                Ok(())
            }
        };
        if let Err(e) = res {
            warn!("Failed to handle event: {}", e);
        }
    }
}

#[cfg(all(test, feature = "simulator"))]
mod test {
    use super::*;
    use crate::common::address::{GroupAddress, Short};
    use crate::drivers::simulator::{DaliSimBusHandle, DaliSimGear};

    fn bridge(gears: Vec<DaliSimGear>) -> (DaliSimBusHandle, Bridge) {
        let sim = DaliSimBusHandle::new(gears);
        let bus = DaliBus::new(Box::new(sim.driver()));
        (sim, Bridge::new(bus, BridgeConfig::default()))
    }

    #[tokio::test]
    async fn rescan_test() {
        let (_sim, mut bridge) = bridge(vec![
            DaliSimGear::new(2).groups(&[1]).level(254),
            DaliSimGear::new(5).groups(&[1]),
        ]);
        let mut out = Vec::new();
        bridge.on_rescan(&mut out).await;
        assert_eq!(out.first(), Some(&StateUpdate::Availability(false)));
        assert_eq!(out.last(), Some(&StateUpdate::Availability(true)));
        let lamp = LightRef::Lamp(Short::new(2));
        assert!(out.contains(&StateUpdate::Brightness {
            light: lamp,
            level: 255
        }));
        assert!(out.contains(&StateUpdate::Scene {
            light: lamp,
            scene: None
        }));
        let group = LightRef::Group(GroupAddress::new(1));
        assert!(out.contains(&StateUpdate::Power {
            light: group,
            on: true
        }));
        assert_eq!(bridge.registry().lamps().count(), 2);
    }

    #[tokio::test]
    async fn unknown_light_test() {
        let (sim, mut bridge) = bridge(vec![DaliSimGear::new(0)]);
        let mut out = Vec::new();
        bridge.on_rescan(&mut out).await;
        sim.clear_log();
        out.clear();
        let res = bridge
            .on_command(
                LightRef::Lamp(Short::new(9)),
                LevelCommand::Level(10),
                &mut out,
            )
            .await;
        assert!(matches!(res, Err(DeviceError::UnknownLight(_))));
        let res = bridge
            .on_flash(
                LightRef::Group(GroupAddress::new(3)),
                2,
                Duration::from_millis(10),
            )
            .await;
        assert!(matches!(res, Err(DeviceError::UnknownLight(_))));
        assert!(sim.transactions().is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn command_test() {
        let (sim, mut bridge) = bridge(vec![DaliSimGear::new(4).level(254)]);
        let mut out = Vec::new();
        bridge.on_rescan(&mut out).await;
        out.clear();
        let light = LightRef::Lamp(Short::new(4));
        bridge
            .dispatch(
                Event::Command {
                    light,
                    command: LevelCommand::Off,
                },
                &mut out,
            )
            .await;
        assert_eq!(sim.gear_level(4), Some(0));
        assert_eq!(
            out,
            vec![
                StateUpdate::Brightness { light, level: 0 },
                StateUpdate::Power { light, on: false }
            ]
        );
        assert_eq!(bridge.registry().lamp(Short::new(4)).unwrap().level(), 0);
    }

    #[tokio::test]
    async fn scene_select_test() {
        let (sim, mut bridge) = bridge(vec![DaliSimGear::new(1).scene(3, 254)]);
        let mut out = Vec::new();
        bridge.on_rescan(&mut out).await;
        out.clear();
        let light = LightRef::Lamp(Short::new(1));
        bridge
            .on_scene_select(light, SceneSelect::Scene(3), &mut out)
            .await
            .unwrap();
        assert_eq!(sim.gear_level(1), Some(254));
        assert_eq!(
            bridge.registry().lamp(Short::new(1)).unwrap().current_scene(),
            Some(3)
        );
        out.clear();
        bridge
            .on_scene_select(light, SceneSelect::None, &mut out)
            .await
            .unwrap();
        assert_eq!(out, vec![StateUpdate::Scene { light, scene: None }]);
        assert_eq!(
            bridge.registry().lamp(Short::new(1)).unwrap().current_scene(),
            None
        );
    }
}
