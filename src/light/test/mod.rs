use super::bus::DaliBus;
use super::error::DeviceError;
use super::light_ref::LightRef;
use super::registry::DeviceRegistry;
use super::scanner::{build_registry, scan_lamps};
use super::state::StateUpdate;
use crate::common::address::{GroupAddress, Short};
use crate::config::BridgeConfig;
use crate::drivers::simulator::{DaliSimBusHandle, DaliSimGear};
use crate::gear::cmd_defs as cmd;
use std::time::Duration;

async fn setup(gears: Vec<DaliSimGear>) -> (DaliSimBusHandle, DaliBus, DeviceRegistry) {
    let sim = DaliSimBusHandle::new(gears);
    let mut bus = DaliBus::new(Box::new(sim.driver()));
    let registry = build_registry(&mut bus, &BridgeConfig::default()).await;
    sim.clear_log();
    (sim, bus, registry)
}

fn brightness_count(out: &[StateUpdate], light: LightRef) -> usize {
    out.iter()
        .filter(|u| matches!(u, StateUpdate::Brightness { light: l, .. } if *l == light))
        .count()
}

#[tokio::test]
async fn scan_stops_at_max_count() {
    let sim = DaliSimBusHandle::new(vec![
        DaliSimGear::new(3),
        DaliSimGear::new(7),
        DaliSimGear::new(9),
    ]);
    let mut bus = DaliBus::new(Box::new(sim.driver()));
    let found = scan_lamps(&mut bus, 2).await;
    assert_eq!(found, vec![Short::new(3), Short::new(7)]);
    let queries = sim.queries();
    assert_eq!(queries.len(), 8);
    assert!(!queries.contains(&cmd::QUERY_CONTROL_GEAR_PRESENT(Short::new(9)).0));
}

#[tokio::test]
async fn scan_builds_groups() {
    let (_sim, _bus, reg) = setup(vec![
        DaliSimGear::new(0).groups(&[0]),
        DaliSimGear::new(1).groups(&[0, 1]).scene(4, 200),
        DaliSimGear::new(2).groups(&[1]),
    ])
    .await;
    assert_eq!(reg.lamps().count(), 3);
    let g0 = reg.group(GroupAddress::new(0)).unwrap();
    assert_eq!(g0.lamps().to_vec(), vec![Short::new(0), Short::new(1)]);
    assert!(g0.scenes().contains(&4));
    let lamp = reg.lamp(Short::new(1)).unwrap();
    assert_eq!(
        lamp.groups().iter().copied().collect::<Vec<_>>(),
        vec![GroupAddress::new(0), GroupAddress::new(1)]
    );
    assert!(reg.group(GroupAddress::new(2)).is_none());
}

#[tokio::test]
async fn faulty_lamp_is_skipped() {
    let (_sim, _bus, reg) = setup(vec![
        DaliSimGear::new(1).faulty(),
        DaliSimGear::new(2).level(100),
    ])
    .await;
    assert!(reg.lamp(Short::new(1)).is_none());
    assert!(reg.lamp(Short::new(2)).is_some());
}

#[tokio::test]
async fn group_level_sends_one_command() {
    let (sim, mut bus, mut reg) = setup(vec![
        DaliSimGear::new(0).groups(&[0]),
        DaliSimGear::new(1).groups(&[0, 1]),
        DaliSimGear::new(2).groups(&[1]),
    ])
    .await;
    let g0 = GroupAddress::new(0);
    let g1 = GroupAddress::new(1);
    let physical = reg.group(g0).unwrap().to_physical(100).unwrap();
    let mut out = Vec::new();
    reg.set_group_level(&mut bus, g0, 100, &mut out).await.unwrap();

    assert_eq!(sim.commands(), vec![cmd::DAPC(g0, physical).0]);
    assert_eq!(sim.gear_level(0), Some(physical));
    assert_eq!(sim.gear_level(1), Some(physical));
    assert_eq!(sim.gear_level(2), Some(0));

    assert_eq!(reg.lamp(Short::new(0)).unwrap().level(), 100);
    assert_eq!(reg.lamp(Short::new(1)).unwrap().level(), 100);
    assert_eq!(reg.group(g0).unwrap().level(), 100);
    assert_eq!(reg.group(g1).unwrap().level(), 50);
    assert_eq!(brightness_count(&out, LightRef::Group(g0)), 1);
    assert_eq!(brightness_count(&out, LightRef::Group(g1)), 1);
    assert_eq!(brightness_count(&out, LightRef::Lamp(Short::new(2))), 0);
}

#[tokio::test]
async fn lamp_level_updates_groups() {
    let (sim, mut bus, mut reg) = setup(vec![
        DaliSimGear::new(0).groups(&[0]).level(254),
        DaliSimGear::new(1).groups(&[0]).level(254),
    ])
    .await;
    let g0 = GroupAddress::new(0);
    let lamp = LightRef::Lamp(Short::new(0));
    let mut out = Vec::new();
    reg.set_lamp_level(&mut bus, Short::new(0), 0, &mut out).await.unwrap();
    assert_eq!(sim.commands(), vec![cmd::DAPC(Short::new(0), 0).0]);
    assert_eq!(reg.group(g0).unwrap().level(), 128);
    assert!(out.contains(&StateUpdate::Power {
        light: lamp,
        on: false
    }));
    // The group is still on
    assert!(!out.contains(&StateUpdate::Power {
        light: LightRef::Group(g0),
        on: false
    }));
}

#[tokio::test]
async fn failed_command_changes_nothing() {
    let (sim, mut bus, mut reg) = setup(vec![DaliSimGear::new(5).level(254)]).await;
    sim.set_offline(true);
    let mut out = Vec::new();
    let res = reg.set_lamp_level(&mut bus, Short::new(5), 10, &mut out).await;
    assert!(matches!(res, Err(DeviceError::Bus(_))));
    assert_eq!(reg.lamp(Short::new(5)).unwrap().level(), 255);
    assert!(out.is_empty());
}

#[tokio::test]
async fn unprogrammed_scene_is_rejected() {
    let (sim, mut bus, mut reg) = setup(vec![DaliSimGear::new(0).groups(&[3]).scene(1, 80)]).await;
    let mut out = Vec::new();
    let res = reg.set_lamp_scene(&mut bus, Short::new(0), 5, &mut out).await;
    assert!(matches!(res, Err(DeviceError::SceneUnavailable { scene: 5, .. })));
    let res = reg.set_lamp_scene(&mut bus, Short::new(0), 16, &mut out).await;
    assert!(matches!(res, Err(DeviceError::SceneUnavailable { .. })));
    assert!(out.is_empty());
    assert!(sim.transactions().is_empty());
    assert_eq!(reg.lamp(Short::new(0)).unwrap().current_scene(), None);

    let res = reg
        .set_group_scene(&mut bus, GroupAddress::new(3), 7, &mut out)
        .await;
    assert!(res.is_err());
    assert!(sim.transactions().is_empty());
}

#[tokio::test]
async fn group_scene_keeps_member_levels() {
    let (sim, mut bus, mut reg) = setup(vec![
        DaliSimGear::new(0).groups(&[0]).scene(2, 254),
        DaliSimGear::new(1).groups(&[0]),
    ])
    .await;
    let g0 = GroupAddress::new(0);
    let light = LightRef::Group(g0);
    let mut out = Vec::new();
    reg.set_group_scene(&mut bus, g0, 2, &mut out).await.unwrap();
    assert_eq!(sim.commands(), vec![cmd::GOTO_SCENE(g0, 2).0]);
    assert_eq!(sim.gear_level(0), Some(254));
    assert_eq!(reg.lamp(Short::new(0)).unwrap().level(), 0);
    assert_eq!(reg.group(g0).unwrap().current_scene(), Some(2));
    assert_eq!(
        &out[..2],
        &[
            StateUpdate::Scene { light, scene: None },
            StateUpdate::Scene {
                light,
                scene: Some(2)
            }
        ]
    );

    // Setting a level clears the scene
    out.clear();
    reg.set_group_level(&mut bus, g0, 30, &mut out).await.unwrap();
    assert_eq!(out[0], StateUpdate::Scene { light, scene: None });
    assert_eq!(reg.group(g0).unwrap().current_scene(), None);
}

#[tokio::test]
async fn poll_reads_levels() {
    let (sim, mut bus, mut reg) = setup(vec![
        DaliSimGear::new(0).groups(&[0]),
        DaliSimGear::new(1).groups(&[0]),
    ])
    .await;
    sim.set_gear_level(1, 254);
    let mut out = Vec::new();
    reg.poll_all(&mut bus, &mut out).await;
    assert_eq!(reg.lamp(Short::new(1)).unwrap().level(), 255);
    assert_eq!(reg.group(GroupAddress::new(0)).unwrap().level(), 128);
    let lamp = LightRef::Lamp(Short::new(1));
    assert_eq!(
        &out[..2],
        &[
            StateUpdate::Brightness {
                light: lamp,
                level: 255
            },
            StateUpdate::Power {
                light: lamp,
                on: true
            }
        ]
    );
    assert!(sim.commands().is_empty());

    // A lamp that stops answering is skipped
    out.clear();
    sim.set_offline(true);
    reg.poll_all(&mut bus, &mut out).await;
    assert!(out.is_empty());
    assert_eq!(reg.lamp(Short::new(1)).unwrap().level(), 255);
}

#[tokio::test(start_paused = true)]
async fn flash_restores_level() {
    let (sim, mut bus, mut reg) = setup(vec![DaliSimGear::new(4).limits(10, 200).level(120)]).await;
    let addr = Short::new(4);
    let lamp = reg.lamp(addr).unwrap();
    let restore = lamp.range().to_physical(lamp.level()).unwrap();
    let start = tokio::time::Instant::now();
    reg.flash_lamp(&mut bus, addr, 2, Duration::from_millis(500))
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(
        sim.commands(),
        vec![
            cmd::RECALL_MAX_LEVEL(addr).0,
            cmd::RECALL_MIN_LEVEL(addr).0,
            cmd::RECALL_MAX_LEVEL(addr).0,
            cmd::RECALL_MIN_LEVEL(addr).0,
            cmd::DAPC(addr, restore).0,
        ]
    );
    assert_eq!(sim.gear_level(4), Some(restore));
}

#[tokio::test]
async fn lamp_scene_updates_groups() {
    let (sim, mut bus, mut reg) = setup(vec![
        DaliSimGear::new(0).groups(&[0]).scene(2, 254),
        DaliSimGear::new(1).groups(&[0]),
    ])
    .await;
    let addr = Short::new(0);
    let lamp = LightRef::Lamp(addr);
    let group = LightRef::Group(GroupAddress::new(0));
    let mut out = Vec::new();
    reg.set_lamp_scene(&mut bus, addr, 2, &mut out).await.unwrap();

    assert_eq!(sim.commands(), vec![cmd::GOTO_SCENE(addr, 2).0]);
    assert_eq!(reg.lamp(addr).unwrap().level(), 255);
    assert_eq!(reg.group(GroupAddress::new(0)).unwrap().level(), 128);
    assert_eq!(
        out,
        vec![
            StateUpdate::Scene {
                light: lamp,
                scene: None
            },
            StateUpdate::Brightness {
                light: group,
                level: 128
            },
            StateUpdate::Power {
                light: group,
                on: true
            },
            StateUpdate::Brightness {
                light: lamp,
                level: 255
            },
            StateUpdate::Power {
                light: lamp,
                on: true
            },
            StateUpdate::Scene {
                light: lamp,
                scene: Some(2)
            },
        ]
    );
}

#[tokio::test]
async fn failed_scene_clears_current_scene() {
    let (sim, mut bus, mut reg) = setup(vec![DaliSimGear::new(0)
        .groups(&[0])
        .scene(2, 254)
        .scene(3, 100)])
    .await;
    let addr = Short::new(0);
    let g0 = GroupAddress::new(0);
    let lamp = LightRef::Lamp(addr);
    let group = LightRef::Group(g0);
    let mut out = Vec::new();
    reg.set_lamp_scene(&mut bus, addr, 2, &mut out).await.unwrap();
    reg.set_group_scene(&mut bus, g0, 2, &mut out).await.unwrap();
    assert_eq!(reg.lamp(addr).unwrap().current_scene(), Some(2));
    assert_eq!(reg.group(g0).unwrap().current_scene(), Some(2));

    sim.set_offline(true);
    let res = reg.set_lamp_scene(&mut bus, addr, 3, &mut out).await;
    assert!(matches!(res, Err(DeviceError::Bus(_))));
    assert_eq!(reg.lamp(addr).unwrap().current_scene(), None);
    let res = reg.set_group_scene(&mut bus, g0, 7, &mut out).await;
    assert!(matches!(res, Err(DeviceError::SceneUnavailable { .. })));
    assert_eq!(reg.group(g0).unwrap().current_scene(), None);

    // A full publish agrees with the last reported scene
    out.clear();
    reg.publish_all(&mut out);
    assert!(out.contains(&StateUpdate::Scene {
        light: lamp,
        scene: None
    }));
    assert!(out.contains(&StateUpdate::Scene {
        light: group,
        scene: None
    }));
}
