//! Run this device against a simulated peer over an in-process transport.

use anyhow::{Context, Result};
use devsync_core::{BatteryEvent, BatteryStatus, ManualObserver, ManualSession, PeerLock};
use devsync_link::{DeviceLink, LinkConfig, LoopbackTransport};
use devsync_types::DeviceId;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Scenario parameters.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Charge reported by this device's battery.
    pub host_charge: i32,
    /// Whether this device is charging.
    pub host_charging: bool,
    /// Charge reported by the simulated peer.
    pub peer_charge: i32,
    /// Whether the simulated peer is charging.
    pub peer_charging: bool,
    /// Initial lock state of the simulated peer.
    pub peer_locked: bool,
    /// Ask the peer to lock once connected.
    pub lock_peer: bool,
    /// Drain the peer's battery to this level halfway through.
    pub peer_discharge_to: Option<i32>,
    /// How long the host keeps the link up.
    pub settle: Duration,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            host_charge: 80,
            host_charging: false,
            peer_charge: 50,
            peer_charging: false,
            peer_locked: false,
            lock_peer: false,
            peer_discharge_to: None,
            settle: Duration::from_millis(100),
        }
    }
}

/// What each side ended up believing about the other.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Peer battery as seen by this device.
    pub peer_battery: BatteryStatus,
    /// Peer lock state as seen by this device.
    pub peer_lock: PeerLock,
    /// This device's battery as seen by the peer.
    pub host_battery: BatteryStatus,
    /// Lock commands the peer's session executed.
    pub peer_commands: Vec<bool>,
    /// Events raised on this device, in order.
    pub events: Vec<String>,
}

/// Run the simulate command.
pub async fn run(config: &LinkConfig, options: &SimulateOptions) -> Result<SimulationReport> {
    let report = simulate(config, options).await?;

    println!("Simulated session with peer complete.");
    println!();
    println!(
        "  Peer battery: {} ({})",
        describe_charge(report.peer_battery.charge),
        if report.peer_battery.is_charging {
            "charging"
        } else {
            "discharging"
        }
    );
    println!(
        "  Peer lock:    {}",
        match report.peer_lock {
            PeerLock::Unknown => "unknown",
            PeerLock::Known(true) => "locked",
            PeerLock::Known(false) => "unlocked",
        }
    );
    println!(
        "  Peer sees us: {}",
        describe_charge(report.host_battery.charge)
    );
    if !report.peer_commands.is_empty() {
        println!("  Peer executed lock commands: {:?}", report.peer_commands);
    }
    println!();
    println!("Events:");
    for event in &report.events {
        println!("  - {}", event);
    }

    Ok(report)
}

/// Drive both links until the host's settle time elapses.
pub async fn simulate(config: &LinkConfig, options: &SimulateOptions) -> Result<SimulationReport> {
    let host_battery =
        ManualObserver::new(BatteryStatus::new(options.host_charge, options.host_charging));
    let host_session = ManualSession::new(false);
    let peer_battery =
        ManualObserver::new(BatteryStatus::new(options.peer_charge, options.peer_charging));
    let peer_session = ManualSession::new(options.peer_locked);

    let peer_config = LinkConfig::default();
    let mut host = DeviceLink::new(
        peer_config.device.id.clone(),
        config,
        Arc::new(host_battery),
        Arc::new(host_session),
    );
    let mut peer = DeviceLink::new(
        config.device.id.clone(),
        &peer_config,
        Arc::new(peer_battery.clone()),
        Arc::new(peer_session.clone()),
    );

    let events = Arc::new(Mutex::new(Vec::new()));
    record_events(&mut host, &events);

    if options.lock_peer {
        host.lock_mut().set_locked(true);
    }

    info!(
        "Simulating link between {} and {}",
        config.device.id, peer_config.device.id
    );

    let (host_end, peer_end) = LoopbackTransport::pair();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let host_task = async {
        let result = host
            .run(&host_end, tokio::time::sleep(options.settle))
            .await;
        let _ = stop_tx.send(());
        result
    };
    let peer_task = async {
        peer.run(&peer_end, async {
            let _ = stop_rx.await;
        })
        .await
    };
    let discharge = async {
        if let Some(charge) = options.peer_discharge_to {
            tokio::time::sleep(options.settle / 2).await;
            peer_battery.set(BatteryStatus::new(charge, false));
        }
    };

    let (host_result, peer_result, ()) = tokio::join!(host_task, peer_task, discharge);
    host_result.context("Host link failed")?;
    peer_result.context("Peer link failed")?;

    let events = events
        .lock()
        .map(|events| events.clone())
        .unwrap_or_default();

    Ok(SimulationReport {
        peer_battery: host.battery().remote_status(),
        peer_lock: host.lock().remote(),
        host_battery: peer.battery().remote_status(),
        peer_commands: peer_session.commands(),
        events,
    })
}

fn record_events(link: &mut DeviceLink, events: &Arc<Mutex<Vec<String>>>) {
    let sink = Arc::clone(events);
    link.battery_mut().on_event(move |event| {
        let line = match event {
            BatteryEvent::Refreshed => "battery refreshed".to_string(),
            BatteryEvent::LowBattery { charge } => format!("peer battery low ({}%)", charge),
        };
        if let Ok(mut events) = sink.lock() {
            events.push(line);
        }
    });

    let sink = Arc::clone(events);
    link.lock_mut().on_locked_changed(move |locked| {
        let line = if *locked {
            "peer locked"
        } else {
            "peer unlocked"
        };
        if let Ok(mut events) = sink.lock() {
            events.push(line.to_string());
        }
    });
}

fn describe_charge(charge: i32) -> String {
    if charge == BatteryStatus::UNKNOWN_CHARGE {
        "unknown".to_string()
    } else {
        format!("{}%", charge)
    }
}

/// Peer identity used when no config is given.
pub fn ephemeral_config() -> LinkConfig {
    LinkConfig {
        device: devsync_link::DeviceConfig {
            id: DeviceId::random(),
            name: "devsync-simulator".to_string(),
        },
        ..LinkConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SimulateOptions {
        SimulateOptions {
            settle: Duration::from_millis(200),
            ..SimulateOptions::default()
        }
    }

    #[tokio::test]
    async fn both_sides_learn_each_others_state() {
        let options = SimulateOptions {
            host_charge: 72,
            host_charging: true,
            peer_charge: 41,
            peer_locked: true,
            ..options()
        };

        let report = simulate(&ephemeral_config(), &options).await.unwrap();

        assert_eq!(report.peer_battery, BatteryStatus::new(41, false));
        assert_eq!(report.host_battery, BatteryStatus::new(72, true));
        assert_eq!(report.peer_lock, PeerLock::Known(true));
        assert!(report.peer_commands.is_empty());
        assert!(report.events.contains(&"peer locked".to_string()));
    }

    #[tokio::test]
    async fn lock_peer_executes_command_on_peer() {
        let options = SimulateOptions {
            lock_peer: true,
            ..options()
        };

        let report = simulate(&ephemeral_config(), &options).await.unwrap();

        assert_eq!(report.peer_commands, vec![true]);
        assert_eq!(report.peer_lock, PeerLock::Known(true));
    }

    #[tokio::test]
    async fn discharge_below_threshold_raises_one_low_event() {
        let options = SimulateOptions {
            peer_charge: 30,
            peer_discharge_to: Some(9),
            ..options()
        };

        let report = simulate(&ephemeral_config(), &options).await.unwrap();

        assert_eq!(report.peer_battery.charge, 9);
        let lows = report
            .events
            .iter()
            .filter(|e| e.starts_with("peer battery low"))
            .count();
        assert_eq!(lows, 1);
    }

    #[tokio::test]
    async fn peer_pulls_battery_from_host_that_does_not_push() {
        let mut config = ephemeral_config();
        config.battery.push_on_connect = false;

        let report = simulate(&config, &options()).await.unwrap();

        assert_eq!(report.host_battery.charge, 80);
        assert_eq!(report.peer_battery.charge, 50);
    }

    #[tokio::test]
    async fn host_learns_peer_battery_without_pulling() {
        let mut config = ephemeral_config();
        config.battery.request_on_connect = false;

        let report = simulate(&config, &options()).await.unwrap();

        assert_eq!(report.peer_battery.charge, 50);
        assert_eq!(report.host_battery.charge, 80);
    }

    #[test]
    fn unknown_charge_is_described() {
        assert_eq!(describe_charge(-1), "unknown");
        assert_eq!(describe_charge(55), "55%");
    }
}
