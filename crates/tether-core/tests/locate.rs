mod support;

use std::net::TcpListener;

use support::{RecordingReporter, ScriptedPrompter, StaticDiscovery};
use tether_core::error::ProvisionError;
use tether_core::scan::{DeviceCandidate, Locator};

/// Bind a listener on the given loopback address so liveness probes see an
/// open port. The whole 127/8 block is local on Linux, which lets several
/// listeners share one port number across distinct addresses.
fn listen_on(ip: &str) -> (TcpListener, u16) {
    let listener = TcpListener::bind((ip, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A port nothing listens on, so connections are refused immediately.
fn closed_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn empty_discovery_is_an_error() {
    let discovery = StaticDiscovery::new(Vec::new());
    let prompter = ScriptedPrompter::new();
    let reporter = RecordingReporter::new();

    let err = Locator::new(&discovery, &prompter, &reporter)
        .locate()
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::NoDevicesFound)
    ));
}

#[tokio::test]
async fn candidates_without_an_open_management_port_are_an_error() {
    let discovery = StaticDiscovery::new(vec![DeviceCandidate::new("127.0.0.1", None)]);
    let prompter = ScriptedPrompter::new();
    let reporter = RecordingReporter::new();

    let err = Locator::new(&discovery, &prompter, &reporter)
        .with_management_port(closed_port())
        .locate()
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::NoDevicesFound)
    ));
}

#[tokio::test]
async fn a_single_responsive_device_is_chosen_without_prompting() {
    let (_guard, port) = listen_on("127.0.0.1");
    let discovery = StaticDiscovery::new(vec![DeviceCandidate::new(
        "127.0.0.1",
        Some("tether-a.local".to_string()),
    )]);
    let prompter = ScriptedPrompter::new();
    let reporter = RecordingReporter::new();

    let address = Locator::new(&discovery, &prompter, &reporter)
        .with_management_port(port)
        .locate()
        .await
        .unwrap();

    assert_eq!(address, "127.0.0.1");
    assert_eq!(prompter.interaction_count(), 0);
    assert!(
        reporter
            .infos()
            .iter()
            .any(|line| line.contains("tether-a.local (127.0.0.1)"))
    );
}

#[tokio::test]
async fn several_responsive_devices_prompt_for_a_choice() {
    let (_a, port) = listen_on("127.0.0.2");
    let _b = TcpListener::bind(("127.0.0.3", port)).unwrap();
    let discovery = StaticDiscovery::new(vec![
        DeviceCandidate::new("127.0.0.2", Some("tether-a.local".to_string())),
        DeviceCandidate::new("127.0.0.3", None),
    ]);
    let prompter = ScriptedPrompter::new().push_select(1);
    let reporter = RecordingReporter::new();

    let address = Locator::new(&discovery, &prompter, &reporter)
        .with_management_port(port)
        .locate()
        .await
        .unwrap();

    assert_eq!(address, "127.0.0.3");
    let recorded = prompter.recorded();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].contains("[tether-a.local (127.0.0.2), 127.0.0.3]"));
}

#[tokio::test]
async fn unresponsive_devices_never_reach_the_prompt() {
    // Two discovered, one alive: that one wins silently.
    let port = closed_port();
    let _guard = TcpListener::bind(("127.0.0.2", port)).unwrap();
    let discovery = StaticDiscovery::new(vec![
        DeviceCandidate::new("127.0.0.1", None),
        DeviceCandidate::new("127.0.0.2", None),
    ]);
    let prompter = ScriptedPrompter::new();
    let reporter = RecordingReporter::new();

    let address = Locator::new(&discovery, &prompter, &reporter)
        .with_management_port(port)
        .locate()
        .await
        .unwrap();

    assert_eq!(address, "127.0.0.2");
    assert_eq!(prompter.interaction_count(), 0);
}
