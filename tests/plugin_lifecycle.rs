//! End-to-end tests for the plugin lifecycle.
//!
//! These tests drive NasPlugin the way a host would: on_load, real HTTP
//! traffic against the spawned server thread, on_unload. The Samba side runs
//! against MockServiceManager so no systemd is needed, and every path points
//! into a temp directory.

use std::fs;
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use cubby::config::Config;
use cubby::plugin::{NasPlugin, Plugin};
use cubby::samba::mock::{MockBehavior, MockServiceManager};

/// Config pointing everything at a temp directory, with an ephemeral port.
fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.shared_dir = temp_dir.path().join("shared");
    config.smb_conf_path = temp_dir.path().join("smb.conf");
    config.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.port = 0;
    config.shutdown_grace_secs = 1;
    config
}

/// Issue a bare HTTP/1.1 GET and return the whole response as text.
fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("server should be accepting");
    write!(
        stream,
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    )
    .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

/// The body part of a raw HTTP response.
fn response_body(response: &str) -> &str {
    response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("")
}

// ============================================================================
// Full lifecycle
// ============================================================================

#[test]
fn test_load_serve_unload() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let service = Arc::new(MockServiceManager::new());
    let mut plugin = NasPlugin::with_service_manager(config.clone(), service.clone());

    plugin.on_load();

    // Every startup step ran: directory, smb.conf, service restart, listener
    assert!(config.shared_dir.is_dir());
    let conf = fs::read_to_string(&config.smb_conf_path).unwrap();
    assert!(conf.contains(&format!("path = {}", config.shared_dir.display())));
    assert_eq!(service.calls()[0].action, "restart");
    assert!(plugin.is_running());

    let addr = plugin.server_addr().expect("server address");
    let response = http_get(addr, "/");
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("Cubby NAS Server"));

    plugin.on_unload();

    // Samba stopped, listener gone, thread joined
    let actions: Vec<_> = service.calls().iter().map(|c| c.action.clone()).collect();
    assert_eq!(actions, vec!["restart", "stop"]);
    assert!(!plugin.is_running());
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn test_served_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let service = Arc::new(MockServiceManager::new());
    let mut plugin = NasPlugin::with_service_manager(config.clone(), service);

    plugin.on_load();
    let addr = plugin.server_addr().unwrap();

    let payload = "line one\nline two\n";
    fs::write(config.shared_dir.join("notes.txt"), payload).unwrap();

    // The listing picks the file up without any restart
    let listing = http_get(addr, "/files/");
    assert!(listing.starts_with("HTTP/1.1 200"));
    assert!(listing.contains("notes.txt"));

    // And the download returns the exact contents
    let download = http_get(addr, "/files/notes.txt");
    assert!(download.starts_with("HTTP/1.1 200"));
    assert_eq!(response_body(&download), payload);

    plugin.on_unload();
}

#[test]
fn test_fresh_activation_rewrites_config() {
    let temp_dir = TempDir::new().unwrap();
    let conf_path = temp_dir.path().join("smb.conf");

    let mut first_config = test_config(&temp_dir);
    first_config.shared_dir = temp_dir.path().join("first");
    first_config.smb_conf_path = conf_path.clone();

    let mut plugin =
        NasPlugin::with_service_manager(first_config, Arc::new(MockServiceManager::new()));
    plugin.on_load();
    plugin.on_unload();

    // A later activation with a different share path fully replaces the conf
    let mut second_config = test_config(&temp_dir);
    second_config.shared_dir = temp_dir.path().join("second");
    second_config.smb_conf_path = conf_path.clone();

    let mut plugin =
        NasPlugin::with_service_manager(second_config, Arc::new(MockServiceManager::new()));
    plugin.on_load();
    plugin.on_unload();

    let conf = fs::read_to_string(&conf_path).unwrap();
    assert!(conf.contains("second"));
    assert!(!conf.contains("first"));
}

// ============================================================================
// Shutdown behavior
// ============================================================================

#[test]
fn test_unload_returns_within_bounded_time() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let mut plugin =
        NasPlugin::with_service_manager(config, Arc::new(MockServiceManager::new()));

    plugin.on_load();
    assert!(plugin.is_running());

    let start = Instant::now();
    plugin.on_unload();
    let elapsed = start.elapsed();

    assert!(!plugin.is_running());
    assert!(
        elapsed < Duration::from_secs(5),
        "unload took {:?}, expected well under the grace period bound",
        elapsed
    );
}

#[test]
fn test_stuck_client_cannot_hold_unload() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let mut plugin =
        NasPlugin::with_service_manager(config, Arc::new(MockServiceManager::new()));

    plugin.on_load();
    let addr = plugin.server_addr().unwrap();

    // Half a request, never finished: the connection sits in-flight forever
    let mut stuck = TcpStream::connect(addr).unwrap();
    stuck.write_all(b"GET / HTTP/1.1\r\n").unwrap();

    let start = Instant::now();
    plugin.on_unload();
    let elapsed = start.elapsed();

    // Grace period is 1s; the deadline must cut the stuck connection loose
    assert!(!plugin.is_running());
    assert!(
        elapsed < Duration::from_secs(5),
        "unload took {:?} with a stuck connection",
        elapsed
    );
}

// ============================================================================
// Degraded environments
// ============================================================================

#[test]
fn test_lifecycle_survives_broken_samba_unit() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let service = Arc::new(MockServiceManager::with_behavior(
        MockBehavior::ExitFailure("Failed to restart smbd.service".to_string()),
    ));
    let mut plugin = NasPlugin::with_service_manager(config, service.clone());

    plugin.on_load();

    // HTTP side is up even though smbd refuses to restart
    assert!(plugin.is_running());
    let addr = plugin.server_addr().unwrap();
    assert!(http_get(addr, "/").starts_with("HTTP/1.1 200"));

    plugin.on_unload();
    assert!(!plugin.is_running());

    // Both control attempts were made regardless of their exit codes
    let actions: Vec<_> = service.calls().iter().map(|c| c.action.clone()).collect();
    assert_eq!(actions, vec!["restart", "stop"]);
}

#[test]
fn test_repeated_unload_is_harmless() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let service = Arc::new(MockServiceManager::new());
    let mut plugin = NasPlugin::with_service_manager(config, service);

    plugin.on_load();
    plugin.on_unload();
    plugin.on_unload();

    assert!(!plugin.is_running());
}
