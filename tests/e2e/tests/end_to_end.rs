//! Full client-against-node measurement scenarios over loopback

use client::{Arrival, ClientConfig, WaitStrategy};
use hopbench_e2e_tests::spawn_node;
use node::NodeConfig;

fn client_config(addr: std::net::SocketAddr) -> ClientConfig {
    ClientConfig {
        server_host: addr.ip().to_string(),
        server_port: addr.port(),
        count: 10,
        period_us: 1_000,
        ..ClientConfig::default()
    }
}

#[test]
fn ten_requests_produce_ten_ordered_samples() {
    let (addr, _node) = spawn_node(NodeConfig::default());

    let samples = client::run(&client_config(addr)).expect("measurement run failed");

    assert_eq!(samples.len(), 10);
    for (id, elapsed) in samples.iter().enumerate() {
        // Loopback round trips with a 1us compute stay far below a second;
        // anything bigger means a sample never got paired.
        assert!(
            *elapsed < 1_000_000,
            "request {id} recorded an implausible latency of {elapsed}us"
        );
    }
}

#[test]
fn compute_cost_is_a_latency_floor() {
    let (addr, _node) = spawn_node(NodeConfig::default());

    let mut config = client_config(addr);
    config.count = 5;
    config.compute_us = 2_000;

    let samples = client::run(&config).expect("measurement run failed");
    assert_eq!(samples.len(), 5);
    for (id, elapsed) in samples.iter().enumerate() {
        assert!(
            *elapsed >= 2_000,
            "request {id} finished in {elapsed}us, below the requested compute time"
        );
    }
}

#[test]
fn poisson_arrivals_with_spin_waiting_complete_the_run() {
    let (addr, _node) = spawn_node(NodeConfig::default());

    let mut config = client_config(addr);
    config.arrival = Arrival::Exponential;
    config.wait = WaitStrategy::Spin;
    config.period_us = 200;

    let samples = client::run(&config).expect("measurement run failed");
    assert_eq!(samples.len(), 10);
}

#[test]
fn two_clients_back_to_back_reuse_the_same_node() {
    let (addr, _node) = spawn_node(NodeConfig::default());

    let first = client::run(&client_config(addr)).expect("first run failed");
    let second = client::run(&client_config(addr)).expect("second run failed");
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 10);
}
