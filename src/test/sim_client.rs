use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use crate::ctl::{
    ClientError, Multiplier, PORTS, PortStatus, SimClient, SimConfig, Stream, StreamPlan,
    TrafficClient, TrafficConfig, TxMode,
};
use crate::pkt::{FieldEngine, Instruction};

fn stream(cfg: &TrafficConfig, port: u8) -> Stream {
    StreamPlan::for_direction(cfg, port)
        .build(cfg.pkt_len)
        .expect("stream")
}

/// 连接并完成 L3 配置、下发流，但尚未开始发送。
fn ready_client(pkt_len: usize) -> SimClient {
    let cfg = TrafficConfig {
        pkt_len,
        ..TrafficConfig::default()
    };
    let mut client = SimClient::default();
    client.connect().expect("connect");
    client.reset(&PORTS).expect("reset");
    client.set_service_mode(&PORTS, true).expect("service on");
    for p in PORTS {
        let idx = usize::from(p);
        client
            .set_l3_mode(p, cfg.ip_addr[idx], cfg.default_gw[idx])
            .expect("l3");
    }
    client.resolve(&PORTS).expect("resolve");
    client.set_service_mode(&PORTS, false).expect("service off");
    for p in PORTS {
        client.add_streams(p, vec![stream(&cfg, p)]).expect("streams");
    }
    client
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= b.abs() * 1e-9
}

#[test]
fn requests_before_connect_fail() {
    let mut client = SimClient::default();
    assert!(!client.is_connected());
    assert!(matches!(
        client.server_system_info(),
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(client.reset(&PORTS), Err(ClientError::NotConnected)));
    assert!(matches!(
        client.stats(&PORTS),
        Err(ClientError::NotConnected)
    ));
    // 未连接时断开不是错误
    client.disconnect().expect("disconnect");
}

#[test]
fn server_info_reflects_sim_config() {
    let mut client = SimClient::new(SimConfig {
        hostname: "trex-lab".to_string(),
        cores_per_port: 3,
        ..SimConfig::default()
    });
    client.connect().expect("connect");
    let sys = client.server_system_info().expect("system info");
    assert_eq!(sys.hostname, "trex-lab");
    assert_eq!(sys.port_count, 2);
    assert_eq!(sys.dp_core_count, 6);
    assert_eq!(sys.dp_core_count_per_port, 3);
    let version = client.server_version().expect("version");
    assert_eq!(version.name, "trex-sim");
    assert!(!version.version.is_empty());
}

#[test]
fn unknown_port_is_rejected() {
    let mut client = SimClient::default();
    client.connect().expect("connect");
    assert!(matches!(
        client.reset(&[0, 5]),
        Err(ClientError::InvalidPort(5))
    ));
    assert!(matches!(
        client.set_l3_mode(2, Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST),
        Err(ClientError::InvalidPort(2))
    ));
}

#[test]
fn l3_setup_requires_service_mode() {
    let mut client = SimClient::default();
    client.connect().expect("connect");
    let err = client
        .set_l3_mode(0, Ipv4Addr::new(172, 16, 0, 2), Ipv4Addr::new(172, 16, 0, 1))
        .expect_err("service mode is off");
    assert!(matches!(err, ClientError::Port { port: 0, .. }));

    client.set_service_mode(&PORTS, true).expect("service on");
    let err = client.resolve(&PORTS).expect_err("nothing to resolve");
    assert!(matches!(err, ClientError::Port { port: 0, .. }));
}

#[test]
fn port_info_shows_resolution_state() {
    let mut client = SimClient::default();
    client.connect().expect("connect");
    let before = client.port_info(&PORTS).expect("port info");
    assert_eq!(before.len(), 2);
    assert_eq!(before[0].arp, "-");
    assert_eq!(before[0].src_ipv4, None);
    assert_eq!(before[1].pci_addr, "0000:00:05.0");

    let mut client = ready_client(64);
    let after = client.port_info(&PORTS).expect("port info");
    assert_eq!(after[0].arp, after[1].hw_mac);
    assert_eq!(after[1].arp, after[0].hw_mac);
    assert_eq!(after[0].src_ipv4, Some(Ipv4Addr::new(172, 16, 0, 2)));
    assert_eq!(after[0].status, PortStatus::Idle);
    assert_eq!(after[0].field_values()[9], "IDLE");
}

#[test]
fn full_line_rate_at_minimum_frame() {
    let mut client = ready_client(64);
    client.clear_stats().expect("clear");
    client
        .start(&PORTS, &Multiplier::Percent(100.0))
        .expect("start");

    let snapshot = client.stats(&PORTS).expect("stats");
    let port0 = snapshot.port(0);
    // 64B 帧 + FCS + 前导码和帧间隙 = 88B
    let pps = 10e9 / (88.0 * 8.0);
    assert!(approx(port0.tx_pps, pps), "{}", port0.tx_pps);
    assert!(approx(port0.tx_bps, pps * 68.0 * 8.0), "{}", port0.tx_bps);
    // 对端发送即本端接收
    assert!(approx(port0.rx_pps, snapshot.port(1).tx_pps));
    assert!(approx(snapshot.global.tx_pps, 2.0 * pps));
    assert!(approx(snapshot.global.rx_bps, snapshot.global.tx_bps));

    let infos = client.port_info(&PORTS).expect("port info");
    assert!(infos.iter().all(|i| i.status == PortStatus::Transmitting));
}

#[test]
fn absolute_multipliers_set_port_rate() {
    let mut client = ready_client(128);
    client.start(&PORTS, &Multiplier::Pps(1e6)).expect("start");
    let snapshot = client.stats(&PORTS).expect("stats");
    assert!(approx(snapshot.port(1).tx_pps, 1e6));
    assert!(approx(snapshot.port(1).tx_bps, 1e6 * 132.0 * 8.0));
    client.stop(&PORTS).expect("stop");

    client.start(&PORTS, &Multiplier::Bps(1e9)).expect("start");
    let snapshot = client.stats(&PORTS).expect("stats");
    assert!(approx(snapshot.port(0).tx_bps, 1e9));
}

#[test]
fn rates_above_line_rate_are_rejected() {
    for mult in [
        Multiplier::Percent(150.0),
        Multiplier::Pps(20e6),
        Multiplier::Bps(9.9e9),
    ] {
        let mut client = ready_client(64);
        let err = client.start(&PORTS, &mult).expect_err("over line rate");
        assert!(
            err.to_string().contains("exceeds line rate"),
            "{mult}: {err}"
        );
        // 拒绝后端口仍空闲
        let infos = client.port_info(&PORTS).expect("port info");
        assert!(infos.iter().all(|i| i.status == PortStatus::Idle));
    }
}

#[test]
fn start_requires_streams_and_idle_port() {
    let mut client = SimClient::default();
    client.connect().expect("connect");
    let err = client
        .start(&PORTS, &Multiplier::default())
        .expect_err("no streams");
    assert!(matches!(err, ClientError::Port { port: 0, .. }));

    let mut client = ready_client(64);
    client.start(&PORTS, &Multiplier::Percent(10.0)).expect("start");
    assert!(client.start(&[1], &Multiplier::Percent(10.0)).is_err());
    let cfg = TrafficConfig::default();
    assert!(client.add_streams(0, vec![stream(&cfg, 0)]).is_err());
    assert!(
        client
            .set_l3_mode(0, Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .is_err()
    );
}

#[test]
fn invalid_field_engine_is_refused() {
    let mut client = ready_client(64);
    let cfg = TrafficConfig::default();
    let mut bad = stream(&cfg, 0);
    bad.engine = FieldEngine::new().push(Instruction::FixIpv4 { offset: 60 });
    bad.mode = TxMode::continuous();
    let err = client.add_streams(0, vec![bad]).expect_err("engine past end");
    assert!(matches!(err, ClientError::Stream(_)));
}

#[test]
fn counters_accumulate_and_freeze_after_stop() {
    let mut client = ready_client(64);
    client.clear_stats().expect("clear");
    client
        .start(&PORTS, &Multiplier::Pps(100_000.0))
        .expect("start");
    thread::sleep(Duration::from_millis(30));
    client.stop(&PORTS).expect("stop");

    let first = client.stats(&PORTS).expect("stats");
    let port0 = first.port(0);
    assert!(port0.opackets > 0);
    assert_eq!(port0.obytes, port0.opackets * 68);
    assert_eq!(port0.ipackets, first.port(1).opackets);
    assert_eq!(port0.tx_pps, 0.0);

    thread::sleep(Duration::from_millis(10));
    let second = client.stats(&PORTS).expect("stats");
    assert_eq!(first.port(0).counters(), second.port(0).counters());
    assert_eq!(second.total().opackets, port0.opackets + second.port(1).opackets);

    client.clear_stats().expect("clear");
    let cleared = client.stats(&PORTS).expect("stats");
    assert_eq!(cleared.total().counters(), [0; 6]);
}

#[test]
fn disconnect_stops_traffic() {
    let mut client = ready_client(64);
    client.start(&PORTS, &Multiplier::Percent(1.0)).expect("start");
    client.disconnect().expect("disconnect");
    assert!(!client.is_connected());
    assert!(matches!(
        client.stats(&PORTS),
        Err(ClientError::NotConnected)
    ));
    client.disconnect().expect("second disconnect");
}
