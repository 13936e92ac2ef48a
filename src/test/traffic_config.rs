use std::fs;
use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::ValueEnum;

use crate::ctl::{ConfigError, Multiplier, Profile, TrafficConfig, port_pair};

fn temp_config(name: &str, contents: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "perfctl-rs-{name}-{}-{nanos}.json",
        std::process::id()
    ));
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn multiplier_parses_all_forms() {
    let cases = [
        ("100%", Multiplier::Percent(100.0)),
        ("12.5%", Multiplier::Percent(12.5)),
        ("2.5", Multiplier::Factor(2.5)),
        ("1000pps", Multiplier::Pps(1000.0)),
        ("500kpps", Multiplier::Pps(500e3)),
        ("1.5MPPS", Multiplier::Pps(1.5e6)),
        ("10gbps", Multiplier::Bps(10e9)),
        ("200mbps", Multiplier::Bps(200e6)),
        (" 3kbps ", Multiplier::Bps(3e3)),
    ];
    for (raw, expected) in cases {
        assert_eq!(Multiplier::parse(raw).expect(raw), expected, "{raw}");
    }
}

#[test]
fn multiplier_rejects_garbage() {
    for raw in ["", "%", "abc", "-5%", "0", "0pps", "10k", "1.5xpps", "nan", "inf%"] {
        let err = Multiplier::parse(raw).expect_err(raw);
        assert!(matches!(err, ConfigError::Multiplier(ref s) if s == raw), "{raw}");
    }
}

#[test]
fn multiplier_display_round_trips() {
    let cases = [
        (Multiplier::Percent(100.0), "100%"),
        (Multiplier::Factor(2.5), "2.5"),
        (Multiplier::Pps(1.5e6), "1.5mpps"),
        (Multiplier::Pps(42.0), "42pps"),
        (Multiplier::Bps(10e9), "10gbps"),
        (Multiplier::Bps(3e3), "3kbps"),
    ];
    for (mult, shown) in cases {
        assert_eq!(mult.to_string(), shown);
        assert_eq!(shown.parse::<Multiplier>().expect(shown), mult);
    }
    assert_eq!(Multiplier::default(), Multiplier::Percent(100.0));
}

#[test]
fn profile_accepts_names_and_aliases() {
    for (raw, expected) in [
        ("l3-base-ip4", Profile::BaseIp4),
        ("base", Profile::BaseIp4),
        ("l3-scale-ip4", Profile::ScaleIp4),
        ("scale", Profile::ScaleIp4),
        ("l3-geneve-ip4", Profile::GeneveIp4),
        ("geneve", Profile::GeneveIp4),
    ] {
        assert_eq!(Profile::from_str(raw, false).expect(raw), expected);
        let json: Profile = serde_json::from_str(&format!("\"{raw}\"")).expect(raw);
        assert_eq!(json, expected);
    }
    assert!(Profile::from_str("l3-bogus", false).is_err());
    assert_eq!(Profile::GeneveIp4.to_string(), "l3-geneve-ip4");
    assert_eq!(Profile::default(), Profile::BaseIp4);
}

#[test]
fn defaults_match_command_line_defaults() {
    let cfg = TrafficConfig::default();
    assert_eq!(cfg.pkt_len, 64);
    assert_eq!(cfg.multiplier, Multiplier::Percent(100.0));
    assert_eq!(cfg.profile, Profile::BaseIp4);
    assert_eq!(
        cfg.ip_addr,
        [Ipv4Addr::new(172, 16, 0, 2), Ipv4Addr::new(172, 16, 1, 2)]
    );
    assert_eq!(
        cfg.default_gw,
        [Ipv4Addr::new(172, 16, 0, 1), Ipv4Addr::new(172, 16, 1, 1)]
    );
    assert_eq!(cfg.range_mask, [Ipv4Addr::new(0, 127, 255, 248); 2]);
    assert_eq!(cfg.vni, [101, 102]);
    assert_eq!(cfg.duration(), None);
    cfg.validate().expect("defaults are valid");
}

#[test]
fn json_config_fills_missing_fields_with_defaults() {
    let cfg: TrafficConfig = serde_json::from_str(
        r#"{
            "pkt_len": 128,
            "multiplier": "1mpps",
            "profile": "geneve",
            "vni": [5, 6],
            "duration_secs": 3
        }"#,
    )
    .expect("parse config");
    assert_eq!(cfg.pkt_len, 128);
    assert_eq!(cfg.multiplier, Multiplier::Pps(1e6));
    assert_eq!(cfg.profile, Profile::GeneveIp4);
    assert_eq!(cfg.vni, [5, 6]);
    assert_eq!(cfg.duration(), Some(Duration::from_secs(3)));
    assert_eq!(cfg.ip_addr, TrafficConfig::default().ip_addr);
}

#[test]
fn json_config_rejects_unknown_and_malformed_fields() {
    assert!(serde_json::from_str::<TrafficConfig>(r#"{"pkt_size": 64}"#).is_err());
    assert!(serde_json::from_str::<TrafficConfig>(r#"{"multiplier": "fast"}"#).is_err());
    assert!(serde_json::from_str::<TrafficConfig>(r#"{"ip_addr": ["1.2.3.4"]}"#).is_err());
}

#[test]
fn config_file_errors_name_the_path() {
    let path = temp_config("bad", "{ not json");
    let err = TrafficConfig::from_json_file(&path).expect_err("malformed file");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains(&path.display().to_string()));
    let _ = fs::remove_file(&path);

    let missing = std::env::temp_dir().join("perfctl-rs-does-not-exist.json");
    let err = TrafficConfig::from_json_file(&missing).expect_err("missing file");
    assert!(matches!(err, ConfigError::Read { .. }));

    let path = temp_config("good", r#"{"profile": "l3-scale-ip4"}"#);
    let cfg = TrafficConfig::from_json_file(&path).expect("valid file");
    assert_eq!(cfg.profile, Profile::ScaleIp4);
    let _ = fs::remove_file(&path);
}

#[test]
fn validate_checks_packet_length_and_vni() {
    let with_len = |pkt_len| TrafficConfig {
        pkt_len,
        ..TrafficConfig::default()
    };
    assert!(matches!(
        with_len(59).validate(),
        Err(ConfigError::PacketLength(59))
    ));
    assert!(with_len(60).validate().is_ok());
    assert!(with_len(9216).validate().is_ok());
    assert!(matches!(
        with_len(9217).validate(),
        Err(ConfigError::PacketLength(9217))
    ));

    let cfg = TrafficConfig {
        vni: [1, 1 << 24],
        ..TrafficConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(ConfigError::Vni(v)) if v == 1 << 24));
}

#[test]
fn port_pair_requires_exactly_two_values() {
    assert_eq!(port_pair("vni", &[7u32, 8]).expect("pair"), [7, 8]);

    for values in [&[][..], &[1u32][..], &[1, 2, 3][..]] {
        let err = port_pair("vni", values).expect_err("wrong arity");
        assert_eq!(
            err.to_string(),
            format!(
                "--vni expects exactly two values (one per port), got {}",
                values.len()
            )
        );
    }
}
