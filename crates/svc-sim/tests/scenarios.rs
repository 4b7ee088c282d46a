//! End-to-end tests driving the simulator the way a storage driver does.
//!
//! These tests verify:
//! 1. Volume creation and the object view a driver reads back
//! 2. Host mapping guarding volume deletion
//! 3. FlashCopy progress driven by listing polls
//! 4. Remote copy synchronization driven by listing polls
//! 5. The exit-code contract and fault injection

use svc_sim::{
    CliResponse, CommandLog, Error, ErrorCode, FaultTag, FcMapState, RcState, Simulator,
    SimulatorConfig,
};

fn run(sim: &mut Simulator, argv: &[&str]) -> String {
    sim.execute_command(argv, true).expect("command should succeed").stdout
}

fn run_line(sim: &mut Simulator, line: &str) -> String {
    sim.execute_line(line, true).expect("command should succeed").stdout
}

fn stderr(sim: &mut Simulator, line: &str) -> String {
    let out = sim.execute_line(line, false).expect("raw output");
    assert!(!out.is_success(), "{line} should fail");
    out.stderr
}

fn mkvdisk(sim: &mut Simulator, name: &str) {
    run(sim, &[
        "svctask", "mkvdisk", "-name", name, "-size", "1", "-unit", "gb", "-mdiskgrp",
        "\"openstack\"", "-iogrp", "0",
    ]);
}

fn object(stdout: &str) -> CliResponse {
    CliResponse::parse(stdout, "!", false).expect("object view parses")
}

// ============================================================================
// Volumes
// ============================================================================

#[test]
fn test_volume_object_view_reports_bytes_and_pool() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");

    let out = run(&mut sim, &["svcinfo", "lsvdisk", "-delim", "!", "-obj", "v1"]);
    let view = object(&out);
    let record = view.first().expect("one record");
    assert_eq!(record.get("capacity"), Some("1073741824"));
    assert_eq!(record.get("mdisk_grp_name"), Some("openstack"));
    assert_eq!(record.get("name"), Some("v1"));
}

#[test]
fn test_ids_reuse_the_smallest_free_slot() {
    let mut sim = Simulator::default();
    for name in ["a", "b", "c"] {
        mkvdisk(&mut sim, name);
    }
    run_line(&mut sim, "rmvdisk b");
    mkvdisk(&mut sim, "d");
    assert_eq!(sim.volumes().get("d").map(|v| v.id), Some(1));
}

#[test]
fn test_listing_filter_nohdr_and_delim() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");
    mkvdisk(&mut sim, "v2");

    let out = run_line(&mut sim, "lsvdisk -delim : -filtervalue name=v2");
    let listing = CliResponse::parse(&out, ":", true).expect("listing parses");
    assert_eq!(listing.select(&["id", "name"]), vec![vec![
        "1".to_string(),
        "v2".to_string()
    ]]);

    let out = run_line(&mut sim, "lsvdisk -nohdr");
    assert_eq!(out.lines().count(), 2);
    assert!(out.lines().all(|line| !line.starts_with("id ")));
}

// ============================================================================
// Hosts
// ============================================================================

#[test]
fn test_mapped_volume_cannot_be_removed_without_force() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");
    run_line(&mut sim, "mkhost -name h1 -iscsiname iqn.x");
    run_line(&mut sim, "mkvdiskhostmap -obj v1 -host h1");

    let out = sim.execute_line("rmvdisk -obj v1", false).expect("raw output");
    assert!(out.stderr.starts_with("CMMVC5840E"));
    assert_eq!(out.exit_code(), 1);
    assert!(sim.volumes().contains("v1"));

    run_line(&mut sim, "rmvdisk -force -obj v1");
    assert!(!sim.volumes().contains("v1"));
    assert!(sim.host_mappings().is_empty());
}

#[test]
fn test_duplicate_port_leaves_both_hosts_unchanged() {
    let mut sim = Simulator::default();
    run_line(&mut sim, "mkhost -name h1 -iscsiname iqn.one");
    run_line(&mut sim, "mkhost -name h2 -iscsiname iqn.two");

    assert!(stderr(&mut sim, "addhostport -iscsiname iqn.one h2").starts_with("CMMVC6581E"));
    assert_eq!(sim.hosts().get("h1").map(svc_sim::Host::port_count), Some(1));
    assert_eq!(sim.hosts().get("h2").map(svc_sim::Host::port_count), Some(1));
}

#[test]
fn test_same_host_cannot_map_a_volume_twice_without_force() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");
    run_line(&mut sim, "mkhost -name h1 -iscsiname iqn.x");
    run_line(&mut sim, "mkvdiskhostmap -host h1 v1");

    assert!(stderr(&mut sim, "mkvdiskhostmap -host h1 v1").starts_with("CMMVC6071E"));
    assert_eq!(sim.host_mappings().len(), 1);

    run_line(&mut sim, "mkvdiskhostmap -force -host h1 v1");
    assert_eq!(sim.host_mappings().len(), 2);
}

// ============================================================================
// FlashCopy
// ============================================================================

#[test]
fn test_flashcopy_reaches_copied_in_two_polls() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");
    mkvdisk(&mut sim, "v2");
    run_line(&mut sim, "mkfcmap -source v1 -target v2 -copyrate 50");
    run_line(&mut sim, "prestartfcmap 0");
    run_line(&mut sim, "startfcmap 0");

    let poll = |sim: &mut Simulator| {
        let out = run_line(sim, "lsfcmap -delim ! -filtervalue id=0");
        CliResponse::parse(&out, "!", true)
            .expect("listing parses")
            .select(&["status", "progress"])
    };
    assert_eq!(poll(&mut sim), vec![vec![
        "copying".to_string(),
        "50".to_string()
    ]]);
    assert_eq!(poll(&mut sim), vec![vec![
        "idle_or_copied".to_string(),
        "100".to_string()
    ]]);
    assert_eq!(
        sim.fc_mappings().get("fcmap0").map(|fc| fc.state),
        Some(FcMapState::IdleOrCopied)
    );
}

#[test]
fn test_flashcopy_target_guards_deletion() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");
    mkvdisk(&mut sim, "v2");
    run_line(&mut sim, "mkfcmap -source v1 -target v2");
    assert!(stderr(&mut sim, "rmvdisk v1").starts_with("CMMVC5840E"));
    assert!(stderr(&mut sim, "rmvdisk v2").starts_with("CMMVC5840E"));
    run_line(&mut sim, "rmvdisk -force v2");
    assert!(sim.fc_mappings().is_empty());
}

// ============================================================================
// Remote copy
// ============================================================================

#[test]
fn test_remote_copy_synchronizes_in_two_polls() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");
    mkvdisk(&mut sim, "v2");
    run_line(&mut sim, "mkrcrelationship -master v1 -aux v2 -cluster aux-svc-sim");

    let state = |sim: &mut Simulator| {
        let out = run_line(sim, "lsrcrelationship -delim ! rcrel0");
        let view = object(&out);
        let record = view.first().expect("one record");
        (
            record.get("state").map(str::to_string),
            record.get("progress").map(str::to_string),
        )
    };

    assert_eq!(
        sim.rc_relationships().get("rcrel0").map(|rc| rc.state),
        Some(RcState::InconsistentStopped)
    );
    run_line(&mut sim, "startrcrelationship rcrel0");
    assert_eq!(
        state(&mut sim),
        (Some("inconsistent_copying".to_string()), Some("50".to_string()))
    );
    assert_eq!(
        state(&mut sim),
        (Some("consistent_synchronized".to_string()), Some("100".to_string()))
    );
}

// ============================================================================
// Dispatcher contract
// ============================================================================

#[test]
fn test_check_exit_code_raises_with_command_line() {
    let mut sim = Simulator::default();
    let err = sim
        .execute_command(&["svctask", "rmhost", "ghost"], true)
        .expect_err("missing host");
    let Error::ProcessExecution {
        exit_code,
        stdout,
        stderr,
        cmd,
    } = err
    else {
        panic!("expected a process execution failure");
    };
    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.starts_with(ErrorCode::Cmmvc5753e.code()));
    assert_eq!(cmd, "svctask rmhost ghost");
}

#[test]
fn test_malformed_size_and_switch_are_cli_errors() {
    let mut sim = Simulator::default();
    for line in [
        "mkvdisk -name v1 -size lots -unit gb -mdiskgrp openstack -iogrp 0",
        "mkvdisk -name v1 -size 1 -unit zb -mdiskgrp openstack -iogrp 0",
        "mkvdisk -name v1 -size 1 -unit gb -mdiskgrp openstack -iogrp 0 -easytier maybe",
    ] {
        let out = sim.execute_line(line, false).expect("array answers");
        assert!(out.stderr.starts_with("CMMVC5707E"), "{line}: {}", out.stderr);
    }
    assert!(sim.volumes().is_empty());

    mkvdisk(&mut sim, "v1");
    assert!(stderr(&mut sim, "expandvdisksize -size x -unit gb v1").starts_with("CMMVC5707E"));
    assert!(stderr(&mut sim, "chvdisk -autoexpand maybe v1").starts_with("CMMVC5707E"));
}

#[test]
fn test_unknown_verb_is_invalid_input() {
    let mut sim = Simulator::default();
    let err = sim.execute_line("mkunicorn -name x", false).expect_err("unknown verb");
    assert!(matches!(err, Error::InvalidInput { .. }));
}

#[test]
fn test_injected_fault_fires_once() {
    let mut sim = Simulator::default();
    mkvdisk(&mut sim, "v1");
    sim.error_injection("lsvdisk", FaultTag::NoPrefNode);

    let out = run_line(&mut sim, "lsvdisk -delim ! v1");
    assert!(object(&out).first().and_then(|r| r.get("preferred_node_id")).is_none());
    let out = run_line(&mut sim, "lsvdisk -delim ! v1");
    assert!(object(&out).first().and_then(|r| r.get("preferred_node_id")).is_some());
}

#[test]
fn test_command_log_is_owned_by_the_harness() {
    let log = CommandLog::new();
    let mut sim = Simulator::new(SimulatorConfig::default())
        .expect("default config is valid")
        .with_command_log(log.clone());
    mkvdisk(&mut sim, "v1");
    let _ = sim.execute_line("rmvdisk ghost", false).expect("raw output");

    assert_eq!(log.len(), 2);
    assert_eq!(log.query("mkvdisk").len(), 1);
    assert!(log.query("rmvdisk")[0].failed());
    log.clear();
    assert!(log.is_empty());
}
