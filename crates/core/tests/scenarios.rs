// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use blinkwire_config::{load_scenario, BoardDescriptor, StopReason};
use blinkwire_core::bus::SystemBus;
use blinkwire_core::peripherals::interval_timer::IntervalTimer;
use blinkwire_core::{RunOptions, RunReport, RunStatus, ScenarioRunner};
use std::path::PathBuf;

fn configs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs")
}

fn run_config(name: &str) -> RunReport {
    let script = configs_dir().join("scenarios").join(name);
    let scenario = load_scenario(&script).expect("scenario should load");
    let board_rel = scenario.inputs.board.clone().expect("scenario names a board");
    let board_path = script.parent().unwrap().join(board_rel);
    let board = BoardDescriptor::from_file(&board_path).expect("board should load");

    let options = RunOptions {
        echo_uart: false,
        ..RunOptions::default()
    };
    ScenarioRunner::new(&board, &scenario, options)
        .run()
        .expect("run should start")
}

fn assert_pass(report: &RunReport) {
    let failed: Vec<_> = report
        .assertions
        .iter()
        .filter(|a| !a.passed)
        .map(|a| format!("{:?}: {}", a.assertion, a.detail))
        .collect();
    assert_eq!(report.status, RunStatus::Pass, "failed: {:?}", failed);
}

#[test]
fn test_config_load_250() {
    let report = run_config("load_250.yaml");
    assert_pass(&report);
    assert_eq!(report.stop_reason, StopReason::Duration);
    assert!(report.faults.is_empty());
    assert_eq!(report.snapshot.uart_tx_bytes, 22);
}

#[test]
fn test_config_pause_resume() {
    let report = run_config("pause_resume.yaml");
    assert_pass(&report);
    assert_eq!(report.snapshot.display.text, "000042");
}

#[test]
fn test_config_load_while_paused() {
    let report = run_config("load_while_paused.yaml");
    assert_pass(&report);
    assert_eq!(report.snapshot.display.text, " PAUSE");
}

#[test]
fn test_config_slow_clock_board() {
    let report = run_config("slow_clock_default.yaml");
    assert_pass(&report);
    // 10 MHz board: one timer tick per clock cycle, 10_000 per ms.
    assert_eq!(report.snapshot.timer.period_ticks, 1000 * 10_000);
    assert!(report.uart_text.starts_with("New Period:001000 ms"));
}

#[test]
fn test_all_sample_boards_build() {
    for entry in std::fs::read_dir(configs_dir().join("boards")).unwrap() {
        let path = entry.unwrap().path();
        let board = BoardDescriptor::from_file(&path).unwrap();
        let bus = SystemBus::from_config(&board).unwrap();
        let timer_base = board.bound_base("timer").unwrap();
        assert!(
            bus.device::<IntervalTimer>(timer_base).is_some(),
            "{:?} has no timer model at {:#x}",
            path,
            timer_base
        );
    }
}

#[test]
fn test_report_serializes() {
    let report = run_config("load_250.yaml");
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "pass");
    assert_eq!(json["stop_reason"], "duration");
    assert_eq!(json["firmware"]["period_ms"], 250);
    assert_eq!(json["snapshot"]["display"]["text"], "000250");
    assert!(json["snapshot"]["peripherals"]["interval_timer"].is_object());
}
