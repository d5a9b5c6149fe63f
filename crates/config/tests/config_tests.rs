// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use blinkwire_config::{
    load_scenario, BoardDescriptor, PeripheralKind, StimulusAction, StopReason,
};
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("blinkwire-config-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

const MINIMAL_BOARD: &str = r#"
name: "minimal"
peripherals:
  - id: "sw"
    type: "pio_in"
    base_address: 0x100
  - id: "keys"
    type: "pio_in"
    base_address: 0x110
  - id: "hex_a"
    type: "pio_out"
    base_address: 0x120
  - id: "hex_b"
    type: "pio_out"
    base_address: 0x130
  - id: "leds"
    type: "pio_out"
    base_address: 0x140
  - id: "tmr"
    type: "interval_timer"
    base_address: 0x200
    irq: 3
  - id: "uart"
    type: "jtag_uart"
    base_address: 0x300
bindings:
  switches: "sw"
  buttons: "keys"
  hex_low: "hex_a"
  hex_high: "hex_b"
  leds: "leds"
  timer: "tmr"
  jtag_uart: "uart"
"#;

#[test]
fn test_minimal_board_defaults() {
    let path = write_temp_file("board", MINIMAL_BOARD);
    let board = BoardDescriptor::from_file(&path).unwrap();
    assert_eq!(board.schema_version, "1.0");
    assert_eq!(board.clock_hz, 50_000_000);
    assert_eq!(board.firmware.default_period_ms, None);
    assert_eq!(board.peripheral("tmr").unwrap().irq, Some(3));
    assert_eq!(
        board.peripheral("uart").unwrap().kind(),
        Some(PeripheralKind::JtagUart)
    );
}

#[test]
fn test_firmware_overrides_parse() {
    let yaml = format!(
        "{}firmware:\n  default_period_ms: 500\n  settle_ms: 5\n",
        MINIMAL_BOARD
    );
    let board = BoardDescriptor::from_yaml(&yaml).unwrap();
    assert_eq!(board.firmware.default_period_ms, Some(500));
    assert_eq!(board.firmware.settle_ms, Some(5));
    assert_eq!(board.firmware.release_ms, None);
}

#[test]
fn test_out_of_range_default_period_rejected() {
    let yaml = format!("{}firmware:\n  default_period_ms: 2000\n", MINIMAL_BOARD);
    let err = BoardDescriptor::from_yaml(&yaml).unwrap_err();
    assert!(err.to_string().contains("default_period_ms"));
}

#[test]
fn test_timer_without_irq_rejected() {
    let yaml = MINIMAL_BOARD.replace("    irq: 3\n", "");
    let err = BoardDescriptor::from_yaml(&yaml).unwrap_err();
    assert!(err.to_string().contains("must declare an irq"));
}

#[test]
fn test_unknown_peripheral_type_rejected() {
    let yaml = MINIMAL_BOARD.replace("type: \"jtag_uart\"", "type: \"uart16550\"");
    let err = BoardDescriptor::from_yaml(&yaml).unwrap_err();
    assert!(err.to_string().contains("unknown type 'uart16550'"));
}

#[test]
fn test_overlapping_windows_rejected() {
    let yaml = MINIMAL_BOARD.replace("base_address: 0x300", "base_address: 0x210");
    let err = BoardDescriptor::from_yaml(&yaml).unwrap_err();
    assert!(err
        .to_string()
        .contains("Peripheral 'uart' at 0x210 overlaps 'tmr' (0x200..0x220)"));
}

#[test]
fn test_adjacent_windows_accepted() {
    let yaml = MINIMAL_BOARD.replace("base_address: 0x300", "base_address: 0x220");
    assert!(BoardDescriptor::from_yaml(&yaml).is_ok());
}

#[test]
fn test_duplicate_id_rejected() {
    let yaml = MINIMAL_BOARD.replace("id: \"hex_b\"", "id: \"hex_a\"");
    let err = BoardDescriptor::from_yaml(&yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate peripheral id"));
}

#[test]
fn test_load_scenario_from_disk() {
    let path = write_temp_file(
        "scenario",
        r#"
schema_version: "1.0"
inputs:
  board: "boards/de10.yaml"
limits:
  duration_ms: 1500
  max_steps: 100000
  max_uart_bytes: 256
events:
  - at_ms: 0
    set_switches: 1023
  - at_ms: 100
    click:
      button: pause
      hold_ms: 30
assertions:
  - expected_paused: true
  - timer_running: false
  - min_led_toggles: 2
  - expected_stop_reason: max_steps
"#,
    );
    let s = load_scenario(&path).unwrap();
    assert_eq!(s.inputs.board.as_deref(), Some("boards/de10.yaml"));
    assert_eq!(s.limits.max_uart_bytes, Some(256));
    assert_eq!(s.limits.release_poll_limit, None);
    assert!(matches!(
        s.events[1].action,
        StimulusAction::Click { hold_ms: 30, .. }
    ));
    assert_eq!(s.assertions.len(), 4);
    let reason = serde_yaml::to_string(&StopReason::ReleaseTimeout).unwrap();
    assert_eq!(reason.trim(), "release_timeout");
}

#[test]
fn test_load_scenario_missing_file() {
    let err = load_scenario("/nonexistent/blinkwire/scenario.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read scenario"));
}

#[test]
fn test_switch_value_wider_than_bank_rejected() {
    let path = write_temp_file(
        "wide-switches",
        r#"
schema_version: "1.0"
limits:
  duration_ms: 10
events:
  - at_ms: 0
    set_switches: 1024
"#,
    );
    let err = load_scenario(&path).unwrap_err();
    assert!(err.to_string().contains("exceeds 10 bits"));
}
