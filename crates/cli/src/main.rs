// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use blinkwire_config::{
    default_board, load_scenario, BoardDescriptor, DisplayExpectation, Scenario,
    ScenarioAssertion, ScenarioLimits, StopReason,
};
use blinkwire_core::board::DEFAULT_ACCESS_CYCLES;
use blinkwire_core::bus::BusFault;
use blinkwire_core::runner::{AssertionResult, FirmwareState, ObservedEvent};
use blinkwire_core::snapshot::{BoardSnapshot, DisplaySnapshot};
use blinkwire_core::{RunOptions, RunReport, RunStatus, ScenarioRunner};
use blinkwire_firmware::display::{encode_value, pack};
use blinkwire_firmware::{Notification, Period, PAUSE_DIGITS};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "BlinkWire board model runner", long_about = None)]
struct Cli {
    /// Log every firmware event and stimulus
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner mode driven by a scenario script (YAML).
    Test(TestArgs),

    /// Show the display patterns and notification produced for a period value.
    Encode(EncodeArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the scenario script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Path to the board descriptor (YAML); overrides `inputs.board`
    #[arg(short = 'b', long)]
    board: Option<PathBuf>,

    /// Override simulated run time
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Override max steps (takes precedence over script)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Clock cycles charged per firmware register access
    #[arg(long, default_value_t = DEFAULT_ACCESS_CYCLES, value_parser = clap::value_parser!(u64).range(1..))]
    access_cycles: u64,

    /// Disable UART stdout echo (still captured for assertions/artifacts)
    #[arg(long)]
    no_uart_stdout: bool,

    /// Directory to write test artifacts (result.json, snapshot.json, uart.log, junit.xml)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Optional path to write a JUnit XML report for CI systems
    #[arg(long)]
    junit: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Period in milliseconds, as set on the switches
    #[arg(value_parser = clap::value_parser!(u16).range(0..=1023))]
    value: u16,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    steps_executed: u64,
    cycles: u64,
    elapsed_ms: u64,
    stop_reason: StopReason,
    limits: ScenarioLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    firmware: Option<FirmwareState>,
    assertions: Vec<AssertionResult>,
    events: Vec<ObservedEvent>,
    fault_count: usize,
    script_hash: String,
    board_hash: String,
    config: TestConfig,
}

#[derive(Debug, Serialize, Clone)]
struct TestConfig {
    script: PathBuf,
    /// `None` when the built-in board was used.
    board: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Snapshot<'a> {
    Standard {
        board: &'a BoardSnapshot,
        faults: &'a [BusFault],
        steps_executed: u64,
        stop_reason: StopReason,
        limits: &'a ScenarioLimits,
        config: &'a TestConfig,
    },
    ConfigError {
        message: &'a str,
        limits: Option<&'a ScenarioLimits>,
        config: &'a TestConfig,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Test(args) => run_test(args),
        Commands::Encode(args) => run_encode(args),
    }
}

fn sha256_file(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            format!("{:x}", hasher.finalize())
        }
        Err(_) => String::new(),
    }
}

fn run_test(args: TestArgs) -> ExitCode {
    let mut config = TestConfig {
        script: args.script.clone(),
        board: args.board.clone(),
    };

    let scenario = match load_scenario(&args.script) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, &config, None, &msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut limits = scenario.limits.clone();
    if let Some(ms) = args.duration_ms {
        limits.duration_ms = ms;
    }
    if let Some(steps) = args.max_steps {
        limits.max_steps = Some(steps);
    }

    // Guard against accidentally huge runs from CI misconfiguration.
    const MAX_ALLOWED_DURATION_MS: u64 = 600_000;
    if limits.duration_ms == 0 || limits.duration_ms > MAX_ALLOWED_DURATION_MS {
        let msg = format!(
            "duration_ms {} must be within 1..={}",
            limits.duration_ms, MAX_ALLOWED_DURATION_MS
        );
        error!("{}", msg);
        write_config_error_outputs(&args, &config, Some(&limits), &msg);
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    config.board = args.board.clone().or_else(|| {
        scenario
            .inputs
            .board
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| resolve_script_path(&args.script, s))
    });

    let board = match load_board(config.board.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, &config, Some(&limits), &msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let scenario = Scenario {
        limits: limits.clone(),
        ..scenario
    };
    let options = RunOptions {
        echo_uart: !args.no_uart_stdout,
        duration_ms: None,
        access_cycles: args.access_cycles,
    };

    let start = std::time::Instant::now();
    let report = match ScenarioRunner::new(&board, &scenario, options).run() {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, &config, Some(&limits), &msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let duration = start.elapsed();

    write_outputs(&args, &config, &limits, &report, duration);

    match report.status {
        RunStatus::Pass => ExitCode::from(EXIT_PASS),
        RunStatus::Fail => ExitCode::from(EXIT_ASSERT_FAIL),
        RunStatus::Error => ExitCode::from(EXIT_RUNTIME_ERROR),
    }
}

fn load_board(path: Option<&Path>) -> anyhow::Result<BoardDescriptor> {
    match path {
        Some(p) => {
            info!("Loading board descriptor: {:?}", p);
            BoardDescriptor::from_file(p)
        }
        None => {
            info!("Using default board layout");
            default_board()
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    match std::fs::File::create(path) {
        Ok(f) => {
            if let Err(e) = serde_json::to_writer_pretty(f, value) {
                error!("Failed to write {:?}: {}", path, e);
            }
        }
        Err(e) => error!("Failed to create {:?}: {}", path, e),
    }
}

fn write_outputs(
    args: &TestArgs,
    config: &TestConfig,
    limits: &ScenarioLimits,
    report: &RunReport,
    duration: std::time::Duration,
) {
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: report.status.as_str().to_string(),
        steps_executed: report.steps_executed,
        cycles: report.cycles,
        elapsed_ms: report.elapsed_ms,
        stop_reason: report.stop_reason,
        limits: limits.clone(),
        message: None,
        firmware: Some(report.firmware.clone()),
        assertions: report.assertions.clone(),
        events: report.events.clone(),
        fault_count: report.faults.len(),
        script_hash: sha256_file(&config.script),
        board_hash: config.board.as_deref().map(sha256_file).unwrap_or_default(),
        config: config.clone(),
    };

    if let Some(output_dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            error!("Failed to create output directory {:?}: {}", output_dir, e);
        } else {
            write_json(&output_dir.join("result.json"), &result);

            let snapshot = Snapshot::Standard {
                board: &report.snapshot,
                faults: &report.faults,
                steps_executed: report.steps_executed,
                stop_reason: report.stop_reason,
                limits,
                config,
            };
            write_json(&output_dir.join("snapshot.json"), &snapshot);

            let uart_path = output_dir.join("uart.log");
            if let Err(e) = std::fs::write(&uart_path, report.uart_text.as_bytes()) {
                error!("Failed to write uart.log: {}", e);
            }

            if let Err(e) = write_junit_xml(&output_dir.join("junit.xml"), &result, duration) {
                error!("Failed to write junit.xml: {}", e);
            }
        }
    }

    if let Some(junit_path) = &args.junit {
        if let Some(parent) = junit_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = write_junit_xml(junit_path, &result, duration) {
            error!("Failed to write JUnit report {:?}: {}", junit_path, e);
        }
    }
}

fn write_config_error_outputs(
    args: &TestArgs,
    config: &TestConfig,
    limits: Option<&ScenarioLimits>,
    message: &str,
) {
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: RunStatus::Error.as_str().to_string(),
        steps_executed: 0,
        cycles: 0,
        elapsed_ms: 0,
        stop_reason: StopReason::ConfigError,
        limits: limits.cloned().unwrap_or(ScenarioLimits {
            duration_ms: 0,
            max_steps: None,
            release_poll_limit: None,
            max_uart_bytes: None,
        }),
        message: Some(message.to_string()),
        firmware: None,
        assertions: vec![],
        events: vec![],
        fault_count: 0,
        script_hash: sha256_file(&config.script),
        board_hash: config.board.as_deref().map(sha256_file).unwrap_or_default(),
        config: config.clone(),
    };

    if let Some(output_dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            error!("Failed to create output directory {:?}: {}", output_dir, e);
        } else {
            write_json(&output_dir.join("result.json"), &result);
            let snapshot = Snapshot::ConfigError {
                message,
                limits,
                config,
            };
            write_json(&output_dir.join("snapshot.json"), &snapshot);

            if let Err(e) = std::fs::write(output_dir.join("uart.log"), b"") {
                error!("Failed to write uart.log: {}", e);
            }
            if let Err(e) = write_junit_xml(
                &output_dir.join("junit.xml"),
                &result,
                std::time::Duration::ZERO,
            ) {
                error!("Failed to write junit.xml: {}", e);
            }
        }
    }

    if let Some(junit_path) = &args.junit {
        if let Some(parent) = junit_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = write_junit_xml(junit_path, &result, std::time::Duration::ZERO) {
            error!("Failed to write JUnit report {:?}: {}", junit_path, e);
        }
    }
}

fn resolve_script_path(script_path: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_absolute() {
        return p;
    }
    script_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .join(p)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn write_junit_xml(
    path: &Path,
    result: &TestResult,
    duration: std::time::Duration,
) -> std::io::Result<()> {
    let any_assertion_failed = result.assertions.iter().any(|a| !a.passed);
    let any_expected_stop_reason_matched = result
        .assertions
        .iter()
        .any(|a| matches!(a.assertion, ScenarioAssertion::ExpectedStopReason(_)) && a.passed);
    let stop_requires_assertion = matches!(result.stop_reason, StopReason::MaxUartBytes);

    let mut details = String::new();
    details.push_str(&format!(
        "result_schema_version={}\n",
        RESULT_SCHEMA_VERSION
    ));
    details.push_str(&format!("stop_reason={:?}\n", result.stop_reason));
    if let Some(msg) = &result.message {
        details.push_str(&format!("message={}\n", msg));
    }
    details.push_str(&format!("steps_executed={}\n", result.steps_executed));
    details.push_str(&format!("cycles={}\n", result.cycles));
    details.push_str(&format!("elapsed_ms={}\n", result.elapsed_ms));
    details.push_str("limits:\n");
    details.push_str(&format!("  - duration_ms={}\n", result.limits.duration_ms));
    if let Some(v) = result.limits.max_steps {
        details.push_str(&format!("  - max_steps={}\n", v));
    }
    if let Some(v) = result.limits.release_poll_limit {
        details.push_str(&format!("  - release_poll_limit={}\n", v));
    }
    if let Some(v) = result.limits.max_uart_bytes {
        details.push_str(&format!("  - max_uart_bytes={}\n", v));
    }
    details.push_str(&format!("script={}\n", result.config.script.display()));
    details.push_str(&format!("script_hash={}\n", result.script_hash));
    if let Some(board) = &result.config.board {
        details.push_str(&format!("board={}\n", board.display()));
        details.push_str(&format!("board_hash={}\n", result.board_hash));
    }
    if !result.assertions.is_empty() {
        details.push_str("assertions:\n");
        for a in &result.assertions {
            details.push_str(&format!("  - {:?}: {} ({})\n", a.assertion, a.passed, a.detail));
        }
    }

    let time_secs = duration.as_secs_f64();
    let status = result.status.as_str();

    let mut tests: u64 = 0;
    let mut failures: u64 = 0;
    let mut errors: u64 = 0;
    let mut testcases = String::new();

    // The "run" testcase carries failures that are not tied to one assertion.
    tests += 1;
    testcases.push_str(&format!(
        "  <testcase classname=\"blinkwire\" name=\"run\" time=\"{:.6}\">\n",
        time_secs
    ));
    if status == "error" {
        let err_type = if result.stop_reason == StopReason::ConfigError {
            "config error"
        } else {
            "runtime error"
        };
        errors += 1;
        testcases.push_str(&format!(
            "    <error message=\"{}\">{}</error>\n",
            xml_escape(err_type),
            xml_escape(&details)
        ));
    } else if status == "fail" && stop_requires_assertion && !any_expected_stop_reason_matched {
        failures += 1;
        testcases.push_str(&format!(
            "    <failure message=\"{}\">{}</failure>\n",
            xml_escape("stop condition requires expected_stop_reason assertion"),
            xml_escape(&details)
        ));
    } else if status == "fail" && !any_assertion_failed {
        failures += 1;
        testcases.push_str(&format!(
            "    <failure message=\"failure\">{}</failure>\n",
            xml_escape(&details)
        ));
    }
    testcases.push_str("  </testcase>\n");

    for (idx, a) in result.assertions.iter().enumerate() {
        tests += 1;
        let name = format!(
            "assertion {}: {}",
            idx + 1,
            assertion_short_name(&a.assertion)
        );
        testcases.push_str(&format!(
            "  <testcase classname=\"blinkwire\" name=\"{}\" time=\"0.000000\">\n",
            xml_escape(&name)
        ));
        if !a.passed {
            failures += 1;
            testcases.push_str(&format!(
                "    <failure message=\"assertion failed\">{}</failure>\n",
                xml_escape(&format!("{}\n{}\n\n{}", name, a.detail, details))
            ));
        }
        testcases.push_str("  </testcase>\n");
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="blinkwire" tests="{}" failures="{}" errors="{}" time="{:.6}">"#,
        tests, failures, errors, time_secs
    ));
    xml.push('\n');
    xml.push_str("  <properties>\n");
    xml.push_str(&format!(
        "    <property name=\"result_schema_version\" value=\"{}\"/>\n",
        xml_escape(RESULT_SCHEMA_VERSION)
    ));
    xml.push_str(&format!(
        "    <property name=\"stop_reason\" value=\"{}\"/>\n",
        xml_escape(&format!("{:?}", result.stop_reason))
    ));
    xml.push_str(&format!(
        "    <property name=\"script_hash\" value=\"{}\"/>\n",
        xml_escape(&result.script_hash)
    ));
    xml.push_str("  </properties>\n");
    xml.push_str(&testcases);
    xml.push_str("</testsuite>\n");

    std::fs::write(path, xml)
}

fn assertion_short_name(assertion: &ScenarioAssertion) -> String {
    const MAX_LEN: usize = 120;
    let s = match assertion {
        ScenarioAssertion::UartContains(a) => {
            format!("uart_contains: {}", a.uart_contains.escape_debug())
        }
        ScenarioAssertion::ExpectedPeriod(a) => format!("expected_period: {}", a.expected_period),
        ScenarioAssertion::ExpectedPaused(a) => format!("expected_paused: {}", a.expected_paused),
        ScenarioAssertion::ExpectedDisplay(a) => match a.expected_display {
            DisplayExpectation::Value(v) => format!("expected_display: {}", v),
            DisplayExpectation::Word(_) => "expected_display: pause".to_string(),
        },
        ScenarioAssertion::TimerRunning(a) => format!("timer_running: {}", a.timer_running),
        ScenarioAssertion::MinLedToggles(a) => format!("min_led_toggles: {}", a.min_led_toggles),
        ScenarioAssertion::ExpectedStopReason(a) => {
            format!("expected_stop_reason: {:?}", a.expected_stop_reason)
        }
    };

    if s.len() <= MAX_LEN {
        return s;
    }

    let mut truncated = s.chars().take(MAX_LEN - 1).collect::<String>();
    truncated.push('…');
    truncated
}

#[derive(Debug, Serialize)]
struct EncodeOutput {
    value: u16,
    digits: [u8; 6],
    hex_high: u32,
    hex_low: u32,
    display: String,
    pause_hex_high: u32,
    pause_hex_low: u32,
    /// `None` for 0, which the firmware refuses to load.
    notification: Option<String>,
}

fn run_encode(args: EncodeArgs) -> ExitCode {
    let digits = encode_value(args.value);
    let [d0, d1, d2, d3, d4, d5] = digits;
    let [p0, p1, p2, p3, p4, p5] = PAUSE_DIGITS;
    let notification = Period::from_switches(args.value).map(|p| {
        let note = Notification::new(p.as_ms());
        String::from_utf8_lossy(note.as_bytes()).into_owned()
    });

    let out = EncodeOutput {
        value: args.value,
        digits,
        hex_high: pack(&[d0, d1, d2]),
        hex_low: pack(&[d3, d4, d5]),
        display: DisplaySnapshot::new(pack(&[d0, d1, d2]), pack(&[d3, d4, d5])).text,
        pause_hex_high: pack(&[p0, p1, p2]),
        pause_hex_low: pack(&[p3, p4, p5]),
        notification,
    };

    if args.json {
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                error!("Failed to encode JSON: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
        return ExitCode::from(EXIT_PASS);
    }

    println!("value:        {}", out.value);
    println!(
        "digits:       {}",
        out.digits
            .iter()
            .map(|d| format!("{:#04x}", d))
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!("hex_high:     {:#010x}", out.hex_high);
    println!("hex_low:      {:#010x}", out.hex_low);
    println!("display:      \"{}\"", out.display);
    println!(
        "pause:        {:#010x} {:#010x}",
        out.pause_hex_high, out.pause_hex_low
    );
    match &out.notification {
        Some(text) => println!("notification: \"{}\"", text.escape_debug()),
        None => println!("notification: (none, zero period is ignored)"),
    }
    ExitCode::from(EXIT_PASS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_script_path_relative() {
        let p = resolve_script_path(Path::new("configs/scenarios/a.yaml"), "../boards/b.yaml");
        assert_eq!(p, PathBuf::from("configs/scenarios/../boards/b.yaml"));
    }

    #[test]
    fn test_resolve_script_path_absolute() {
        let p = resolve_script_path(Path::new("configs/a.yaml"), "/tmp/board.yaml");
        assert_eq!(p, PathBuf::from("/tmp/board.yaml"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }

    #[test]
    fn test_assertion_short_name_escapes_controls() {
        let a = ScenarioAssertion::UartContains(blinkwire_config::UartContainsAssertion {
            uart_contains: "ms\n\r".to_string(),
        });
        assert_eq!(assertion_short_name(&a), "uart_contains: ms\\n\\r");
    }
}
