use std::cell::RefCell;
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};

use bigdecimal::num_bigint::BigInt;
use ledger_tools::events::{EventSink, Field};
use ledger_tools::pipeline::Pipeline;
use ledger_tools::{ErrorKind, Result};
use tempfile::{TempDir, tempdir};
use tracing::Level;

const HEADER: &str = "sku,qty,unit_price\n";

#[derive(Debug, Clone, PartialEq)]
struct Event {
    level: Level,
    message: String,
    fields: Vec<(String, String)>,
}

#[derive(Default)]
struct RecordingSink {
    events: RefCell<Vec<Event>>,
}

impl EventSink for RecordingSink {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        self.events.borrow_mut().push(Event {
            level,
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        });
    }
}

impl RecordingSink {
    fn warnings(&self) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.level == Level::WARN)
            .cloned()
            .collect()
    }
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempdir().expect("temporary directory"),
        }
    }

    fn input(&self, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join("input.csv");
        fs::write(&path, contents).expect("input written");
        path
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn run(&self, sink: &RecordingSink, input: &Path) -> Result<ledger_tools::model::Stats> {
        Pipeline::new(sink).run(input, &self.path("out/clean.csv"), &self.path("out/stats.json"))
    }
}

#[test]
fn worked_example_produces_expected_artifacts() {
    let workspace = Workspace::new();
    let input = workspace.input(b"sku,qty,unit_price\nA1,2,3.50\n,1,1.00\nA2,0,5.00\nA3,3,2.00\n");
    let sink = RecordingSink::default();

    let stats = workspace.run(&sink, &input).expect("pipeline succeeded");

    assert_eq!(stats.rows_in, 2);
    assert_eq!(stats.rows_out, 2);
    assert_eq!(stats.total_qty, BigInt::from(5));
    assert_eq!(stats.gross_revenue.to_string(), "13.00");

    let clean = fs::read_to_string(workspace.path("out/clean.csv")).expect("clean output read");
    assert_eq!(clean, "sku,qty,unit_price\nA1,2,3.50\nA3,3,2.00\n");

    let summary = fs::read_to_string(workspace.path("out/stats.json")).expect("stats read");
    assert_eq!(
        summary,
        "{\n  \"rows_in\": 2,\n  \"rows_out\": 2,\n  \"total_qty\": 5,\n  \"gross_revenue\": \"13.00\"\n}\n"
    );

    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 2);
    assert_eq!(
        warnings[0].fields,
        vec![
            ("line".to_string(), "3".to_string()),
            ("reason".to_string(), "sku must be non-empty".to_string()),
        ]
    );
    assert_eq!(
        warnings[1].fields,
        vec![
            ("line".to_string(), "4".to_string()),
            ("reason".to_string(), "qty must be > 0".to_string()),
        ]
    );
}

#[test]
fn rows_in_counts_only_accepted_rows() {
    let workspace = Workspace::new();
    let input = workspace.input(
        b"sku,qty,unit_price\nA,1,1\nbad,x,1\nB,1,1\n,1,1\nC,1,-2\nD,1,1\nE,-1,1\n",
    );
    let sink = RecordingSink::default();

    let stats = workspace.run(&sink, &input).expect("pipeline succeeded");

    // Three accepted and four rejected rows: rejects are counted nowhere, so
    // rows_in stays at 3 rather than 7.
    assert_eq!(stats.rows_out, 3);
    assert_eq!(stats.rows_in, 3);
    assert_eq!(stats.total_qty, BigInt::from(3));
    assert_eq!(sink.warnings().len(), 4);
}

#[test]
fn gross_revenue_is_exact_for_long_fractions() {
    let workspace = Workspace::new();
    let input = workspace.input(
        b"sku,qty,unit_price\nA,1,0.1\nB,1,0.2\nC,3,1.000000000000000000000000000001\n",
    );
    let sink = RecordingSink::default();

    let stats = workspace.run(&sink, &input).expect("pipeline succeeded");

    assert_eq!(
        stats.gross_revenue.to_string(),
        "3.300000000000000000000000000003"
    );
    let summary: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(workspace.path("out/stats.json")).expect("stats read"),
    )
    .expect("stats parsed");
    assert_eq!(
        summary["gross_revenue"],
        serde_json::json!("3.300000000000000000000000000003")
    );
    assert_eq!(summary.as_object().map(|map| map.len()), Some(4));
}

#[test]
fn missing_required_column_leaves_header_only_output() {
    let workspace = Workspace::new();
    let input = workspace.input(b"sku,price\nA1,3.50\n");
    let sink = RecordingSink::default();

    let error = workspace.run(&sink, &input).expect_err("pipeline failed");

    assert_eq!(error.kind(), ErrorKind::InputFormat);
    let clean = fs::read_to_string(workspace.path("out/clean.csv")).expect("clean output read");
    assert_eq!(clean, HEADER);
    assert!(!workspace.path("out/stats.json").exists());
    assert!(sink.warnings().is_empty());
}

#[test]
fn empty_input_is_a_format_error() {
    let workspace = Workspace::new();
    let input = workspace.input(b"");
    let sink = RecordingSink::default();

    let error = workspace.run(&sink, &input).expect_err("pipeline failed");

    assert_eq!(error.kind(), ErrorKind::InputFormat);
    assert!(!workspace.path("out/stats.json").exists());
}

#[test]
fn bad_quantity_and_negative_price_are_skipped() {
    let workspace = Workspace::new();
    let input = workspace.input(b"sku,qty,unit_price\nA1,abc,1.00\nA2,2,-1.00\nA3,4,2.25\n");
    let sink = RecordingSink::default();

    let stats = workspace.run(&sink, &input).expect("pipeline succeeded");

    assert_eq!(stats.total_qty, BigInt::from(4));
    assert_eq!(stats.gross_revenue.to_string(), "9.00");

    let reasons: Vec<String> = sink
        .warnings()
        .into_iter()
        .map(|event| event.fields[1].1.clone())
        .collect();
    assert_eq!(
        reasons,
        vec![
            "qty must be an integer (got 'abc')".to_string(),
            "unit_price must be >= 0".to_string(),
        ]
    );

    let clean = fs::read_to_string(workspace.path("out/clean.csv")).expect("clean output read");
    assert_eq!(clean, "sku,qty,unit_price\nA3,4,2.25\n");
}

#[test]
fn extra_columns_are_dropped_and_values_normalized() {
    let workspace = Workspace::new();
    let input = workspace.input(b"region,unit_price,qty,sku\nEU, 1.5 , 007 ,  W-1  \n");
    let sink = RecordingSink::default();

    workspace.run(&sink, &input).expect("pipeline succeeded");

    let clean = fs::read_to_string(workspace.path("out/clean.csv")).expect("clean output read");
    assert_eq!(clean, "sku,qty,unit_price\nW-1,7,1.5\n");
}

#[test]
fn rerun_produces_identical_artifacts() {
    let workspace = Workspace::new();
    let input = workspace.input(b"sku,qty,unit_price\nA1,2,3.50\nX,y,z\nA3,3,2.00\n");
    let sink = RecordingSink::default();

    let first_clean = workspace.path("first/clean.csv");
    let first_stats = workspace.path("first/stats.json");
    let second_clean = workspace.path("second/clean.csv");
    let second_stats = workspace.path("second/stats.json");

    let pipeline = Pipeline::new(&sink);
    let first = pipeline
        .run(&input, &first_clean, &first_stats)
        .expect("first run");
    let second = pipeline
        .run(&input, &second_clean, &second_stats)
        .expect("second run");

    assert_eq!(first, second);
    assert_eq!(
        fs::read(&first_clean).expect("first clean"),
        fs::read(&second_clean).expect("second clean")
    );
    assert_eq!(
        fs::read(&first_stats).expect("first stats"),
        fs::read(&second_stats).expect("second stats")
    );
}

#[test]
fn missing_input_touches_no_outputs() {
    let workspace = Workspace::new();
    let sink = RecordingSink::default();

    let error = workspace
        .run(&sink, &workspace.path("does-not-exist.csv"))
        .expect_err("pipeline failed");

    assert_eq!(error.kind(), ErrorKind::InputNotFound);
    assert!(!workspace.path("out").exists());
}

#[test]
fn stats_write_failure_keeps_clean_output() {
    let workspace = Workspace::new();
    let input = workspace.input(b"sku,qty,unit_price\nA1,2,3.50\n");
    let clean_path = workspace.path("clean.csv");
    let stats_path = workspace.path("stats.json");
    fs::create_dir_all(&stats_path).expect("directory in place of stats file");
    let sink = RecordingSink::default();

    let error = Pipeline::new(&sink)
        .run(&input, &clean_path, &stats_path)
        .expect_err("stats write failed");

    assert_eq!(error.kind(), ErrorKind::OutputWrite);
    assert!(error.source().is_some());
    let clean = fs::read_to_string(&clean_path).expect("clean output read");
    assert_eq!(clean, "sku,qty,unit_price\nA1,2,3.50\n");
}

#[test]
fn undecodable_input_is_format_error_with_cause() {
    let workspace = Workspace::new();
    let input = workspace.input(b"sku,qty,unit_price\nA1,2,3.50\nA\xff,1,1.00\n");
    let sink = RecordingSink::default();

    let error = workspace.run(&sink, &input).expect_err("pipeline failed");

    assert_eq!(error.kind(), ErrorKind::InputFormat);
    assert!(error.source().is_some());
    assert!(!workspace.path("out/stats.json").exists());
    let clean = fs::read_to_string(workspace.path("out/clean.csv")).expect("clean output read");
    assert!(clean.starts_with(HEADER));
}

#[test]
fn header_only_input_reports_zero_totals() {
    let workspace = Workspace::new();
    let input = workspace.input(HEADER.as_bytes());
    let sink = RecordingSink::default();

    let stats = workspace.run(&sink, &input).expect("pipeline succeeded");

    assert_eq!(stats.rows_in, 0);
    assert_eq!(stats.total_qty, BigInt::from(0));
    let summary = fs::read_to_string(workspace.path("out/stats.json")).expect("stats read");
    assert!(summary.contains("\"gross_revenue\": \"0\""));

    let events = sink.events.borrow();
    assert_eq!(events.first().map(|event| event.message.as_str()), Some("starting pipeline"));
    assert_eq!(events.last().map(|event| event.message.as_str()), Some("pipeline completed"));
}

#[test]
fn unopenable_clean_output_is_format_error_and_input_is_kept() {
    let workspace = Workspace::new();
    let contents = b"sku,qty,unit_price\nA1,2,3.50\n";
    let input = workspace.input(contents);
    let clean_path = workspace.path("clean.csv");
    let stats_path = workspace.path("stats.json");
    fs::create_dir_all(&clean_path).expect("directory in place of clean output");
    let sink = RecordingSink::default();

    let error = Pipeline::new(&sink)
        .run(&input, &clean_path, &stats_path)
        .expect_err("clean output could not be created");

    assert_eq!(error.kind(), ErrorKind::InputFormat);
    assert!(error.source().is_some());
    assert!(!stats_path.exists());
    assert!(clean_path.is_dir());
    assert_eq!(fs::read(&input).expect("input read"), contents);
}

#[test]
fn quantities_wider_than_64_bits_are_totalled_exactly() {
    let workspace = Workspace::new();
    let input = workspace.input(
        b"sku,qty,unit_price\nA,18446744073709551615,1\nB,18446744073709551615,0.50\n",
    );
    let sink = RecordingSink::default();

    let stats = workspace.run(&sink, &input).expect("pipeline succeeded");

    assert_eq!(stats.rows_in, 2);
    assert_eq!(stats.total_qty.to_string(), "36893488147419103230");
    assert_eq!(stats.gross_revenue.to_string(), "27670116110564327422.50");

    let summary = fs::read_to_string(workspace.path("out/stats.json")).expect("stats read");
    assert!(summary.contains("\"total_qty\": 36893488147419103230,"));
    let clean = fs::read_to_string(workspace.path("out/clean.csv")).expect("clean output read");
    assert_eq!(
        clean,
        "sku,qty,unit_price\nA,18446744073709551615,1\nB,18446744073709551615,0.50\n"
    );
}
