//! Integration tests for seriesq-core.
//!
//! These tests drive the full pipeline against a local document store:
//! load → store document on disk → dispatcher → report engine → text.

use std::path::{Path, PathBuf};

use serde_json::json;
use seriesq_core::{MemoryStore, Outcome, ReportOptions, SeriesError, run};
use tempfile::TempDir;

const T1: &str = "2026-10-16T10:00:00Z";

fn write_ingest(dir: &Path) -> PathBuf {
    let doc = json!({
        "context": "host1",
        "metrics": [
            {
                "name": "kernel.all.load",
                "pmid": "60.2.0",
                "indom": "60.2",
                "type": "FLOAT",
                "semantics": "instant",
                "units": "",
                "labels": {"hostname": "host1", "agent": "linux"},
                "instances": [
                    {"id": 15, "name": "15 minute", "labels": {"interval": 15}},
                    {"id": 1, "name": "1 minute", "labels": {"interval": 1}},
                    {"id": 5, "name": "5 minute", "labels": {"interval": 5}}
                ],
                "values": [
                    {"timestamp": T1, "instance": "1 minute", "data": 0.5},
                    {"timestamp": T1, "instance": "15 minute", "data": 0.25}
                ]
            },
            {
                "name": "kernel.uname.release",
                "pmid": "60.12.2",
                "type": "STRING",
                "semantics": "discrete",
                "labels": {"hostname": "host1"},
                "values": [{"timestamp": T1, "data": "6.1.0"}]
            },
            {
                "name": "hinv.ncpu",
                "pmid": "60.0.32",
                "type": "U32",
                "semantics": "discrete",
                "units": "count",
                "values": [{"timestamp": T1, "data": 8}]
            }
        ]
    });
    let path = dir.join("ingest.json");
    std::fs::write(&path, doc.to_string()).unwrap();
    path
}

struct Report {
    out: String,
    err: String,
    outcome: Outcome,
}

async fn report(store: &mut MemoryStore, options: ReportOptions, args: &[&str]) -> Report {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let mut out = Vec::new();
    let mut err = Vec::new();
    let outcome = run(store, &options, &args, &mut out, &mut err)
        .await
        .unwrap();
    Report {
        out: String::from_utf8(out).unwrap(),
        err: String::from_utf8(err).unwrap(),
        outcome,
    }
}

/// A store document loaded from the sample ingest file.
async fn loaded() -> (TempDir, MemoryStore) {
    let dir = tempfile::tempdir().unwrap();
    let ingest = write_ingest(dir.path());
    let mut store = MemoryStore::open(dir.path().join("series.json"))
        .await
        .unwrap();
    let options = ReportOptions {
        load: true,
        ..Default::default()
    };
    let text = ingest.to_string_lossy().into_owned();
    let loaded = report(&mut store, options, &[text.as_str()]).await;
    assert_eq!(loaded.out, "Info: loaded 3 series from host1\n");
    assert_eq!(loaded.err, "");
    assert!(!loaded.outcome.failed);
    (dir, store)
}

fn series_of(store: &MemoryStore, metric: &str) -> String {
    store
        .document()
        .series
        .iter()
        .find(|sp| sp.metrics.iter().any(|m| m == metric))
        .map(|sp| sp.series.clone())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Load and query
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_persists_store_document() {
    let (dir, store) = loaded().await;
    let reopened = MemoryStore::open(dir.path().join("series.json"))
        .await
        .unwrap();
    assert_eq!(reopened.document(), store.document());
    assert_eq!(reopened.document().series.len(), 3);
}

#[tokio::test]
async fn fast_query_lists_matching_series() {
    let (_dir, mut store) = loaded().await;
    let options = ReportOptions {
        fast: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &["kernel.*"]).await;
    let expected = format!(
        "{}\n{}\n",
        series_of(&store, "kernel.all.load"),
        series_of(&store, "kernel.uname.release")
    );
    assert_eq!(result.out, expected);
    assert_eq!(result.outcome.exit_code(), 0);
}

#[tokio::test]
async fn query_reports_instance_values() {
    let (_dir, mut store) = loaded().await;
    let result = report(&mut store, ReportOptions::default(), &["kernel.all.load"]).await;
    let expected = format!(
        "{}\n    [{T1}] 0.5 \"1 minute\"\n    [{T1}] 0.25 \"15 minute\"\n",
        series_of(&store, "kernel.all.load")
    );
    assert_eq!(result.out, expected);
}

#[tokio::test]
async fn query_quotes_string_values() {
    let (_dir, mut store) = loaded().await;
    let result = report(&mut store, ReportOptions::default(), &["kernel.uname.*"]).await;
    assert!(result.out.ends_with(&format!("    [{T1}] \"6.1.0\"\n")));
}

#[tokio::test]
async fn label_filter_narrows_query() {
    let (_dir, mut store) = loaded().await;
    let options = ReportOptions {
        fast: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &["*{agent==\"linux\"}"]).await;
    assert_eq!(
        result.out,
        format!("{}\n", series_of(&store, "kernel.all.load"))
    );
}

#[tokio::test]
async fn malformed_query_fails_invocation() {
    let (_dir, mut store) = loaded().await;
    let result = report(&mut store, ReportOptions::default(), &["kernel{agent}"]).await;
    assert_eq!(result.out, "");
    assert_eq!(
        result.err,
        "seriesq: expected name==value, found 'agent'\n"
    );
    assert_eq!(result.outcome.exit_code(), 1);
}

// ---------------------------------------------------------------------------
// Per-series reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn descriptor_report() {
    let (_dir, mut store) = loaded().await;
    let id = series_of(&store, "kernel.uname.release");
    let options = ReportOptions {
        desc: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &[id.as_str()]).await;
    assert_eq!(
        result.out,
        format!(
            "\n{id}\n    PMID: 60.12.2\n    Data Type: string  InDom: none\n    Semantics: discrete  Units: none\n"
        )
    );
}

#[tokio::test]
async fn instances_are_sorted_numerically() {
    let (_dir, mut store) = loaded().await;
    let id = series_of(&store, "kernel.all.load");
    let options = ReportOptions {
        instances: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &[id.as_str()]).await;
    assert_eq!(
        result.out,
        format!(
            "\n{id}\n    inst [1 or \"1 minute\"]\n    inst [5 or \"5 minute\"]\n    inst [15 or \"15 minute\"]\n"
        )
    );
}

#[tokio::test]
async fn labels_for_metric_and_instances() {
    let (_dir, mut store) = loaded().await;
    let id = series_of(&store, "kernel.all.load");
    let options = ReportOptions {
        labels: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &[id.as_str()]).await;
    assert_eq!(
        result.out,
        format!(
            concat!(
                "\n{id}\n",
                "    labels {{\"agent\":\"linux\",\"hostname\":\"host1\"}}\n",
                "    inst [1 or \"1 minute\"] labels {{\"interval\":1}}\n",
                "    inst [5 or \"5 minute\"] labels {{\"interval\":5}}\n",
                "    inst [15 or \"15 minute\"] labels {{\"interval\":15}}\n",
            ),
            id = id
        )
    );
}

#[tokio::test]
async fn label_names_only() {
    let (_dir, mut store) = loaded().await;
    let id = series_of(&store, "kernel.all.load");
    let options = ReportOptions {
        labels: true,
        names_only: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &[id.as_str()]).await;
    assert_eq!(
        result.out,
        format!(
            concat!(
                "\n{id}\n",
                "    Labels: agent, hostname\n",
                "    inst [1 or \"1 minute\"] labels: interval\n",
                "    inst [5 or \"5 minute\"] labels: interval\n",
                "    inst [15 or \"15 minute\"] labels: interval\n",
            ),
            id = id
        )
    );
}

#[tokio::test]
async fn contexts_and_metric_names_for_series() {
    let (_dir, mut store) = loaded().await;
    let id = series_of(&store, "kernel.all.load");
    let options = ReportOptions {
        contexts: true,
        metrics: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &[id.as_str()]).await;
    assert_eq!(
        result.out,
        format!("\n{id}\n    Context: host1\n    Metric: kernel.all.load\n")
    );
}

#[tokio::test]
async fn several_series_are_reported_in_turn() {
    let (_dir, mut store) = loaded().await;
    let a = series_of(&store, "hinv.ncpu");
    let b = series_of(&store, "kernel.uname.release");
    let options = ReportOptions {
        metrics: true,
        ..Default::default()
    };
    let list = format!("{a},{b}");
    let result = report(&mut store, options, &[list.as_str()]).await;
    assert_eq!(
        result.out,
        format!("\n{a}\n    Metric: hinv.ncpu\n\n{b}\n    Metric: kernel.uname.release\n")
    );
}

// ---------------------------------------------------------------------------
// Global listings and sources
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metric_names_without_identifiers() {
    let (_dir, mut store) = loaded().await;
    let options = ReportOptions {
        metrics: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &[]).await;
    assert_eq!(
        result.out,
        "hinv.ncpu\nkernel.all.load\nkernel.uname.release\n"
    );
}

#[tokio::test]
async fn contexts_for_source_identifier() {
    let (_dir, mut store) = loaded().await;
    let source = store.document().sources[0].source.clone();
    let options = ReportOptions {
        contexts: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &[source.as_str()]).await;
    assert_eq!(result.out, format!("\n{source}\n    Context: host1\n"));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn conflicting_options_are_rejected() {
    let (_dir, mut store) = loaded().await;
    let before = store.document().clone();
    let options = ReportOptions {
        load: true,
        labels: true,
        ..Default::default()
    };
    let args = vec!["ingest.json".to_string()];
    let result = run(&mut store, &options, &args, Vec::new(), Vec::new()).await;
    match result {
        Err(SeriesError::Usage(messages)) => {
            assert_eq!(messages, ["cannot use load and reporting options together"]);
        }
        other => panic!("expected usage error, got {other:?}"),
    }
    assert_eq!(store.document(), &before);
}

#[tokio::test]
async fn bad_identifier_list_does_not_stop_others() {
    let (_dir, mut store) = loaded().await;
    let id = series_of(&store, "hinv.ncpu");
    let options = ReportOptions {
        metrics: true,
        ..Default::default()
    };
    let result = report(&mut store, options, &["x,,y", id.as_str()]).await;
    assert_eq!(result.out, format!("\n{id}\n    Metric: hinv.ncpu\n"));
    assert_eq!(
        result.err,
        "seriesq: no series identifiers in string 'x,,y': empty identifier at position 2\n"
    );
    assert!(result.outcome.failed);
}
