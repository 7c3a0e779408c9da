//! Scaling report tests.

use spark_scaling_bench::report::ScalingReport;
use spark_scaling_bench::state::ExperimentState;
use spark_scaling_bench::Error;

fn queries() -> Vec<String> {
    vec!["Pageviews".to_string(), "Revenue".to_string()]
}

fn state() -> ExperimentState {
    let mut state = ExperimentState::new();
    for (nodes, load, pageviews, revenue) in [
        (6, [300, 340], [2000, 2200], [1000, 1000]),
        (3, [500, 520], [4000, 4400], [2000, 2000]),
    ] {
        let set = state.entry(nodes);
        for v in load {
            set.push_data_load(v);
        }
        for v in pageviews {
            set.push_execution("Pageviews", v);
        }
        for v in revenue {
            set.push_execution("Revenue", v);
        }
    }
    state
}

#[test]
fn test_report_orders_nodes_ascending() {
    let report = ScalingReport::build(&state(), &queries()).unwrap();
    assert_eq!(report.nodes, vec![3, 6]);
    assert_eq!(report.data_load[0].nodes, 3);
    assert!((report.data_load[0].summary.mean - 510.0).abs() < 1e-9);
}

#[test]
fn test_normalized_to_smallest_cluster() {
    let report = ScalingReport::build(&state(), &queries()).unwrap();
    let pageviews = &report.queries[0];
    assert_eq!(pageviews.name, "Q0");
    assert_eq!(pageviews.query, "Pageviews");
    assert!((pageviews.normalized[0] - 1.0).abs() < 1e-9);
    assert!((pageviews.normalized[1] - 0.5).abs() < 1e-9);

    let revenue = &report.queries[1];
    assert!(revenue.normalized_err[0].abs() < 1e-9);
}

#[test]
fn test_execution_table_layout() {
    let report = ScalingReport::build(&state(), &queries()).unwrap();
    let table = report.execution_table();
    let lines: Vec<&str> = table.lines().collect();

    assert_eq!(lines[0], r"3 & 6 \\ \hline");
    assert_eq!(lines[1], r"Q0 & 4.20 & 0.28 & 2.10 & 0.14 \\");
    assert_eq!(lines[2], r"Q1 & 2.00 & 0.00 & 1.00 & 0.00 \\");
}

#[test]
fn test_display_contains_all_sections() {
    let text = ScalingReport::build(&state(), &queries()).unwrap().to_string();
    assert!(text.contains("Loading Data"));
    assert!(text.contains("Execution Time"));
    assert!(text.contains("Normalized Execution Time (3 workers = 1)"));
}

#[test]
fn test_missing_query_is_reported() {
    let mut state = state();
    state.entry(4).push_data_load(400);
    let err = ScalingReport::build(&state, &queries()).unwrap_err();
    assert!(matches!(err, Error::MissingSamples(_)));
    assert!(err.to_string().contains("Pageviews on 4 nodes"));
}

#[test]
fn test_empty_state_is_reported() {
    assert!(matches!(
        ScalingReport::build(&ExperimentState::new(), &queries()),
        Err(Error::MissingSamples(_))
    ));
}

#[test]
fn test_report_serializes_to_json() {
    let report = ScalingReport::build(&state(), &queries()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["nodes"], serde_json::json!([3, 6]));
    assert_eq!(json["queries"][1]["query"], "Revenue");
}
