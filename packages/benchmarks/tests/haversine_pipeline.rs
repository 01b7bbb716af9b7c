//! End-to-end tests of the haversine pipeline through real files.

use std::fs;

use benchmarks::{
    EARTH_RADIUS, HaversineError, JsonError, average_distance, generate_files, generate_pairs,
    sum_file,
};
use cycle_harness::Profiler;

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
fn generated_files_sum_to_reference_average() {
    let dir = tempfile::tempdir().unwrap();
    let points = dir.path().join("points.json");
    let answers = dir.path().join("haversine.f64");

    let reference = generate_files(&points, &answers, 1_000, 1234).unwrap();

    let profiler = Profiler::new();
    let outcome = sum_file(&points, Some(answers.as_path()), &profiler).unwrap();

    assert_eq!(outcome.pair_count, 1_000);
    assert!((outcome.average - reference).abs() < 1e-9);
    assert!((outcome.reference_average.unwrap() - reference).abs() < 1e-9);
    assert!(outcome.max_deviation.unwrap() < 1e-9);

    assert_eq!(fs::metadata(&answers).unwrap().len(), 8_000);

    let report = profiler.report();

    for stage in ["read", "parse", "lookup", "sum", "validate"] {
        assert_eq!(
            report.region(stage).map(|region| region.entrance_count()),
            Some(1),
            "stage {stage}"
        );
    }

    let parse = report.region("parse").unwrap();
    let parse_value = report.region("parse_value").unwrap();

    // The document, the pairs array, each pair object and each of its four numbers.
    assert_eq!(parse_value.entrance_count(), 2 + 1_000 * 5);
    assert!(parse.inclusive_cycles() >= parse_value.inclusive_cycles());

    let read = report.region("read").unwrap();
    assert_eq!(read.bytes_processed(), fs::metadata(&points).unwrap().len());
    assert!(read.gib_per_second().is_some());
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
fn sum_without_answers_skips_validation() {
    let dir = tempfile::tempdir().unwrap();
    let points = dir.path().join("points.json");
    let answers = dir.path().join("haversine.f64");

    generate_files(&points, &answers, 25, 99).unwrap();

    let profiler = Profiler::new();
    let outcome = sum_file(&points, None, &profiler).unwrap();

    assert_eq!(outcome.reference_average, None);
    assert_eq!(outcome.max_deviation, None);
    let expected = average_distance(&generate_pairs(25, 99), EARTH_RADIUS);
    assert!((outcome.average - expected).abs() < 1e-9);

    assert!(profiler.report().region("validate").is_none());
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
fn mismatched_answer_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let points = dir.path().join("points.json");
    let answers = dir.path().join("haversine.f64");
    let other_answers = dir.path().join("other.f64");

    generate_files(&points, &answers, 10, 1).unwrap();
    generate_files(&dir.path().join("other.json"), &other_answers, 11, 1).unwrap();

    let profiler = Profiler::new();
    let result = sum_file(&points, Some(other_answers.as_path()), &profiler);

    assert!(matches!(
        result,
        Err(HaversineError::AnswerCountMismatch {
            pairs: 10,
            answers: 11
        })
    ));

    // Every stage exited on the error path.
    assert_eq!(profiler.depth(), 0);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
fn missing_point_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let points = dir.path().join("absent.json");

    let profiler = Profiler::new();
    let error = sum_file(&points, None, &profiler).unwrap_err();

    assert!(matches!(error, HaversineError::Io { .. }));
    assert!(error.to_string().contains("absent.json"));
    assert_eq!(profiler.depth(), 0);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
fn malformed_point_file_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let points = dir.path().join("points.json");
    fs::write(&points, br#"{"pairs": [{"x0": 1,]"#).unwrap();

    let profiler = Profiler::new();
    let error = sum_file(&points, None, &profiler).unwrap_err();

    assert!(matches!(error, HaversineError::Json(_)));
    assert_eq!(profiler.depth(), 0);
}

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot use the real operating system APIs.
fn deeply_nested_point_file_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let points = dir.path().join("points.json");

    let mut contents = br#"{"pairs": "#.to_vec();
    contents.extend(std::iter::repeat_n(b'[', 100_000));
    fs::write(&points, contents).unwrap();

    let profiler = Profiler::new();
    let error = sum_file(&points, None, &profiler).unwrap_err();

    assert!(matches!(error, HaversineError::Json(JsonError::TooDeep { .. })));
    assert_eq!(profiler.depth(), 0);
}
