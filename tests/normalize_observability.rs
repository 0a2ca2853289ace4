use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tabular_normalizer::ingestion::{
    normalize_with_options, CompositeObserver, FileObserver, NormalizeContext, NormalizeObserver,
    NormalizeOptions, NormalizeSeverity, NormalizeStats,
};
use tabular_normalizer::types::{QualityFlags, RawFile};
use tabular_normalizer::{FailureKind, IngestionFailure};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<NormalizeStats>>,
    degraded: Mutex<Vec<Vec<&'static str>>>,
    failures: Mutex<Vec<(NormalizeSeverity, FailureKind)>>,
    alerts: Mutex<Vec<NormalizeSeverity>>,
}

impl NormalizeObserver for RecordingObserver {
    fn on_success(&self, _ctx: &NormalizeContext, stats: NormalizeStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_degraded(&self, _ctx: &NormalizeContext, quality: &QualityFlags) {
        self.degraded.lock().unwrap().push(quality.names());
    }

    fn on_failure(&self, _ctx: &NormalizeContext, severity: NormalizeSeverity, failure: &IngestionFailure) {
        self.failures.lock().unwrap().push((severity, failure.kind()));
    }

    fn on_alert(&self, _ctx: &NormalizeContext, severity: NormalizeSeverity, _failure: &IngestionFailure) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn options_with(obs: Arc<RecordingObserver>, alert_at_or_above: NormalizeSeverity) -> NormalizeOptions {
    NormalizeOptions {
        observer: Some(obs),
        alert_at_or_above,
        ..Default::default()
    }
}

#[test]
fn observer_receives_success_stats() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options_with(obs.clone(), NormalizeSeverity::Critical);

    let raw = RawFile::new("ok.csv", b"id;name\n1;Ada\n2;Grace\n".to_vec());
    normalize_with_options(&raw, &opts).unwrap();

    assert_eq!(
        obs.successes.lock().unwrap().clone(),
        vec![NormalizeStats { rows: 2, columns: 2 }]
    );
    assert!(obs.degraded.lock().unwrap().is_empty());
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn observer_is_told_about_degraded_tables() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options_with(obs.clone(), NormalizeSeverity::Critical);

    let raw = RawFile::new("ragged.csv", b"a;b;c\n1;2;3\n4;5;6\n7;8\n".to_vec());
    normalize_with_options(&raw, &opts).unwrap();

    assert_eq!(obs.successes.lock().unwrap().len(), 1);
    assert_eq!(
        obs.degraded.lock().unwrap().clone(),
        vec![vec!["row_length_mismatch"]]
    );
}

#[test]
fn observer_receives_failure_without_alert_below_threshold() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options_with(obs.clone(), NormalizeSeverity::Critical);

    let raw = RawFile::new("empty.csv", Vec::new());
    let _ = normalize_with_options(&raw, &opts).unwrap_err();

    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(NormalizeSeverity::Warning, FailureKind::EmptyFile)]
    );
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_alert_at_threshold() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = options_with(obs.clone(), NormalizeSeverity::Error);

    let raw = RawFile::new("prose.csv", b"no delimiters here\nnor here\n".to_vec());
    let _ = normalize_with_options(&raw, &opts).unwrap_err();

    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(NormalizeSeverity::Error, FailureKind::UnsniffableDialect)]
    );
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![NormalizeSeverity::Error]);
}

#[test]
fn composite_and_file_observers_fan_out() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let log_path = std::env::temp_dir().join(format!("tabular-normalizer-observer-{nanos}.log"));

    let recording = Arc::new(RecordingObserver::default());
    let recording_obs: Arc<dyn NormalizeObserver> = recording.clone();
    let file_obs: Arc<dyn NormalizeObserver> = Arc::new(FileObserver::new(&log_path));
    let composite = CompositeObserver::new(vec![recording_obs, file_obs]);
    let opts = NormalizeOptions {
        observer: Some(Arc::new(composite)),
        alert_at_or_above: NormalizeSeverity::Warning,
        ..Default::default()
    };

    let _ = normalize_with_options(&RawFile::new("report.pdf", b"%PDF".to_vec()), &opts).unwrap_err();
    normalize_with_options(&RawFile::new("ok.csv", b"a,b\n1,2\n".to_vec()), &opts).unwrap();

    assert_eq!(
        recording.failures.lock().unwrap().clone(),
        vec![(NormalizeSeverity::Warning, FailureKind::UnsupportedFormat)]
    );
    assert_eq!(recording.alerts.lock().unwrap().len(), 1);

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("fail severity=Warning"));
    assert!(log.contains("ALERT severity=Warning"));
    assert!(log.contains("ok format=Some(Csv) path=ok.csv rows=1 columns=2"));

    let _ = std::fs::remove_file(&log_path);
}
