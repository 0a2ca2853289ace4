use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tabular_normalizer::execution::{scan_directory, BatchEngine, BatchEvent, BatchObserver, BatchOptions};
use tabular_normalizer::report::{inspection_rows, to_json};
use tabular_normalizer::types::TableSource;
use tabular_normalizer::FailureKind;

fn exports_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/exports")
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl BatchObserver for EventLog {
    fn on_event(&self, event: &BatchEvent) {
        let tag = match event {
            BatchEvent::RunStarted { files } => format!("start:{files}"),
            BatchEvent::FileFailed { kind, .. } => format!("failed:{kind}"),
            BatchEvent::RunFinished { metrics, .. } => format!("finish:{}", metrics.files_started),
            _ => return,
        };
        self.events.lock().unwrap().push(tag);
    }
}

#[test]
fn scan_lists_supported_extensions_only() {
    let top = scan_directory(exports_dir(), false).unwrap();
    assert_eq!(file_names(&top), vec!["prelevements.csv", "virements.csv"]);

    let all = scan_directory(exports_dir(), true).unwrap();
    assert_eq!(
        file_names(&all),
        vec!["EMPTY.CSV", "prelevements.csv", "virements.csv"]
    );
}

#[test]
fn scan_rejects_a_file_path() {
    let err = scan_directory(exports_dir().join("virements.csv"), true).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotADirectory);
}

#[test]
fn directory_batch_isolates_failures() {
    let log = Arc::new(EventLog::default());
    let log_obs: Arc<dyn BatchObserver> = log.clone();
    let engine = BatchEngine::new(BatchOptions {
        num_threads: Some(2),
        max_in_flight_files: 2,
    })
    .unwrap()
    .with_observer(log_obs);

    let outcomes = engine.inspect_directory(exports_dir(), true).unwrap();
    assert_eq!(outcomes.len(), 3);

    assert_eq!(outcomes[0].failure().unwrap().kind(), FailureKind::EmptyFile);

    let prelevements = outcomes[1].table().unwrap();
    assert_eq!(prelevements.header(), ["id", "débiteur", "montant", "statut"]);
    assert_eq!(prelevements.row_count(), 3);
    assert_eq!(prelevements.quality().padded_rows, 1);

    let virements = outcomes[2].table().unwrap();
    assert_eq!(virements.header(), ["Date", "Bénéficiaire", "Référence", "Montant"]);
    assert_eq!(virements.row_count(), 3);
    assert_eq!(virements.rows()[1][1], "Café du Commerce");
    match virements.source() {
        TableSource::Csv { encoding, preamble_lines, .. } => {
            assert_eq!(encoding.name(), "windows-1252");
            assert_eq!(*preamble_lines, 2);
        }
        other => panic!("unexpected source: {other:?}"),
    }

    let events = log.events.lock().unwrap().clone();
    assert_eq!(events.first().map(String::as_str), Some("start:3"));
    assert!(events.contains(&"failed:empty_file".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("finish:3"));
}

#[test]
fn inspection_report_summarizes_each_file() {
    let engine = BatchEngine::new(BatchOptions::default()).unwrap();
    let outcomes = engine.inspect_directory(exports_dir(), true).unwrap();
    let rows = inspection_rows(&outcomes);

    assert_eq!(rows[0].file_name, "EMPTY.CSV");
    assert_eq!(rows[0].extension, ".csv");
    assert_eq!(rows[0].size, "0 bytes");
    assert_eq!(rows[0].failure_kind, Some(FailureKind::EmptyFile));

    assert_eq!(rows[1].encoding.as_deref(), Some("UTF-8"));
    assert_eq!(rows[1].delimiter.as_deref(), Some(","));
    assert_eq!(rows[1].flags, vec!["row_length_mismatch"]);

    assert_eq!(rows[2].encoding.as_deref(), Some("windows-1252"));
    assert_eq!(rows[2].delimiter.as_deref(), Some(";"));
    assert_eq!(rows[2].rows, Some(3));
    assert_eq!(rows[2].columns, Some(4));

    let json = to_json(&rows).unwrap();
    assert!(json.contains("\"file_name\": \"virements.csv\""));
}

#[test]
fn missing_directory_is_an_error_not_an_empty_batch() {
    let engine = BatchEngine::new(BatchOptions::default()).unwrap();
    assert!(engine.inspect_directory(exports_dir().join("nope"), false).is_err());
}
