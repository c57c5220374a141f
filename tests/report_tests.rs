use docbatch::ExtractionStatus;
use docbatch::document::{
    DigestAlgorithm, DigestIdentifier, Document, PathIdentifier, TextCharset,
};
use docbatch::report::{
    MemoryReportMap, ReportError, ReportMap, Reporter, SqliteReportMap, open_report_map,
};
use std::sync::Arc;
use std::thread;

fn path_reporter(map: Arc<dyn ReportMap>) -> Reporter {
    Reporter::new(map, Arc::new(PathIdentifier))
}

// --- Reporter over a memory map ---

#[test]
fn test_save_then_check_round_trip() {
    let reporter = path_reporter(Arc::new(MemoryReportMap::new()));
    let mut doc = Document::new("/path/to/doc");
    reporter.save(&mut doc, ExtractionStatus::Success).unwrap();
    assert!(reporter.check(&mut doc, ExtractionStatus::Success).unwrap());
    assert!(!reporter.check(&mut doc, ExtractionStatus::FailureRuntime).unwrap());
}

#[test]
fn test_two_documents_keep_their_own_status() {
    let reporter = path_reporter(Arc::new(MemoryReportMap::new()));
    let mut a = Document::new("/path/to/a");
    let mut b = Document::new("/path/to/b");
    reporter.save(&mut a, ExtractionStatus::Success).unwrap();
    reporter.save(&mut b, ExtractionStatus::FailureNotFound).unwrap();
    assert!(reporter.check(&mut a, ExtractionStatus::Success).unwrap());
    assert!(reporter.check(&mut b, ExtractionStatus::FailureNotFound).unwrap());
    assert!(!reporter.check(&mut b, ExtractionStatus::Success).unwrap());
}

#[test]
fn test_overwrite_leaves_last_status_only() {
    let map: Arc<dyn ReportMap> = Arc::new(MemoryReportMap::new());
    let reporter = path_reporter(Arc::clone(&map));
    let mut doc = Document::new("/x");
    reporter.save(&mut doc, ExtractionStatus::FailureInterrupted).unwrap();
    reporter.save(&mut doc, ExtractionStatus::Success).unwrap();
    assert_eq!(map.size().unwrap(), 1);
    assert_eq!(map.get("/x").unwrap(), Some(ExtractionStatus::Success));
}

#[test]
fn test_unknown_document_checks_false() {
    let reporter = path_reporter(Arc::new(MemoryReportMap::new()));
    let mut doc = Document::new("/never/seen");
    assert!(!reporter.check(&mut doc, ExtractionStatus::Success).unwrap());
    assert_eq!(reporter.status(&mut doc).unwrap(), None);
}

#[test]
fn test_digest_identity_is_location_independent() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    std::fs::write(&first, b"same bytes").unwrap();
    std::fs::write(&second, b"same bytes").unwrap();

    let reporter = Reporter::new(
        Arc::new(MemoryReportMap::new()),
        Arc::new(DigestIdentifier::new(
            DigestAlgorithm::Sha256,
            TextCharset::Ascii,
        )),
    );
    reporter
        .save(&mut Document::new(&first), ExtractionStatus::Success)
        .unwrap();
    assert!(reporter
        .check(&mut Document::new(&second), ExtractionStatus::Success)
        .unwrap());
}

#[test]
fn test_digest_identity_failure_is_local() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = Reporter::new(
        Arc::new(MemoryReportMap::new()),
        Arc::new(DigestIdentifier::default()),
    );
    let mut missing = Document::new(dir.path().join("gone.txt"));
    let err = reporter
        .save(&mut missing, ExtractionStatus::Success)
        .unwrap_err();
    assert!(err.is_local());
    match err {
        ReportError::Identity(e) => assert_eq!(e.status(), ExtractionStatus::FailureNotFound),
        other => panic!("unexpected error: {other}"),
    }
    reporter
        .save_unidentified(&missing, ExtractionStatus::FailureNotFound)
        .unwrap();
    assert_eq!(reporter.map().size().unwrap(), 1);
}

// --- Memory map ---

#[test]
fn test_memory_map_contract() {
    let map = MemoryReportMap::new();
    assert_eq!(map.put("a", ExtractionStatus::Success).unwrap(), None);
    assert_eq!(
        map.put("a", ExtractionStatus::FailureRuntime).unwrap(),
        Some(ExtractionStatus::Success)
    );
    map.put("b", ExtractionStatus::FailureUnsupported).unwrap();
    assert!(map.contains("a").unwrap());
    assert_eq!(map.size().unwrap(), 2);
    assert_eq!(
        map.entries().unwrap(),
        vec![
            ("a".to_string(), ExtractionStatus::FailureRuntime),
            ("b".to_string(), ExtractionStatus::FailureUnsupported),
        ]
    );
    assert_eq!(
        map.remove("a").unwrap(),
        Some(ExtractionStatus::FailureRuntime)
    );
    assert!(!map.contains("a").unwrap());
    map.clear().unwrap();
    assert_eq!(map.size().unwrap(), 0);
}

#[test]
fn test_memory_map_closed_rejects_operations() {
    let map = MemoryReportMap::new();
    map.close().unwrap();
    map.close().unwrap();
    assert!(matches!(
        map.put("a", ExtractionStatus::Success),
        Err(ReportError::Closed)
    ));
}

#[test]
fn test_memory_map_concurrent_puts() {
    let map = Arc::new(MemoryReportMap::new());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..250 {
                    map.put(&format!("{t}-{i}"), ExtractionStatus::Success)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(map.size().unwrap(), 1000);
}

// --- SQLite map ---

#[test]
fn test_sqlite_map_contract_in_memory() {
    let map = SqliteReportMap::open_in_memory().unwrap();
    assert_eq!(map.put("a", ExtractionStatus::Success).unwrap(), None);
    assert_eq!(
        map.put("a", ExtractionStatus::FailureNotReadable).unwrap(),
        Some(ExtractionStatus::Success)
    );
    assert_eq!(
        map.get("a").unwrap(),
        Some(ExtractionStatus::FailureNotReadable)
    );
    assert_eq!(map.get("b").unwrap(), None);
    assert_eq!(map.size().unwrap(), 1);
    assert_eq!(
        map.remove("a").unwrap(),
        Some(ExtractionStatus::FailureNotReadable)
    );
    assert_eq!(map.size().unwrap(), 0);
}

#[test]
fn test_sqlite_statuses_persist_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("report.db");
    {
        let map = SqliteReportMap::open(&path).unwrap();
        for (i, status) in ExtractionStatus::ALL.iter().enumerate() {
            map.put(&format!("/doc/{i}"), *status).unwrap();
        }
        map.close().unwrap();
        assert!(matches!(map.size(), Err(ReportError::Closed)));
    }
    let map = SqliteReportMap::open(&path).unwrap();
    assert_eq!(map.size().unwrap(), ExtractionStatus::ALL.len());
    for (i, status) in ExtractionStatus::ALL.iter().enumerate() {
        assert_eq!(map.get(&format!("/doc/{i}")).unwrap(), Some(*status));
    }
}

#[test]
fn test_sqlite_clear_is_explicit_and_total() {
    let dir = tempfile::tempdir().unwrap();
    let map = SqliteReportMap::open(&dir.path().join("r.db")).unwrap();
    map.put("a", ExtractionStatus::Success).unwrap();
    map.put("b", ExtractionStatus::Success).unwrap();
    map.clear().unwrap();
    assert_eq!(map.size().unwrap(), 0);
    assert!(map.entries().unwrap().is_empty());
}

#[test]
fn test_open_report_map_backends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("r.db");
    let map = open_report_map(Some(path.as_path())).unwrap();
    map.put("k", ExtractionStatus::Success).unwrap();
    map.close().unwrap();
    assert!(path.is_file());

    let mem = open_report_map(None).unwrap();
    assert_eq!(mem.size().unwrap(), 0);
}

#[test]
fn test_reporter_close_then_drop_leaves_map_closed() {
    let map: Arc<dyn ReportMap> = Arc::new(SqliteReportMap::open_in_memory().unwrap());
    let reporter = path_reporter(Arc::clone(&map));
    reporter.close().unwrap();
    assert!(reporter.is_closed());
    drop(reporter);
    assert!(matches!(map.get("x"), Err(ReportError::Closed)));
}
