use docbatch::concurrent::{CancelToken, ExecutorProxy, ThreadPool};
use docbatch::document::{Document, EmbeddedDocument};
use docbatch::extract::{
    EmbeddedExtraction, Extraction, ExtractionError, Extractor, FileSpewer, PlainTextExtractor,
    Spewer,
};
use docbatch::monitor::{Listener, Monitorable, Notifiable};
use docbatch::pipeline::{Batch, DocumentConsumer, DocumentQueue, EMBED_ID_KEY, drain_queue};
use docbatch::report::{
    MemoryReportMap, ReportError, ReportMap, Reporter, SqliteReportMap,
};
use docbatch::{ExtractionStatus, IdentityKind, Opts};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const BOUND: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Counter {
    steps: AtomicUsize,
    total: AtomicUsize,
}

impl Notifiable for Counter {
    fn notify(&self, _detail: Option<&str>) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }

    fn hint_remaining(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }
}

/// Keeps what it was asked to write.
#[derive(Default)]
struct CollectingSpewer {
    written: Mutex<Vec<(PathBuf, Extraction)>>,
}

impl Spewer for CollectingSpewer {
    fn write(&self, document: &Document, extraction: &Extraction) -> io::Result<()> {
        self.written
            .lock()
            .unwrap()
            .push((document.path().to_path_buf(), extraction.clone()));
        Ok(())
    }
}

struct FailingSpewer;

impl Spewer for FailingSpewer {
    fn write(&self, _document: &Document, _extraction: &Extraction) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }
}

fn write_tree(root: &Path, text_files: usize, binary_files: usize) {
    for i in 0..text_files {
        let sub = root.join(format!("d{}", i % 3));
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join(format!("doc{i}.txt")), format!("document {i}\n")).unwrap();
    }
    for i in 0..binary_files {
        std::fs::write(root.join(format!("blob{i}.bin")), [0xff, 0xfe, 0x00, 0x81]).unwrap();
    }
}

fn opts_with_report(report: &Path) -> Opts {
    Opts {
        report_db: Some(report.to_path_buf()),
        num_threads: Some(4),
        ..Opts::default()
    }
}

// --- queue + drainer ---

#[test]
fn test_hundred_documents_four_workers_drain_and_terminate() {
    let queue = DocumentQueue::new(16);
    let pool = ThreadPool::new("drain", 4).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..4 {
        let (queue, seen) = (queue.clone(), Arc::clone(&seen));
        pool.execute(move |cancel| {
            drain_queue(&queue, cancel, |path| {
                seen.lock().unwrap().push(path);
                Ok::<(), ()>(())
            })
            .unwrap();
        })
        .unwrap();
    }
    pool.shutdown();

    let producer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let cancel = CancelToken::new();
            for i in 0..100 {
                assert!(queue.put(PathBuf::from(format!("/doc/{i}")), &cancel));
            }
            queue.seal();
        })
    };
    producer.join().unwrap();

    assert!(pool.await_termination(BOUND));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 100);
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 100);
    assert!(queue.is_empty());
    // one signal consumed per path handled
    assert_eq!(queue.latch().pending(), 0);
}

#[test]
fn test_drainer_parks_until_signalled() {
    let queue = DocumentQueue::new(4);
    let cancel = CancelToken::new();
    let worker = {
        let (queue, cancel) = (queue.clone(), cancel.clone());
        thread::spawn(move || drain_queue(&queue, &cancel, |_| Ok::<(), ()>(())))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(queue.put(PathBuf::from("/late"), &cancel));
    queue.seal();
    assert_eq!(worker.join().unwrap(), Ok(1));
    assert_eq!(queue.latch().pending(), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_drainer_stops_on_cancel_with_open_queue() {
    let queue = DocumentQueue::new(4);
    let cancel = CancelToken::new();
    let worker = {
        let (queue, cancel) = (queue.clone(), cancel.clone());
        thread::spawn(move || drain_queue(&queue, &cancel, |_| Ok::<(), ()>(())))
    };
    thread::sleep(Duration::from_millis(50));
    cancel.cancel();
    assert_eq!(worker.join().unwrap(), Ok(0));
    assert!(!queue.is_sealed());
}

#[test]
fn test_blocked_producer_gives_up_on_cancel() {
    let queue = DocumentQueue::new(1);
    let cancel = CancelToken::new();
    assert!(queue.put(PathBuf::from("/a"), &cancel));
    let producer = {
        let (queue, cancel) = (queue.clone(), cancel.clone());
        thread::spawn(move || queue.put(PathBuf::from("/b"), &cancel))
    };
    thread::sleep(Duration::from_millis(50));
    cancel.cancel();
    assert!(!producer.join().unwrap());
    assert_eq!(queue.len(), 1);
}

// --- full batch ---

#[test]
fn test_batch_extracts_tree_and_records_statuses() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_tree(src.path(), 12, 2);
    let report = work.path().join("report.db");
    let out = work.path().join("out");

    let root = src.path().canonicalize().unwrap();
    let spewer = Arc::new(FileSpewer::new(&root, &out, true));
    let batch = Batch::new(
        src.path(),
        &opts_with_report(&report),
        Arc::new(PlainTextExtractor),
        spewer,
    )
    .unwrap();
    let counter = Arc::new(Counter::default());
    batch
        .monitor()
        .add_listener(Arc::clone(&counter) as Arc<dyn Listener>);
    let summary = batch.run().unwrap();

    assert_eq!(summary.scanned, 14);
    assert_eq!(summary.count(ExtractionStatus::Success), 12);
    assert_eq!(summary.count(ExtractionStatus::FailureUnsupported), 2);
    assert_eq!(summary.skipped, 0);
    assert!(!summary.interrupted);
    assert_eq!(counter.steps.load(Ordering::SeqCst), 14);
    assert_eq!(counter.total.load(Ordering::SeqCst), 14);

    assert_eq!(
        std::fs::read_to_string(out.join("d0").join("doc0.txt.txt")).unwrap(),
        "document 0\n"
    );
    assert!(out.join("d0").join("doc0.txt.json").is_file());

    let map = SqliteReportMap::open(&report).unwrap();
    assert_eq!(map.size().unwrap(), 14);
    let id = docbatch::engine::path_to_id_string(&root.join("blob0.bin"));
    assert_eq!(
        map.get(&id).unwrap(),
        Some(ExtractionStatus::FailureUnsupported)
    );
}

/// Looks each notified document up in the report; collects any that are not there yet.
struct ReportChecker {
    map: Arc<dyn ReportMap>,
    missing: Mutex<Vec<String>>,
    seen: AtomicUsize,
}

impl Notifiable for ReportChecker {
    fn notify(&self, detail: Option<&str>) {
        self.seen.fetch_add(1, Ordering::SeqCst);
        let Some(path) = detail else { return };
        let id = docbatch::engine::path_to_id_string(Path::new(path));
        if !matches!(self.map.get(&id), Ok(Some(_))) {
            self.missing.lock().unwrap().push(id);
        }
    }

    fn hint_remaining(&self, _total: usize) {}
}

#[test]
fn test_status_is_stored_before_progress_event() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_tree(src.path(), 30, 5);
    let report = work.path().join("report.db");
    let batch = Batch::new(
        src.path(),
        &Opts {
            await_timeout_secs: u64::MAX,
            ..opts_with_report(&report)
        },
        Arc::new(PlainTextExtractor),
        Arc::new(CollectingSpewer::default()),
    )
    .unwrap();
    let checker = Arc::new(ReportChecker {
        map: Arc::new(SqliteReportMap::open(&report).unwrap()),
        missing: Mutex::new(Vec::new()),
        seen: AtomicUsize::new(0),
    });
    batch
        .monitor()
        .add_listener(Arc::clone(&checker) as Arc<dyn Listener>);
    let summary = batch.run().unwrap();

    assert_eq!(summary.processed(), 35);
    assert_eq!(checker.seen.load(Ordering::SeqCst), 35);
    assert!(checker.missing.lock().unwrap().is_empty());
}

#[test]
fn test_second_run_skips_successes_and_retries_failures() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_tree(src.path(), 10, 3);
    let report = work.path().join("report.db");
    let opts = opts_with_report(&report);

    let first = docbatch::spew_dir(
        src.path(),
        &opts,
        Arc::new(PlainTextExtractor),
        Arc::new(CollectingSpewer::default()),
    )
    .unwrap();
    assert_eq!(first.count(ExtractionStatus::Success), 10);
    assert_eq!(first.failures(), 3);

    let spewer = Arc::new(CollectingSpewer::default());
    let second = docbatch::spew_dir(
        src.path(),
        &opts,
        Arc::new(PlainTextExtractor),
        Arc::clone(&spewer) as Arc<dyn Spewer>,
    )
    .unwrap();
    assert_eq!(second.scanned, 13);
    assert_eq!(second.skipped, 10);
    assert_eq!(second.processed(), 3);
    assert_eq!(second.count(ExtractionStatus::FailureUnsupported), 3);
    assert!(spewer.written.lock().unwrap().is_empty());

    let forced = docbatch::spew_dir(
        src.path(),
        &Opts {
            force: true,
            ..opts.clone()
        },
        Arc::new(PlainTextExtractor),
        Arc::new(CollectingSpewer::default()),
    )
    .unwrap();
    assert_eq!(forced.skipped, 0);
    assert_eq!(forced.count(ExtractionStatus::Success), 10);
}

#[test]
fn test_content_identity_skips_moved_documents() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_tree(src.path(), 4, 0);
    let opts = Opts {
        identity: IdentityKind::Digest,
        ..opts_with_report(&work.path().join("report.db"))
    };
    let first = docbatch::spew_dir(
        src.path(),
        &opts,
        Arc::new(PlainTextExtractor),
        Arc::new(CollectingSpewer::default()),
    )
    .unwrap();
    assert_eq!(first.count(ExtractionStatus::Success), 4);

    std::fs::rename(src.path().join("d0"), src.path().join("moved")).unwrap();
    let second = docbatch::spew_dir(
        src.path(),
        &opts,
        Arc::new(PlainTextExtractor),
        Arc::new(CollectingSpewer::default()),
    )
    .unwrap();
    assert_eq!(second.skipped, 4);
    assert_eq!(second.processed(), 0);
}

#[test]
fn test_report_database_in_root_is_never_extracted() {
    let src = tempfile::tempdir().unwrap();
    write_tree(src.path(), 3, 0);
    for name in [".docbatch.db", "r.db"] {
        let report = src.path().join(name);
        let spewer = Arc::new(CollectingSpewer::default());
        let summary = docbatch::spew_dir(
            src.path(),
            &Opts {
                include_hidden: true,
                force: true,
                ..opts_with_report(&report)
            },
            Arc::new(PlainTextExtractor),
            Arc::clone(&spewer) as Arc<dyn Spewer>,
        )
        .unwrap();
        assert_eq!(summary.scanned, 3, "report {name}");
        assert_eq!(summary.count(ExtractionStatus::Success), 3);
        let written = spewer.written.lock().unwrap();
        assert!(written.iter().all(|(path, _)| {
            let file = path.file_name().unwrap().to_string_lossy();
            !file.starts_with(name)
        }));
    }
    // the second report's database and companions sit beside the documents
    assert!(src.path().join("r.db").is_file());
}

// --- consumer behaviour ---

fn run_consumer(
    reporter: Reporter,
    extractor: Arc<dyn Extractor>,
    spewer: Arc<dyn Spewer>,
    paths: Vec<PathBuf>,
) -> DocumentConsumer {
    let consumer = DocumentConsumer::new(2, reporter, extractor, spewer, true).unwrap();
    let queue = DocumentQueue::new(paths.len().max(1));
    consumer.start(&queue).unwrap();
    let cancel = CancelToken::new();
    for p in paths {
        queue.put(p, &cancel);
    }
    queue.seal();
    consumer.shutdown();
    assert!(consumer.await_termination(BOUND));
    consumer
}

/// Produces one embedded document per container.
struct EmbeddingExtractor;

impl Extractor for EmbeddingExtractor {
    fn extract(
        &self,
        _document: &mut Document,
        _cancel: &CancelToken,
    ) -> Result<Extraction, ExtractionError> {
        Ok(Extraction {
            text: "outer".to_string(),
            embeds: vec![EmbeddedExtraction {
                document: EmbeddedDocument::new("attachments/inner.txt"),
                text: "inner".to_string(),
            }],
            ..Extraction::default()
        })
    }
}

#[test]
fn test_embedded_documents_get_container_derived_ids() {
    let spewer = Arc::new(CollectingSpewer::default());
    let reporter = Reporter::new(
        Arc::new(MemoryReportMap::new()),
        Arc::new(docbatch::document::PathIdentifier),
    );
    let consumer = run_consumer(
        reporter,
        Arc::new(EmbeddingExtractor),
        Arc::clone(&spewer) as Arc<dyn Spewer>,
        vec![PathBuf::from("/box/mail.eml")],
    );
    assert_eq!(consumer.summary().count(ExtractionStatus::Success), 1);
    let written = spewer.written.lock().unwrap();
    let embed = &written[0].1.embeds[0].document;
    assert_eq!(
        embed.metadata().get(EMBED_ID_KEY).map(String::as_str),
        Some("/box/mail.eml/attachments/inner.txt")
    );
}

#[test]
fn test_spewer_failure_records_runtime_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "hello").unwrap();
    let map: Arc<dyn ReportMap> = Arc::new(MemoryReportMap::new());
    let consumer = run_consumer(
        Reporter::new(Arc::clone(&map), Arc::new(docbatch::document::PathIdentifier)),
        Arc::new(PlainTextExtractor),
        Arc::new(FailingSpewer),
        vec![path.clone()],
    );
    assert_eq!(consumer.summary().count(ExtractionStatus::FailureRuntime), 1);
    assert!(consumer.take_fatal_error().is_none());
    assert_eq!(
        map.get(&docbatch::engine::path_to_id_string(&path)).unwrap(),
        Some(ExtractionStatus::FailureRuntime)
    );
}

#[test]
fn test_unidentifiable_document_is_recorded_under_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("vanished.txt");
    let map: Arc<dyn ReportMap> = Arc::new(MemoryReportMap::new());
    let consumer = run_consumer(
        Reporter::new(
            Arc::clone(&map),
            Arc::new(docbatch::document::DigestIdentifier::default()),
        ),
        Arc::new(PlainTextExtractor),
        Arc::new(CollectingSpewer::default()),
        vec![missing.clone()],
    );
    assert_eq!(consumer.summary().count(ExtractionStatus::FailureNotFound), 1);
    assert_eq!(
        map.get(&docbatch::engine::path_to_id_string(&missing)).unwrap(),
        Some(ExtractionStatus::FailureNotFound)
    );
}

/// A store whose writes always fail.
#[derive(Default)]
struct BrokenStore {
    inner: MemoryReportMap,
}

impl ReportMap for BrokenStore {
    fn put(
        &self,
        _id: &str,
        _s: ExtractionStatus,
    ) -> Result<Option<ExtractionStatus>, ReportError> {
        Err(ReportError::Io(io::Error::other("read-only filesystem")))
    }
    fn get(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError> {
        self.inner.get(id)
    }
    fn remove(&self, id: &str) -> Result<Option<ExtractionStatus>, ReportError> {
        self.inner.remove(id)
    }
    fn size(&self) -> Result<usize, ReportError> {
        self.inner.size()
    }
    fn clear(&self) -> Result<(), ReportError> {
        self.inner.clear()
    }
    fn entries(&self) -> Result<Vec<(String, ExtractionStatus)>, ReportError> {
        self.inner.entries()
    }
    fn close(&self) -> Result<(), ReportError> {
        self.inner.close()
    }
}

#[test]
fn test_store_failure_is_fatal_and_cancels_workers() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for i in 0..20 {
        let p = dir.path().join(format!("{i}.txt"));
        std::fs::write(&p, "x").unwrap();
        paths.push(p);
    }
    let consumer = run_consumer(
        Reporter::new(
            Arc::new(BrokenStore::default()),
            Arc::new(docbatch::document::PathIdentifier),
        ),
        Arc::new(PlainTextExtractor),
        Arc::new(CollectingSpewer::default()),
        paths,
    );
    assert!(consumer.cancel_token().is_cancelled());
    assert!(matches!(consumer.take_fatal_error(), Some(ReportError::Io(_))));
    assert!(consumer.take_fatal_error().is_none());
    assert!(consumer.summary().processed() < 20);
}

/// Blocks until cancelled, like a long parse.
#[derive(Default)]
struct StallingExtractor {
    started: AtomicUsize,
}

impl Extractor for StallingExtractor {
    fn extract(
        &self,
        _document: &mut Document,
        cancel: &CancelToken,
    ) -> Result<Extraction, ExtractionError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let deadline = Instant::now() + BOUND;
        while !cancel.is_cancelled() {
            if Instant::now() > deadline {
                return Err(ExtractionError::Runtime("never cancelled".to_string()));
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(ExtractionError::Interrupted)
    }
}

#[test]
fn test_interrupt_records_in_flight_documents_as_interrupted() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_tree(src.path(), 6, 0);
    let report = work.path().join("report.db");
    let opts = Opts {
        num_threads: Some(2),
        ..opts_with_report(&report)
    };
    let extractor = Arc::new(StallingExtractor::default());
    let batch = Batch::new(
        src.path(),
        &opts,
        Arc::clone(&extractor) as Arc<dyn Extractor>,
        Arc::new(CollectingSpewer::default()),
    )
    .unwrap();
    let interrupter = batch.interrupter();
    let run = thread::spawn(move || batch.run());

    let deadline = Instant::now() + BOUND;
    while extractor.started.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    interrupter.interrupt();
    interrupter.interrupt();
    let summary = run.join().unwrap().unwrap();

    assert!(interrupter.is_interrupted());
    assert!(summary.interrupted);
    assert_eq!(summary.count(ExtractionStatus::FailureInterrupted), 2);
    assert_eq!(summary.count(ExtractionStatus::Success), 0);

    let map = SqliteReportMap::open(&report).unwrap();
    let interrupted = map
        .entries()
        .unwrap()
        .into_iter()
        .filter(|(_, s)| *s == ExtractionStatus::FailureInterrupted)
        .count();
    assert_eq!(interrupted, 2);
}
