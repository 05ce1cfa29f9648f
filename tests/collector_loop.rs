//! Collector loop behaviour against in-memory render and sink fakes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use lotwatch::collector::{shutdown, Collector, CollectorSettings, ShutdownTrigger};
use lotwatch::models::{Layout, Observation};
use lotwatch::render::{ListingContainer, RenderError, RenderSource};
use lotwatch::sink::{ListingSink, SinkError};

#[derive(Debug, Default)]
struct RenderLog {
    navigations: usize,
    ready_waits: usize,
    snapshots: usize,
    refreshes: usize,
    closes: usize,
}

struct FakeRender {
    log: Arc<Mutex<RenderLog>>,
    page: Vec<ListingContainer>,
    fail_navigation: bool,
    /// 1-based ready waits that time out.
    failing_ready_waits: Vec<usize>,
}

impl FakeRender {
    fn new(page: Vec<ListingContainer>) -> (Self, Arc<Mutex<RenderLog>>) {
        let log = Arc::new(Mutex::new(RenderLog::default()));
        let render = Self {
            log: log.clone(),
            page,
            fail_navigation: false,
            failing_ready_waits: Vec::new(),
        };
        (render, log)
    }
}

#[async_trait]
impl RenderSource for FakeRender {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.log.lock().unwrap().navigations += 1;
        if self.fail_navigation {
            return Err(RenderError::Navigation(format!("unreachable: {}", url)));
        }
        Ok(())
    }

    async fn wait_for_ready(&mut self, timeout: Duration) -> Result<(), RenderError> {
        let mut log = self.log.lock().unwrap();
        log.ready_waits += 1;
        if self.failing_ready_waits.contains(&log.ready_waits) {
            return Err(RenderError::Timeout(timeout));
        }
        Ok(())
    }

    async fn trigger_lazy_load(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    async fn settle(&mut self, _duration: Duration) {}

    async fn snapshot(&mut self) -> Result<Vec<ListingContainer>, RenderError> {
        self.log.lock().unwrap().snapshots += 1;
        Ok(self.page.clone())
    }

    async fn refresh(&mut self) -> Result<(), RenderError> {
        self.log.lock().unwrap().refreshes += 1;
        Ok(())
    }

    async fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

#[derive(Clone, Copy)]
enum Failure {
    Unavailable,
    Rejected,
}

struct FakeSink {
    rows: Arc<Mutex<Vec<Observation>>>,
    calls: usize,
    /// 1-based append calls that fail.
    failures: HashMap<usize, Failure>,
    /// Fire shutdown after this many successful appends.
    stop_after: Option<(usize, ShutdownTrigger)>,
}

impl FakeSink {
    fn new() -> (Self, Arc<Mutex<Vec<Observation>>>) {
        let rows = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            rows: rows.clone(),
            calls: 0,
            failures: HashMap::new(),
            stop_after: None,
        };
        (sink, rows)
    }
}

#[async_trait]
impl ListingSink for FakeSink {
    async fn ensure_table(&mut self, _table: &str, _layout: Layout) -> Result<(), SinkError> {
        Ok(())
    }

    async fn append(&mut self, table: &str, observation: &Observation) -> Result<(), SinkError> {
        assert_eq!(table, "EA1");
        self.calls += 1;
        match self.failures.get(&self.calls) {
            Some(Failure::Unavailable) => {
                return Err(SinkError::Unavailable("connection refused".to_string()))
            }
            Some(Failure::Rejected) => return Err(SinkError::Rejected("bad row".to_string())),
            None => {}
        }

        let mut rows = self.rows.lock().unwrap();
        rows.push(observation.clone());
        if let Some((n, trigger)) = &self.stop_after {
            if rows.len() >= *n {
                trigger.trigger();
            }
        }
        Ok(())
    }
}

fn card(index: usize) -> ListingContainer {
    ListingContainer::from_html(
        index,
        format!(
            r#"<div class="list-card-container">
                <h3>2019 Honda Accord #{index}</h3>
                <div id="CARD_PRICE_{index}"><span>AED</span><span>45,000</span></div>
                <div><div>Lot #{index}00</div><div>1,200 km</div></div>
            </div>"#
        ),
    )
}

/// Five containers, the third of which has no lot block.
fn page() -> Vec<ListingContainer> {
    let mut page: Vec<_> = (1..=5).map(card).collect();
    page[2] = ListingContainer::from_html(3, "<div><h3>Broken card</h3></div>");
    page
}

fn settings(interval: Duration) -> CollectorSettings {
    CollectorSettings {
        url: "https://example.com/motors".to_string(),
        table: "EA1".to_string(),
        layout: Layout::Attribute,
        ready_timeout: Duration::from_secs(1),
        settle: Duration::ZERO,
        interval,
        backoff_cap: None,
        max_ticks: None,
    }
}

fn lots(rows: &[Observation]) -> Vec<String> {
    rows.iter().map(|o| o.record.lot.clone()).collect()
}

#[tokio::test]
async fn test_interrupt_mid_sleep_closes_render_once() {
    let (render, log) = FakeRender::new(page());
    let (sink, rows) = FakeSink::new();
    let (trigger, shutdown) = shutdown::channel();

    let collector = Collector::new(render, sink, settings(Duration::from_secs(3600)), shutdown);
    let run = tokio::spawn(collector.run());

    // The first tick persists four records, then the loop sleeps for an hour
    let watched = rows.clone();
    tokio::time::timeout(Duration::from_secs(5), async move {
        while watched.lock().unwrap().len() < 4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first tick never completed");
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.trigger();

    let stats = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("loop did not stop on interrupt")
        .unwrap()
        .unwrap();

    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.persisted, 4);
    assert_eq!(stats.extract_failures, 1);

    let log = log.lock().unwrap();
    assert_eq!(log.closes, 1);
    assert_eq!(log.refreshes, 0);
    assert_eq!(rows.lock().unwrap().len(), 4);
    assert_eq!(lots(&rows.lock().unwrap()), vec!["100", "200", "400", "500"]);
}

#[tokio::test]
async fn test_interrupt_between_records_stops_persisting() {
    let (render, log) = FakeRender::new(page());
    let (mut sink, rows) = FakeSink::new();
    let (trigger, shutdown) = shutdown::channel();
    sink.stop_after = Some((2, trigger));

    let stats = Collector::new(render, sink, settings(Duration::from_secs(3600)), shutdown)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.persisted, 2);
    assert_eq!(lots(&rows.lock().unwrap()), vec!["100", "200"]);
    assert_eq!(log.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn test_sink_unavailable_skips_rest_of_tick() {
    let (render, log) = FakeRender::new(page());
    let (mut sink, rows) = FakeSink::new();
    sink.failures.insert(2, Failure::Unavailable);
    let (_trigger, shutdown) = shutdown::channel();

    let mut settings = settings(Duration::from_millis(10));
    settings.max_ticks = Some(2);
    let stats = Collector::new(render, sink, settings, shutdown)
        .run()
        .await
        .unwrap();

    // Tick 1 stops after the outage; tick 2 persists everything
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.sink_outages, 1);
    assert_eq!(stats.persisted, 5);
    assert_eq!(
        lots(&rows.lock().unwrap()),
        vec!["100", "100", "200", "400", "500"]
    );

    let log = log.lock().unwrap();
    assert_eq!(log.refreshes, 1);
    assert_eq!(log.closes, 1);
}

#[tokio::test]
async fn test_rejected_row_only_skips_that_row() {
    let (render, _log) = FakeRender::new(page());
    let (mut sink, rows) = FakeSink::new();
    sink.failures.insert(2, Failure::Rejected);
    let (_trigger, shutdown) = shutdown::channel();

    let mut settings = settings(Duration::from_millis(10));
    settings.max_ticks = Some(1);
    let stats = Collector::new(render, sink, settings, shutdown)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.persisted, 3);
    assert_eq!(lots(&rows.lock().unwrap()), vec!["100", "400", "500"]);
}

#[tokio::test]
async fn test_render_timeout_fails_only_that_tick() {
    let (mut render, log) = FakeRender::new(page());
    render.failing_ready_waits = vec![1];
    let (sink, rows) = FakeSink::new();
    let (_trigger, shutdown) = shutdown::channel();

    let mut settings = settings(Duration::from_millis(10));
    settings.max_ticks = Some(2);
    let stats = Collector::new(render, sink, settings, shutdown)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.render_failures, 1);
    assert_eq!(stats.persisted, 4);
    assert_eq!(rows.lock().unwrap().len(), 4);

    let log = log.lock().unwrap();
    assert_eq!(log.snapshots, 1);
    assert_eq!(log.refreshes, 1);
    assert_eq!(log.closes, 1);
}

#[tokio::test]
async fn test_navigation_failure_closes_and_errors() {
    let (mut render, log) = FakeRender::new(page());
    render.fail_navigation = true;
    let (sink, rows) = FakeSink::new();
    let (_trigger, shutdown) = shutdown::channel();

    let result = Collector::new(render, sink, settings(Duration::from_secs(1)), shutdown)
        .run()
        .await;

    assert!(matches!(result, Err(RenderError::Navigation(_))));
    assert!(rows.lock().unwrap().is_empty());

    let log = log.lock().unwrap();
    assert_eq!(log.closes, 1);
    assert_eq!(log.ready_waits, 0);
}

#[tokio::test]
async fn test_observation_times_never_decrease() {
    let (render, _log) = FakeRender::new(page());
    let (sink, rows) = FakeSink::new();
    let (_trigger, shutdown) = shutdown::channel();

    let mut settings = settings(Duration::from_millis(10));
    settings.max_ticks = Some(3);
    Collector::new(render, sink, settings, shutdown)
        .run()
        .await
        .unwrap();

    let rows = rows.lock().unwrap();
    assert_eq!(rows.len(), 12);
    assert!(rows
        .windows(2)
        .all(|pair| pair[0].observed_at <= pair[1].observed_at));
}
