use anyhow::{Result as AnyResult, bail};
use async_trait::async_trait;
use ingest_application::{
    BatchProcessor, CatalogProductLookup, InMemoryRecordStore, LookupError, NoopProductLookup,
    PersistError, ProcessorConfig, ProductLookup, RecordPersister, Stage, StageError, StageFailure,
};
use ingest_domain::event::kinds::{self, keys};
use ingest_domain::eventing::{EventBus, EventHandler, HandledEventType, InMemoryEventBus};
use ingest_domain::{Event, Priority, ProcessedRecord, RawBatch, Record, RecordType, Value, record};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 按顺序记录收到的全部事件
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }

    fn find(&self, ty: &str) -> Event {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.event_type() == ty)
            .cloned()
            .unwrap_or_else(|| panic!("no {ty} event"))
    }
}

#[async_trait]
impl EventHandler for Recorder {
    fn handler_name(&self) -> &str {
        "recorder"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::All
    }

    async fn handle(&self, event: &Event) -> AnyResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct Harness {
    bus: Arc<InMemoryEventBus>,
    recorder: Arc<Recorder>,
    store: Arc<InMemoryRecordStore>,
    processor: BatchProcessor,
}

fn harness_with(lookup: Arc<dyn ProductLookup>) -> Harness {
    let bus = Arc::new(InMemoryEventBus::new());
    let recorder = Arc::new(Recorder::default());
    bus.register(recorder.clone());
    let store = Arc::new(InMemoryRecordStore::new());
    let processor = BatchProcessor::builder()
        .event_bus(bus.clone())
        .product_lookup(lookup)
        .record_persister(store.clone())
        .build();
    Harness {
        bus,
        recorder,
        store,
        processor,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(NoopProductLookup))
}

fn widget() -> Record {
    record([
        ("sku", Value::from("A1")),
        ("nombre", Value::from("Widget")),
        ("precio", Value::Float(10.0)),
    ])
}

fn product_batch(records: Vec<Record>) -> RawBatch {
    RawBatch::new("posX", RecordType::Producto, records, 3)
}

fn count(event: &Event, key: &str) -> Option<f64> {
    event.get(key).and_then(Value::as_f64)
}

#[tokio::test]
async fn single_valid_product_flows_through() {
    let h = harness();

    h.processor
        .process_batch(product_batch(vec![widget()]))
        .await
        .unwrap();

    assert_eq!(
        h.recorder.types(),
        vec![
            kinds::DATA_COLLECTED,
            kinds::DATA_PROCESSED,
            kinds::DATA_PERSISTED
        ]
    );

    let collected = h.recorder.find(kinds::DATA_COLLECTED);
    assert_eq!(collected.get(keys::ORIGIN), Some(&Value::from("posX")));
    assert_eq!(collected.get(keys::RECORD_TYPE), Some(&Value::from("producto")));
    assert_eq!(count(&collected, keys::COUNT), Some(1.0));
    assert_eq!(count(&collected, keys::BRANCH_ID), Some(3.0));
    assert_eq!(collected.source(), "procesador_datos");

    let processed = h.recorder.find(kinds::DATA_PROCESSED);
    assert_eq!(count(&processed, keys::INITIAL_COUNT), Some(1.0));
    assert_eq!(count(&processed, keys::FINAL_COUNT), Some(1.0));

    let persisted = h.recorder.find(kinds::DATA_PERSISTED);
    assert_eq!(count(&persisted, keys::PERSISTED_COUNT), Some(1.0));
    assert_eq!(count(&persisted, keys::SUCCEEDED_COUNT), Some(1.0));
    assert_eq!(count(&persisted, keys::FAILED_COUNT), Some(0.0));

    let stored = h.store.records(RecordType::Producto);
    assert_eq!(stored.len(), 1);
    assert!(stored[0].validated);
    assert_eq!(stored[0].text("nombre"), Some("widget"));
    assert_eq!(stored[0].number("precio"), Some(10.0));
}

#[tokio::test]
async fn identical_records_are_persisted_once() {
    let h = harness();

    h.processor
        .process_batch(product_batch(vec![widget(), widget()]))
        .await
        .unwrap();

    let processed = h.recorder.find(kinds::DATA_PROCESSED);
    assert_eq!(count(&processed, keys::INITIAL_COUNT), Some(2.0));
    assert_eq!(count(&processed, keys::FINAL_COUNT), Some(1.0));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn invalid_record_is_dropped_without_failing() {
    let h = harness();

    h.processor
        .process_batch(product_batch(vec![record([("sku", "A1")])]))
        .await
        .unwrap();

    let processed = h.recorder.find(kinds::DATA_PROCESSED);
    assert_eq!(count(&processed, keys::FINAL_COUNT), Some(0.0));
    assert_eq!(count(&h.recorder.find(kinds::DATA_PERSISTED), keys::PERSISTED_COUNT), Some(0.0));
    assert!(h.store.is_empty());
    assert!(h.recorder.types().iter().all(|t| !kinds::is_error(t)));
}

#[tokio::test]
async fn empty_batch_fails_in_normalize_and_emits_error() {
    let h = harness();

    let err = h
        .processor
        .process_batch(product_batch(Vec::new()))
        .await
        .unwrap_err();

    assert_eq!(err, StageError::new(Stage::Normalize, StageFailure::EmptyBatch));
    assert_eq!(
        h.recorder.types(),
        vec![kinds::DATA_COLLECTED.to_string(), "error.normalizacion".to_string()]
    );

    let error = h.recorder.find("error.normalizacion");
    assert_eq!(error.priority(), Priority::High);
    assert_eq!(error.get(keys::ERROR_KIND), Some(&Value::from("error_normalizacion")));
    assert_eq!(error.get(keys::STAGE), Some(&Value::from("normalize")));
    assert_eq!(error.get(keys::ORIGIN), Some(&Value::from("posX")));
    assert!(
        error
            .get(keys::MESSAGE)
            .and_then(Value::as_str)
            .is_some_and(|m| m.contains("no records"))
    );
}

/// 记录富化阶段查询过的 SKU
#[derive(Default)]
struct SpyLookup {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl ProductLookup for SpyLookup {
    async fn lookup(&self, sku: &str) -> Result<Record, LookupError> {
        self.seen.lock().unwrap().push(sku.to_string());
        if sku == "ROTO" {
            return Err(LookupError::Transport {
                reason: "connection reset".into(),
            });
        }
        Ok(record([("categoria", "general")]))
    }

    fn source_tag(&self) -> &str {
        "espia"
    }
}

/// 持久化观察者：确认收到的记录已校验且互不重复
#[derive(Default)]
struct SpyPersister {
    received: Mutex<Vec<ProcessedRecord>>,
}

#[async_trait]
impl RecordPersister for SpyPersister {
    async fn persist(&self, record: &ProcessedRecord) -> Result<(), PersistError> {
        self.received.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[tokio::test]
async fn enrich_sees_only_validated_and_persist_only_unique() {
    let bus = Arc::new(InMemoryEventBus::new());
    let lookup = Arc::new(SpyLookup::default());
    let persister = Arc::new(SpyPersister::default());
    let processor = BatchProcessor::builder()
        .event_bus(bus)
        .product_lookup(lookup.clone())
        .record_persister(persister.clone())
        .config(ProcessorConfig {
            enrich_concurrency: 2,
            persist_concurrency: 2,
            ..ProcessorConfig::default()
        })
        .build();

    let batch = product_batch(vec![
        widget(),
        record([("sku", "SIN_NOMBRE")]),
        widget(),
        record([("sku", "ROTO"), ("nombre", "roto")]),
    ]);
    processor.process_batch(batch).await.unwrap();

    let seen = lookup.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert!(!seen.contains(&"SIN_NOMBRE".to_string()));

    let received = persister.received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|r| r.validated));
    let widget = received.iter().find(|r| r.text("sku") == Some("A1")).unwrap();
    assert!(widget.enriched);
    assert_eq!(widget.text("categoria"), Some("general"));
    assert_eq!(widget.text("fuente_enriquecimiento"), Some("espia"));
    let broken = received.iter().find(|r| r.text("sku") == Some("ROTO")).unwrap();
    assert!(!broken.enriched);
}

struct FailingObserver {
    hits: AtomicUsize,
}

#[async_trait]
impl EventHandler for FailingObserver {
    fn handler_name(&self) -> &str {
        "failing_observer"
    }

    fn handled_event_type(&self) -> HandledEventType {
        HandledEventType::One(kinds::DATA_COLLECTED.into())
    }

    async fn handle(&self, _event: &Event) -> AnyResult<()> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        bail!("observer is down")
    }
}

#[tokio::test]
async fn failing_observer_does_not_fail_the_batch() {
    let h = harness();
    let observer = Arc::new(FailingObserver {
        hits: AtomicUsize::new(0),
    });
    h.bus.register(observer.clone());

    h.processor
        .process_batch(product_batch(vec![widget()]))
        .await
        .unwrap();

    assert_eq!(observer.hits.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.len(), 1);
    assert!(h.recorder.types().contains(&kinds::DATA_PERSISTED.to_string()));
}

struct FlakyStore;

#[async_trait]
impl RecordPersister for FlakyStore {
    async fn persist(&self, record: &ProcessedRecord) -> Result<(), PersistError> {
        if record.text("sku") == Some("B2") {
            return Err(PersistError::Unavailable {
                reason: "disk full".into(),
            });
        }
        Ok(())
    }
}

#[tokio::test]
async fn persist_failures_are_counted_not_fatal() {
    let bus = Arc::new(InMemoryEventBus::new());
    let recorder = Arc::new(Recorder::default());
    bus.register(recorder.clone());
    let processor = BatchProcessor::builder()
        .event_bus(bus)
        .product_lookup(Arc::new(NoopProductLookup))
        .record_persister(Arc::new(FlakyStore))
        .build();

    let mut other = widget();
    other.insert("sku".into(), Value::from("B2"));
    processor
        .process_batch(product_batch(vec![widget(), other]))
        .await
        .unwrap();

    let persisted = recorder.find(kinds::DATA_PERSISTED);
    assert_eq!(count(&persisted, keys::PERSISTED_COUNT), Some(2.0));
    assert_eq!(count(&persisted, keys::SUCCEEDED_COUNT), Some(1.0));
    assert_eq!(count(&persisted, keys::FAILED_COUNT), Some(1.0));
}

#[tokio::test]
async fn catalog_lookup_enriches_sales_details_untouched() {
    let lookup = CatalogProductLookup::new("catalogo")
        .with_product("A1", record([("categoria", "herramientas")]));
    let h = harness_with(Arc::new(lookup));

    let sale = record([
        ("sucursal_id", Value::Integer(3)),
        ("fecha_venta", Value::from("2024-01-15")),
        ("total", Value::from("99,90")),
    ]);
    h.processor
        .process_batch(RawBatch::new("posX", RecordType::Venta, vec![sale], 3))
        .await
        .unwrap();

    let stored = h.store.records(RecordType::Venta);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].number("total"), Some(99.9));
    assert!(stored[0].get("fecha_venta").and_then(Value::as_timestamp).is_some());
    assert!(!stored[0].enriched);
    assert_eq!(stored[0].text("fuente_enriquecimiento"), Some("catalogo"));
}

#[tokio::test]
async fn sale_with_text_branch_id_and_details_is_persisted() {
    let h = harness();

    let sale = record([
        ("sucursal_id", Value::from("3")),
        ("fecha_venta", Value::from("2024-01-15")),
        ("total", Value::from("99,90")),
        (
            "detalles_venta",
            Value::List(vec![Value::Map(record([
                ("sku", Value::from("a1")),
                ("cantidad", Value::from("2")),
                ("precio_unitario", Value::from("49,95")),
            ]))]),
        ),
    ]);
    h.processor
        .process_batch(RawBatch::new("excel", RecordType::Venta, vec![sale], 3))
        .await
        .unwrap();

    let stored = h.store.records(RecordType::Venta);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get("sucursal_id"), Some(&Value::Integer(3)));
    let detalles = stored[0].get("detalles_venta").and_then(Value::as_list).unwrap();
    assert_eq!(detalles[0].as_map().unwrap()["cantidad"], Value::Float(2.0));
}

#[tokio::test]
async fn sale_with_negative_detail_is_dropped() {
    let h = harness();

    let sale = record([
        ("sucursal_id", Value::from("3")),
        ("fecha_venta", Value::from("2024-01-15")),
        (
            "detalles_venta",
            Value::List(vec![Value::Map(record([
                ("sku", Value::from("a1")),
                ("cantidad", Value::from("-1")),
            ]))]),
        ),
    ]);
    h.processor
        .process_batch(RawBatch::new("excel", RecordType::Venta, vec![sale], 3))
        .await
        .unwrap();

    assert!(h.store.records(RecordType::Venta).is_empty());
}

#[tokio::test]
async fn concurrent_batches_are_independent() {
    let h = Arc::new(harness());

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let h = h.clone();
            tokio::spawn(async move {
                let rec = record([
                    ("sku", Value::from(format!("S{i}"))),
                    ("nombre", Value::from("item")),
                ]);
                h.processor.process_batch(product_batch(vec![rec])).await
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap().unwrap();
    }

    assert_eq!(h.store.len(), 8);
    let types = h.recorder.types();
    assert_eq!(types.iter().filter(|t| *t == kinds::DATA_PROCESSED).count(), 8);

    let batch_ids: std::collections::HashSet<String> = h
        .recorder
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.event_type() == kinds::DATA_PROCESSED)
        .filter_map(|e| e.get(keys::BATCH_ID).and_then(Value::as_str).map(str::to_string))
        .collect();
    assert_eq!(batch_ids.len(), 8);
}
