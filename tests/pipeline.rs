//! Whole-pipeline tests over CSV tables and scripted converters.
//!
//! No pdfium and no network: tables come from CSV files written to a temp
//! directory and the converter is an in-process [`TransliterationOracle`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use voterlist::{
    convert_rows, convert_with_oracle, preview, BatchReport, DecodeProgressCallback, HeaderPolicy,
    OracleError, PipelineConfig, RawRow, TransliterationOracle,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

const ROLL_CSV: &str = "\
AC,PART,SL,HOUSE NO,SECN,NAME,LAST,RELATION TYPE,RELATION NAME,RELATION LAST,ID_CARD_NO,LINK,SEX,AGE,HOUSE NAME
90,143,1,81U,1,Ravi,,F,Gopi,,KL/01/0001,143,M,40,Rose
,,,,,Kumar,,,,,,,,,Villa
90,143,2,42,1,Sita,,H,Ravi,,KL/01/0002,143,F,35,Rose Villa
90,143,3,,,NAME,,,,,ID_CARD_NO,,,,
";

/// Decodes a few known words, brackets everything else.
struct Scripted {
    words: HashMap<&'static str, &'static str>,
    batches: Vec<Vec<String>>,
    opened: bool,
    closed: bool,
}

impl Scripted {
    fn new() -> Self {
        let words = HashMap::from([("Ravi Kumar", "രവി കുമാർ"), ("Sita", "സീത"), ("U", "ഡി")]);
        Self {
            words,
            batches: Vec::new(),
            opened: false,
            closed: false,
        }
    }
}

#[async_trait]
impl TransliterationOracle for Scripted {
    async fn open(&mut self) -> Result<(), OracleError> {
        self.opened = true;
        Ok(())
    }

    async fn decode(&mut self, batch: &[String]) -> Result<Vec<String>, OracleError> {
        self.batches.push(batch.to_vec());
        Ok(batch
            .iter()
            .map(|v| match self.words.get(v.as_str()) {
                Some(w) => w.to_string(),
                None => format!("[{v}]"),
            })
            .collect())
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

/// A converter that is down.
struct Down;

#[async_trait]
impl TransliterationOracle for Down {
    async fn open(&mut self) -> Result<(), OracleError> {
        Err(OracleError::Unreachable {
            detail: "connection refused".into(),
        })
    }

    async fn decode(&mut self, _batch: &[String]) -> Result<Vec<String>, OracleError> {
        Err(OracleError::Unreachable {
            detail: "connection refused".into(),
        })
    }
}

fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path.to_string_lossy().to_string()
}

fn fast_config() -> PipelineConfig {
    PipelineConfig::builder()
        .settle_delay_ms(0)
        .warmup_delay_ms(0)
        .build()
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn roll_is_rebuilt_and_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(&dir, "part143.csv", ROLL_CSV);
    let config = fast_config();
    let mut oracle = Scripted::new();

    let out = convert_with_oracle(&input, &config, &mut oracle).await.unwrap();

    assert!(oracle.opened && oracle.closed);
    assert_eq!(out.records.len(), 2, "header dropped, placeholder purged");

    let ravi = &out.records[0];
    assert_eq!(ravi.sl_no, 1);
    assert_eq!(ravi.first_name, "രവി കുമാർ");
    assert_eq!(ravi.relation_type, "[F]");
    assert_eq!(ravi.relation_first_name, "[Gopi]");
    assert_eq!(ravi.house_name, "[Rose Villa]");
    assert_eq!(ravi.house_no, "81ഡി");
    assert_eq!(ravi.id_card_no, "KL/01/0001");
    assert_eq!(ravi.sex, "M");
    assert_eq!(ravi.age, "40");

    let sita = &out.records[1];
    assert_eq!(sita.sl_no, 2);
    assert_eq!(sita.first_name, "സീത");
    assert_eq!(sita.house_no, "42");

    assert!(out.records.iter().all(|r| r.id_card_no != "ID_CARD_NO"));
    assert_eq!(out.stats.raw_rows, 5);
    assert_eq!(out.stats.header_rows, 1);
    assert_eq!(out.stats.continuation_rows, 1);
    assert_eq!(out.stats.logical_records, 3);
    assert_eq!(out.stats.purged_records, 1);
    assert_eq!(out.stats.fallback_batches, 0);
    assert!(!out.has_fallbacks());

    // Numeric values never reach the converter.
    for batch in &oracle.batches {
        assert!(batch.iter().all(|v| !v.chars().all(|c| c.is_ascii_digit())));
    }
    // The house-number exchange only carries the suffix.
    assert!(oracle.batches.contains(&vec!["U".to_string()]));
}

#[tokio::test]
async fn converter_down_leaves_values_as_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(&dir, "part143.csv", ROLL_CSV);
    let config = fast_config();

    let undecoded = preview(&input, &config).await.unwrap();
    let out = convert_with_oracle(&input, &config, &mut Down).await.unwrap();

    assert_eq!(out.records, undecoded);
    assert_eq!(out.records[0].first_name, "Ravi Kumar");
    assert_eq!(out.records[0].house_no, "81U");
    assert!(out.stats.batches > 0);
    assert_eq!(out.stats.fallback_batches, out.stats.batches);
}

#[tokio::test]
async fn loose_header_policy_drops_more() {
    let rows: Vec<RawRow> = vec![
        ["AGE", "", "", "", "", "", "", "", "", "", "", "", "", "", ""],
        ["90", "143", "1", "", "1", "Ravi", "", "F", "Gopi", "", "KL/01/0001", "143", "M", "40", "Rose"],
    ]
    .into_iter()
    .map(|r| r.iter().map(|c| Some(c.to_string())).collect())
    .collect();

    let strict = fast_config();
    let out = convert_rows(rows.clone(), &strict, &mut Scripted::new()).await.unwrap();
    assert_eq!(out.stats.header_rows, 0);

    let loose = PipelineConfig::builder()
        .settle_delay_ms(0)
        .warmup_delay_ms(0)
        .header_policy(HeaderPolicy::AnyOf)
        .build()
        .unwrap();
    let out = convert_rows(rows, &loose, &mut Scripted::new()).await.unwrap();
    assert_eq!(out.stats.header_rows, 1);
    assert_eq!(out.records.len(), 1);
}

#[derive(Default)]
struct Recorder {
    planned: AtomicUsize,
    completed: AtomicUsize,
    fields: Mutex<Vec<String>>,
    finished: AtomicUsize,
}

impl DecodeProgressCallback for Recorder {
    fn on_run_start(&self, _records: usize, batches: usize) {
        self.planned.store(batches, Ordering::SeqCst);
    }

    fn on_field_start(&self, field: &str, _selected: usize, _batches: usize) {
        self.fields.lock().unwrap().push(field.to_string());
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        assert!(report.size <= 1);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_run_complete(&self, records: usize, _fallbacks: usize) {
        self.finished.store(records, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_sees_every_batch() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(&dir, "part143.csv", ROLL_CSV);
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .batch_size(1)
        .settle_delay_ms(0)
        .warmup_delay_ms(0)
        .progress_callback(recorder.clone() as Arc<dyn DecodeProgressCallback>)
        .build()
        .unwrap();

    let out = convert_with_oracle(&input, &config, &mut Scripted::new()).await.unwrap();

    let planned = recorder.planned.load(Ordering::SeqCst);
    assert_eq!(planned, out.stats.batches);
    assert_eq!(recorder.completed.load(Ordering::SeqCst), planned);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 2);
    assert_eq!(
        *recorder.fields.lock().unwrap(),
        vec!["Name", "RelType", "RelName", "HouseName", "HouseSuffixes"]
    );
}

#[tokio::test]
async fn header_only_table_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        &dir,
        "headers.csv",
        "AC,PART,SL,HOUSE NO,SECN,NAME,LAST,RELATION TYPE,RELATION NAME,RELATION LAST,ID_CARD_NO,LINK,SEX,AGE,HOUSE NAME\n",
    );
    let err = convert_with_oracle(&input, &fast_config(), &mut Scripted::new())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("No data"), "{err}");
}
