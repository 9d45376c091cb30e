//! Configuration types for a voter-list run.
//!
//! Every knob lives in [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. This includes the two row heuristics whose
//! intended variant is not settled (header detection and the new-record
//! test); both are named policies so either can be selected and tested.

use crate::error::VoterListError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default converter page driven by the HTTP form surface.
pub const DEFAULT_CONVERTER_URL: &str = "https://nandakumar.co.in/software/unirev/web/";

/// Literal found in the ID-card column of repeated table headers.
pub const DEFAULT_ID_CARD_PLACEHOLDER: &str = "ID_CARD_NO";

/// Configuration for a voter-list run.
///
/// # Example
/// ```rust
/// use voterlist::{HeaderPolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .batch_size(100)
///     .settle_delay_ms(1500)
///     .header_policy(HeaderPolicy::AnyOf)
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 100);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum number of values exchanged with the converter per round trip. Default: 150.
    ///
    /// Larger batches mean fewer round trips but bigger text blocks in the
    /// converter's input box. 100 and 150 are both known to work.
    pub batch_size: usize,

    /// Wait between triggering a conversion and reading its output, in ms. Default: 800.
    pub settle_delay_ms: u64,

    /// Wait after loading the converter before the first exchange, in ms. Default: 2000.
    pub warmup_delay_ms: u64,

    /// Which marker tokens identify a repeated table header.
    pub header_policy: HeaderPolicy,

    /// Which tests mark a row as the start of a new voter.
    pub new_record: NewRecordPolicy,

    /// ID-card value that marks a header row surviving the earlier filters.
    pub id_card_placeholder: String,

    /// Converter page URL.
    pub converter_url: String,

    /// Form field name the converter reads its input text from. Default: "input".
    pub input_field: String,

    /// Per-request timeout for converter HTTP calls, in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Vertical distance (points) within which text runs share a table row. Default: 2.0.
    pub row_tolerance: f32,

    /// Horizontal gap (points) that separates two cells. Default: 6.0.
    pub cell_gap: f32,

    /// Optional observer for decode progress.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 150,
            settle_delay_ms: 800,
            warmup_delay_ms: 2000,
            header_policy: HeaderPolicy::default(),
            new_record: NewRecordPolicy::default(),
            id_card_placeholder: DEFAULT_ID_CARD_PLACEHOLDER.to_string(),
            converter_url: DEFAULT_CONVERTER_URL.to_string(),
            input_field: "input".to_string(),
            request_timeout_secs: 30,
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            row_tolerance: 2.0,
            cell_gap: 6.0,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("batch_size", &self.batch_size)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("warmup_delay_ms", &self.warmup_delay_ms)
            .field("header_policy", &self.header_policy)
            .field("new_record", &self.new_record)
            .field("id_card_placeholder", &self.id_card_placeholder)
            .field("converter_url", &self.converter_url)
            .field("input_field", &self.input_field)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DecodeProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.max(1);
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settle_delay_ms = ms;
        self
    }

    pub fn warmup_delay_ms(mut self, ms: u64) -> Self {
        self.config.warmup_delay_ms = ms;
        self
    }

    pub fn header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.config.header_policy = policy;
        self
    }

    pub fn new_record(mut self, policy: NewRecordPolicy) -> Self {
        self.config.new_record = policy;
        self
    }

    pub fn id_card_placeholder(mut self, token: impl Into<String>) -> Self {
        self.config.id_card_placeholder = token.into();
        self
    }

    pub fn converter_url(mut self, url: impl Into<String>) -> Self {
        self.config.converter_url = url.into();
        self
    }

    pub fn input_field(mut self, name: impl Into<String>) -> Self {
        self.config.input_field = name.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn row_tolerance(mut self, pt: f32) -> Self {
        self.config.row_tolerance = pt;
        self
    }

    pub fn cell_gap(mut self, pt: f32) -> Self {
        self.config.cell_gap = pt;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, VoterListError> {
        let c = &self.config;
        if c.batch_size == 0 {
            return Err(VoterListError::InvalidConfig(
                "Batch size must be ≥ 1".into(),
            ));
        }
        if !(c.converter_url.starts_with("http://") || c.converter_url.starts_with("https://")) {
            return Err(VoterListError::InvalidConfig(format!(
                "Converter URL must be http(s), got '{}'",
                c.converter_url
            )));
        }
        if c.input_field.trim().is_empty() {
            return Err(VoterListError::InvalidConfig(
                "Converter input field name must not be empty".into(),
            ));
        }
        if c.row_tolerance < 0.0 || c.cell_gap <= 0.0 {
            return Err(VoterListError::InvalidConfig(format!(
                "Extractor tolerances must be positive (row {}, cell {})",
                c.row_tolerance, c.cell_gap
            )));
        }
        Ok(self.config)
    }
}

// ── Policies ─────────────────────────────────────────────────────────────

/// How a repeated table header is recognised.
///
/// Both policies look at the upper-cased concatenation of a row's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaderPolicy {
    /// Header if the row contains every token in [`HeaderPolicy::ALL_OF_MARKERS`]. (default)
    #[default]
    AllOf,
    /// Header if the row contains any token in [`HeaderPolicy::ANY_OF_MARKERS`].
    ///
    /// Catches more header fragments but also discards data rows whose free
    /// text happens to contain one of the words.
    AnyOf,
}

impl HeaderPolicy {
    pub const ALL_OF_MARKERS: [&'static str; 2] = ["RELATION", "SEX"];
    pub const ANY_OF_MARKERS: [&'static str; 3] = ["RELATION", "SEX", "AGE"];

    /// Whether `upper` (already upper-cased row text) is a header.
    pub fn matches(self, upper: &str) -> bool {
        match self {
            HeaderPolicy::AllOf => Self::ALL_OF_MARKERS.iter().all(|m| upper.contains(m)),
            HeaderPolicy::AnyOf => Self::ANY_OF_MARKERS.iter().any(|m| upper.contains(m)),
        }
    }
}

/// Tests that mark a row as the start of a new voter record.
///
/// A row is new if any enabled test passes; otherwise it continues the
/// previous record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecordPolicy {
    /// SL is a non-empty string of ASCII digits.
    pub sl_digits: bool,
    /// IDCard is longer than 3 characters and is not the `ID_CARD` placeholder.
    pub id_card: bool,
    /// Age is all digits and strictly greater than this value.
    pub min_age: Option<u32>,
}

impl Default for NewRecordPolicy {
    fn default() -> Self {
        Self {
            sl_digits: true,
            id_card: true,
            min_age: None,
        }
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to extract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
