use scraper::error::SelectorErrorKind;

/// All errors that can abort a report pipeline run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// HTTP request failed (network, DNS, TLS, timeout).
    #[error("http request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Response body was not the JSON shape we expect.
    #[error("could not parse {what}: {reason}")]
    Parse { what: String, reason: String },

    /// A scraped page did not have the layout we rely on.
    #[error("page layout changed: {context}")]
    PageFormat { context: String },

    /// The stats api had no record for something we looked up.
    #[error("stats api returned nothing for {what}")]
    LookupMiss { what: String },

    /// Upstream returned fewer rows than the table requires.
    #[error("needed {wanted} rows but upstream returned {available}")]
    ShortResponse { wanted: usize, available: usize },

    /// A CSS selector string could not be parsed.
    #[error("invalid CSS selector: {0}")]
    Selector(String),

    /// Warehouse read or write failed.
    #[error("warehouse error: {0}")]
    Warehouse(#[from] rusqlite::Error),
}

impl<'a> From<SelectorErrorKind<'a>> for PipelineError {
    fn from(err: SelectorErrorKind<'a>) -> Self {
        PipelineError::Selector(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
