//! Rich-query gateway and result encoder.
//!
//! The gateway forwards a selector to a [`RichQuery`] engine and streams the
//! cursor through a [`RecordEncoder`] in one forward pass. The cursor is
//! closed on every exit path.

use bytes::Bytes;
use serde::Serialize;

use consent_ledger_core::PagedQuery;
use consent_ledger_store::{KeyValue, QueryCursor, QueryRequest, RichQuery};

use crate::error::Result;

/// Encodes query results as a JSON array of `{"Key":..,"Record":..}`.
///
/// Record bytes are embedded verbatim; the store holds JSON documents.
#[derive(Debug)]
pub struct RecordEncoder {
    buf: Vec<u8>,
    count: usize,
    last_key: Option<String>,
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordEncoder {
    pub fn new() -> Self {
        Self {
            buf: vec![b'['],
            count: 0,
            last_key: None,
        }
    }

    /// Append one result.
    pub fn push(&mut self, kv: &KeyValue) -> Result<()> {
        if self.count > 0 {
            self.buf.push(b',');
        }
        self.buf.extend_from_slice(br#"{"Key":"#);
        serde_json::to_writer(&mut self.buf, &kv.key)?;
        self.buf.extend_from_slice(br#","Record":"#);
        if kv.value.is_empty() {
            self.buf.extend_from_slice(b"null");
        } else {
            self.buf.extend_from_slice(&kv.value);
        }
        self.buf.push(b'}');

        self.count += 1;
        self.last_key = Some(kv.key.clone());
        Ok(())
    }

    /// Number of results pushed.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Key of the most recent result.
    pub fn last_key(&self) -> Option<&str> {
        self.last_key.as_deref()
    }

    /// Close the array.
    pub fn finish(mut self) -> Bytes {
        self.buf.push(b']');
        Bytes::from(self.buf)
    }

    /// Wrap the array in a page envelope with the given bookmark.
    pub fn finish_page(self, bookmark: &str) -> Result<Bytes> {
        let metadata = PageMetadata {
            records_count: self.count,
            bookmark,
        };

        let records = self.finish();
        let mut out = Vec::with_capacity(records.len() + 64);
        out.extend_from_slice(br#"{"Records":"#);
        out.extend_from_slice(&records);
        out.extend_from_slice(br#","ResponseMetadata":"#);
        serde_json::to_writer(&mut out, &metadata)?;
        out.push(b'}');
        Ok(Bytes::from(out))
    }
}

#[derive(Serialize)]
struct PageMetadata<'a> {
    #[serde(rename = "RecordsCount")]
    records_count: usize,
    #[serde(rename = "Bookmark")]
    bookmark: &'a str,
}

/// Run a selector query and return every result as a JSON array.
pub async fn run_query(engine: &dyn RichQuery, selector: &str) -> Result<Bytes> {
    let encoder = collect(engine, &QueryRequest::new(selector)).await?;
    Ok(encoder.finish())
}

/// Run one page of a selector query.
///
/// The page size is clamped to `1..=max_page_size`. The returned bookmark
/// is the last key on the page, or the request's bookmark if the page is
/// empty.
pub async fn run_query_paged(
    engine: &dyn RichQuery,
    query: &PagedQuery,
    max_page_size: usize,
) -> Result<Bytes> {
    // A zero page would echo the bookmark forever.
    let page_size = query.page_size.min(max_page_size).max(1);
    let mut request = QueryRequest::new(query.selector.as_str()).limit(page_size);
    if let Some(bookmark) = &query.bookmark {
        request = request.after(bookmark.as_str());
    }

    let encoder = collect(engine, &request).await?;
    let bookmark = encoder
        .last_key()
        .or(query.bookmark.as_deref())
        .unwrap_or_default()
        .to_string();
    encoder.finish_page(&bookmark)
}

async fn collect(engine: &dyn RichQuery, request: &QueryRequest) -> Result<RecordEncoder> {
    let mut cursor = engine.execute_query(request).await?;
    let mut encoder = RecordEncoder::new();

    let drained = drain(cursor.as_mut(), &mut encoder).await;
    if let Err(e) = cursor.close().await {
        tracing::warn!(error = %e, "failed to close query cursor");
    }
    drained?;

    tracing::debug!(
        selector = %request.selector,
        records = encoder.len(),
        "rich query complete"
    );
    Ok(encoder)
}

async fn drain(cursor: &mut dyn QueryCursor, encoder: &mut RecordEncoder) -> Result<()> {
    while let Some(kv) = cursor.next().await? {
        encoder.push(&kv)?;
    }
    Ok(())
}
