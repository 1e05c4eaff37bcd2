use reqwest::StatusCode;
use serde_json::{Map, Value, json};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::error::{Result, XferError};
use crate::index::{DocumentIndex, Hit, Query};

const SCROLL_KEEPALIVE: &str = "1m";
const SCROLL_PAGE: usize = 500;

/// Search index over its REST API (scroll search, `_count`, `_update`, `_doc`).
pub struct ElasticIndex {
    base: String,
    http: reqwest::Client,
    runtime: Runtime,
}

fn http_err(e: reqwest::Error) -> XferError {
    XferError::Backend(format!("search index: {e}"))
}

impl ElasticIndex {
    pub fn new(base_url: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            runtime,
        })
    }

    /// `{base}/{index}/{op}/{id}` with the id percent-encoded as one segment.
    fn doc_url(&self, index: &str, op: &str, id: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base)
            .map_err(|e| XferError::Config(format!("search index url {}: {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|_| XferError::Config(format!("search index url {} has no path", self.base)))?
            .pop_if_empty()
            .extend([index, op, id]);
        Ok(url)
    }

    async fn post_json(&self, url: String, body: &Value) -> Result<Value> {
        self.http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?
            .json()
            .await
            .map_err(http_err)
    }
}

fn page_hits(resp: &Value) -> Result<Vec<Hit>> {
    let hits = resp["hits"]["hits"].as_array().cloned().unwrap_or_default();
    hits.into_iter()
        .map(|h| {
            let id = h["_id"]
                .as_str()
                .ok_or_else(|| XferError::Format(format!("search hit without _id: {h}")))?
                .to_string();
            Ok(Hit {
                id,
                source: h["_source"].clone(),
            })
        })
        .collect()
}

impl DocumentIndex for ElasticIndex {
    fn scan(&self, index: &str, query: &Query) -> Result<Vec<Hit>> {
        self.runtime.block_on(async {
            let mut out = Vec::new();
            let mut resp = self
                .post_json(
                    format!("{}/{index}/_search?scroll={SCROLL_KEEPALIVE}", self.base),
                    &json!({ "query": query.to_json(), "size": SCROLL_PAGE, "sort": ["_doc"] }),
                )
                .await?;
            let mut scroll_id = None;
            loop {
                let page = page_hits(&resp)?;
                if page.is_empty() {
                    break;
                }
                debug!(index, page = page.len(), "scroll page");
                out.extend(page);
                let id = resp["_scroll_id"]
                    .as_str()
                    .ok_or_else(|| XferError::Format("scroll response without _scroll_id".into()))?
                    .to_string();
                resp = self
                    .post_json(
                        format!("{}/_search/scroll", self.base),
                        &json!({ "scroll": SCROLL_KEEPALIVE, "scroll_id": id }),
                    )
                    .await?;
                scroll_id = Some(id);
            }
            if let Some(id) = scroll_id {
                // Scrolls expire on their own; clearing early is best effort.
                let _ = self
                    .http
                    .delete(format!("{}/_search/scroll", self.base))
                    .json(&json!({ "scroll_id": id }))
                    .send()
                    .await;
            }
            Ok::<_, XferError>(out)
        })
    }

    fn count(&self, index: &str, query: &Query) -> Result<u64> {
        self.runtime.block_on(async {
            let resp = self
                .post_json(
                    format!("{}/{index}/_count", self.base),
                    &json!({ "query": query.to_json() }),
                )
                .await?;
            resp["count"]
                .as_u64()
                .ok_or_else(|| XferError::Format(format!("count response: {resp}")))
        })
    }

    fn get(&self, index: &str, id: &str) -> Result<Option<Value>> {
        self.runtime.block_on(async {
            let url = self.doc_url(index, "_doc", id)?;
            let resp = self.http.get(url).send().await.map_err(http_err)?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok::<_, XferError>(None);
            }
            let body: Value = resp
                .error_for_status()
                .map_err(http_err)?
                .json()
                .await
                .map_err(http_err)?;
            Ok(body.get("_source").cloned())
        })
    }

    fn put(&mut self, index: &str, id: &str, doc: &Value) -> Result<()> {
        self.runtime.block_on(async {
            let mut url = self.doc_url(index, "_doc", id)?;
            url.query_pairs_mut().append_pair("refresh", "wait_for");
            self.http
                .put(url)
                .json(doc)
                .send()
                .await
                .map_err(http_err)?
                .error_for_status()
                .map_err(http_err)?;
            Ok::<_, XferError>(())
        })
    }

    fn update(&mut self, index: &str, id: &str, partial: &Map<String, Value>) -> Result<()> {
        self.runtime.block_on(async {
            let mut url = self.doc_url(index, "_update", id)?;
            url.query_pairs_mut().append_pair("refresh", "wait_for");
            let resp = self
                .http
                .post(url)
                .json(&json!({ "doc": partial }))
                .send()
                .await
                .map_err(http_err)?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Err(XferError::MissingRecord {
                    id: format!("{index}/{id}"),
                });
            }
            resp.error_for_status().map_err(http_err)?;
            Ok(())
        })
    }
}
