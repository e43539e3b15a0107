//! Request orchestration: compile → one backend round trip → format.
//!
//! The backend is the only suspension point; everything around it is a pure
//! tree transform. Compilers are created fresh inside each call, so no query
//! state can survive a request.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::collection::CollectionReference;
use crate::compile::{build_aggregations, compile_page, FilterCompiler};
use crate::dsl::query::{QueryNode, SearchBody, SourceFilter};
use crate::dsl::response::RawSearchResponse;
use crate::error::{Error, Result};
use crate::format::{format_aggregations, format_hits};
use crate::model::request::{AggregationRequest, Projection, SearchRequest};
use crate::model::response::{AggregationsResponse, SearchResponse};

/// The external search engine executing compiled query bodies.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn execute(&self, index: &str, body: &SearchBody) -> Result<RawSearchResponse>;
}

/// HTTP implementation posting to `{base}/{index}/_search`.
pub struct HttpSearchBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn execute(&self, index: &str, body: &SearchBody) -> Result<RawSearchResponse> {
        let url = format!("{}/{index}/_search", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, index, "backend search failed");
            return Err(Error::Backend(format!(
                "search request failed with {status}: {detail}"
            )));
        }
        Ok(response.json().await?)
    }
}

/// Ties the compilers, the backend call and the formatters together.
pub struct SearchService<B> {
    backend: B,
}

impl<B: SearchBackend> SearchService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend this service executes against.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Plain document search.
    pub async fn search(
        &self,
        collection: &CollectionReference,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let filter = FilterCompiler::new(collection).compile(&request.filter)?;
        let page = compile_page(&request.page, collection)?;

        let body = SearchBody {
            query: Some(QueryNode::Bool(Box::new(filter))),
            size: Some(page.size),
            from: page.from,
            sort: page.sort,
            search_after: page.search_after,
            source: projection_filter(&request.projection),
            aggs: None,
            track_total_hits: Some(true),
        };
        debug!(collection = %collection.collection_name, "executing search");
        let raw = self.backend.execute(&collection.index_name, &body).await?;
        Ok(format_hits(raw, &request.page, collection, page.reversed))
    }

    /// Aggregating search: the hit window is zero-sized, everything of
    /// interest comes back through the aggregation tree.
    pub async fn aggregate(
        &self,
        collection: &CollectionReference,
        request: &AggregationRequest,
    ) -> Result<AggregationsResponse> {
        let filter = FilterCompiler::new(collection).compile(&request.filter)?;
        let plan = build_aggregations(&request.aggregations, collection)?;

        let mut aggs = HashMap::with_capacity(1);
        aggs.insert(plan.root_name.clone(), plan.root.clone());
        let body = SearchBody {
            query: Some(QueryNode::Bool(Box::new(filter))),
            size: Some(0),
            aggs: Some(aggs),
            track_total_hits: Some(true),
            ..SearchBody::default()
        };
        debug!(
            collection = %collection.collection_name,
            levels = plan.levels.len(),
            "executing aggregation"
        );
        let raw = self.backend.execute(&collection.index_name, &body).await?;
        let elements = format_aggregations(raw.aggregations.as_ref(), &plan, collection)?;
        Ok(AggregationsResponse {
            total: raw.hits.total.value,
            elements,
        })
    }
}

fn projection_filter(projection: &Projection) -> Option<SourceFilter> {
    let includes = projection.includes.as_deref().map(split_paths);
    let excludes = projection.excludes.as_deref().map(split_paths);
    if includes.is_none() && excludes.is_none() {
        return None;
    }
    Some(SourceFilter { includes, excludes })
}

fn split_paths(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
