use std::{num::NonZeroU32, sync::Arc};

use tcm_webui_api_types::{SearchResponse, SearchResult};

use crate::application::{context::RuntimeContext, error::AppError};

/// Show search against the shared metadata client.
pub struct SearchService {
    context: Arc<RuntimeContext>,
    limit: NonZeroU32,
}

impl SearchService {
    pub fn new(context: Arc<RuntimeContext>, limit: NonZeroU32) -> Self {
        Self { context, limit }
    }

    pub async fn search(&self, query: Option<&str>) -> Result<SearchResponse, AppError> {
        let query = query
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .ok_or_else(|| AppError::validation("Missing search query"))?;

        let client = self.context.get_search_client()?;
        let matches = client
            .search_series(query, self.limit.get() as usize)
            .await?;

        let results = matches
            .into_iter()
            .take(self.limit.get() as usize)
            .map(|found| SearchResult {
                title: Some(found.title),
                year: found.year,
                library: found.library,
                summary: found.summary,
                ids: found.ids,
            })
            .collect();

        Ok(SearchResponse { results })
    }
}
