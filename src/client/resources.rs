//! Resource operations on one collection of the remote service.
//!
//! Every call goes through the shared [`RequestExecutor`], so the breaker,
//! retry policy and credential cache apply uniformly.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::client::error::{ClassifiedError, ClientResult};
use crate::client::executor::RequestExecutor;
use crate::transport::Method;

/// Default collection exposed by the automation service.
pub const WORKFLOWS: &str = "/workflows";

/// Filters and paging for [`ResourceClient::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub active: Option<bool>,
    /// Additional query pairs passed through untouched.
    pub extra: Vec<(String, String)>,
}

impl ListOptions {
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    fn query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.to_string());
        }
        if let Some(cursor) = &self.cursor {
            query.append_pair("cursor", cursor);
        }
        if let Some(active) = self.active {
            query.append_pair("active", if active { "true" } else { "false" });
        }
        for (key, value) in &self.extra {
            query.append_pair(key, value);
        }
        query.finish()
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// CRUD plus activation for a single collection path.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    executor: Arc<RequestExecutor>,
    collection: String,
}

impl ResourceClient {
    pub fn new(executor: Arc<RequestExecutor>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let collection = format!("/{}", collection.trim_matches('/'));
        Self { executor, collection }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn list<T: DeserializeOwned>(&self, options: &ListOptions) -> ClientResult<Page<T>> {
        let query = options.query_string();
        let endpoint = if query.is_empty() {
            self.collection.clone()
        } else {
            format!("{}?{}", self.collection, query)
        };
        self.executor.request(&endpoint, Method::GET, None, &[]).await
    }

    /// Follow `nextCursor` until the service reports no further pages.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        options: &ListOptions,
    ) -> ClientResult<Vec<T>> {
        let mut options = options.clone();
        let mut items = Vec::new();
        let mut seen = HashSet::new();

        loop {
            let page: Page<T> = self.list(&options).await?;
            items.extend(page.data);

            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(cursor) => {
                    if !seen.insert(cursor.clone()) {
                        tracing::warn!(
                            collection = %self.collection,
                            cursor = %cursor,
                            "Cursor repeated, stopping pagination"
                        );
                        break;
                    }
                    options.cursor = Some(cursor);
                }
                None => break,
            }
        }

        Ok(items)
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> ClientResult<T> {
        let endpoint = self.item_path(id)?;
        self.executor.request(&endpoint, Method::GET, None, &[]).await
    }

    pub async fn create<B, T>(&self, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_json(body)?;
        self.executor
            .request(&self.collection, Method::POST, Some(&body), &[])
            .await
    }

    pub async fn update<B, T>(&self, id: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = self.item_path(id)?;
        let body = to_json(body)?;
        self.executor.request(&endpoint, Method::PUT, Some(&body), &[]).await
    }

    /// Delete an item. Whatever the service echoes back is discarded.
    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let endpoint = self.item_path(id)?;
        let _: IgnoredAny = self.executor.request(&endpoint, Method::DELETE, None, &[]).await?;
        Ok(())
    }

    pub async fn activate<T: DeserializeOwned>(&self, id: &str) -> ClientResult<T> {
        let endpoint = format!("{}/activate", self.item_path(id)?);
        self.executor.request(&endpoint, Method::POST, None, &[]).await
    }

    pub async fn deactivate<T: DeserializeOwned>(&self, id: &str) -> ClientResult<T> {
        let endpoint = format!("{}/deactivate", self.item_path(id)?);
        self.executor.request(&endpoint, Method::POST, None, &[]).await
    }

    fn item_path(&self, id: &str) -> ClientResult<String> {
        let id = id.trim();
        let unsafe_char = |c: char| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace();
        if id.is_empty() || id.contains(unsafe_char) {
            return Err(ClassifiedError::validation(format!("invalid resource id '{id}'")));
        }
        Ok(format!("{}/{}", self.collection, id))
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> ClientResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| ClassifiedError::validation(format!("request body cannot be serialized: {e}")))
}
