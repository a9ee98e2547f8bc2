use crate::config::SupabaseConfig;
use async_trait::async_trait;
use cidadania_core::store::{Direction, StoreQuery};
use cidadania_core::{Collection, ContentStore, CoreError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Path prefix of the PostgREST API inside a Supabase project
const REST_PATH: [&str; 2] = ["rest", "v1"];

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    details: Option<String>,
}

/// Content store backed by a Supabase project's REST API
pub struct SupabaseStore {
    client: Client,
    base_url: Url,
}

impl SupabaseStore {
    /// Create a store from validated config.
    ///
    /// No retry is layered on top of the client: failed reads are reported
    /// once and retried by the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: &SupabaseConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let base_url = config.project_url()?;

        let key = HeaderValue::from_str(config.anon_key.trim()).map_err(|e| {
            CoreError::ConfigInvalid {
                message: format!("providers.supabase.anon_key: {e}"),
            }
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.anon_key.trim()))
            .map_err(|e| CoreError::ConfigInvalid {
                message: format!("providers.supabase.anon_key: {e}"),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("cidadania/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Endpoint for a collection: `{base}/rest/v1/{collection}`
    fn collection_url(&self, collection: Collection) -> Result<Url, CoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::ConfigInvalid {
                message: "providers.supabase.url: not a base URL".into(),
            })?
            .pop_if_empty()
            .extend(REST_PATH)
            .push(collection.as_str());
        Ok(url)
    }

    /// Render a query in PostgREST syntax
    fn query_url(&self, query: &StoreQuery) -> Result<Url, CoreError> {
        let mut url = self.collection_url(query.collection)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in &query.filters {
                pairs.append_pair(&filter.column, &filter_value(&filter.value));
            }
            if let Some(order) = &query.order {
                let direction = match order.direction {
                    Direction::Ascending => "asc",
                    Direction::Descending => "desc",
                };
                pairs.append_pair("order", &format!("{}.{direction}", order.column));
            }
        }
        Ok(url)
    }
}

/// Equality operand for a filter value
fn filter_value(value: &Value) -> String {
    match value {
        Value::Null => "is.null".to_string(),
        Value::String(s) => format!("eq.{s}"),
        other => format!("eq.{other}"),
    }
}

/// Map a non-success response to a store error, keeping the server's message
async fn request_failed(collection: Collection, response: Response) -> CoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<PostgrestError>(&body) {
        Ok(PostgrestError {
            message: Some(message),
            details,
        }) => match details {
            Some(details) if !details.is_empty() => format!("{message} ({details})"),
            _ => message,
        },
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    CoreError::StoreRequestFailed {
        collection: collection.to_string(),
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ContentStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn select(&self, query: &StoreQuery) -> Result<Vec<Value>, CoreError> {
        let url = self.query_url(query)?;
        debug!("Supabase GET {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            warn!(
                "Supabase select on {} returned status: {}",
                query.collection,
                response.status()
            );
            return Err(request_failed(query.collection, response).await);
        }

        match response.json::<Value>().await? {
            Value::Array(rows) => {
                info!("Supabase returned {} {} rows", rows.len(), query.collection);
                Ok(rows)
            }
            other => Err(CoreError::MalformedRow {
                collection: query.collection.to_string(),
                reason: format!("expected a JSON array, got {other}"),
            }),
        }
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<(), CoreError> {
        let url = self.collection_url(collection)?;
        debug!("Supabase POST {}", url);

        let response = self
            .client
            .post(url)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "Supabase insert into {} returned status: {}",
                collection,
                response.status()
            );
            return Err(request_failed(collection, response).await);
        }

        info!("Inserted 1 row into {}", collection);
        Ok(())
    }
}
