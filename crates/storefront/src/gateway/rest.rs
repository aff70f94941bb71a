//! PostgREST-compatible HTTP client for the hosted table store.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use super::{Filter, GatewayError, Query, Table, TableStore};
use crate::config::RemoteConfig;

/// Path of the table endpoints, relative to the project URL.
const REST_PATH: &str = "rest/v1/";

/// Anonymous sign-up endpoint, relative to the project URL.
const SIGNUP_PATH: &str = "auth/v1/signup";

/// HTTP client for the hosted table store.
///
/// # Authentication
///
/// Requests carry the project's anon key as `apikey` and a bearer token:
/// the cached session token when one exists, otherwise the anon key
/// itself. [`TableStore::reauthenticate`] obtains a fresh anonymous
/// session and caches its token.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    /// In-memory session cache
    session: RwLock<Option<Session>>,
}

struct Session {
    access_token: SecretString,
}

/// Error payload returned by PostgREST and the auth service.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct SignupResponse {
    access_token: String,
}

#[derive(Serialize)]
struct SignupRequest {
    data: serde_json::Value,
}

impl RestClient {
    /// Create a client for the project at `config.url`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(RestClientInner {
                client,
                base_url,
                anon_key: config.anon_key.clone(),
                session: RwLock::new(None),
            }),
        })
    }

    /// Whether an anonymous session token is cached.
    pub async fn has_session(&self) -> bool {
        self.inner.session.read().await.is_some()
    }

    /// Drop the cached session token.
    pub async fn clear_session(&self) {
        *self.inner.session.write().await = None;
    }

    fn table_url(&self, table: Table) -> Result<Url, GatewayError> {
        Ok(self
            .inner
            .base_url
            .join(REST_PATH)?
            .join(table.as_str())?)
    }

    async fn bearer_token(&self) -> String {
        self.inner.session.read().await.as_ref().map_or_else(
            || self.inner.anon_key.expose_secret().to_string(),
            |session| session.access_token.expose_secret().to_string(),
        )
    }

    async fn request(
        &self,
        method: reqwest::Method,
        table: Table,
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        let url = self.table_url(table)?;
        let token = self.bearer_token().await;

        Ok(self
            .inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/json"))
    }
}

/// Query-string parameters for a select.
fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    params.extend(filter_params(query.filters()));

    if let Some(search) = query.search_terms() {
        let pattern = quote_value(&format!("*{}*", search.term()));
        let clauses: Vec<String> = search
            .columns()
            .iter()
            .map(|column| format!("{column}.ilike.{pattern}"))
            .collect();
        params.push(("or".to_string(), format!("({})", clauses.join(","))));
    }

    if let Some(order) = query.ordering() {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }

    if let Some(limit) = query.row_limit() {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column().to_string(), format!("eq.{}", f.value())))
        .collect()
}

/// Double-quote a value for use inside a PostgREST logic tree, where
/// commas and parentheses are reserved.
fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Turn a non-success response into a `GatewayError::Api`.
async fn api_error(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    let code = match body.code {
        Some(serde_json::Value::String(code)) => code,
        Some(serde_json::Value::Number(code)) => code.to_string(),
        _ => String::new(),
    };
    let message = body
        .message
        .or(body.msg)
        .or(body.error_description)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                text
            }
        });

    GatewayError::api(status.as_u16(), code, message)
}

/// Decode a successful response, or convert the failure.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl TableStore for RestClient {
    #[instrument(skip(self, query), fields(table = %table))]
    async fn select<T>(&self, table: Table, query: &Query) -> Result<Vec<T>, GatewayError>
    where
        T: DeserializeOwned + Send,
    {
        let response = self
            .request(reqwest::Method::GET, table)
            .await?
            .query(&select_params(query))
            .send()
            .await?;

        let rows: Vec<T> = decode(response).await?;
        tracing::debug!(count = rows.len(), "Selected rows");
        Ok(rows)
    }

    #[instrument(skip(self, rows), fields(table = %table, count = rows.len()))]
    async fn insert<B, T>(&self, table: Table, rows: &[B]) -> Result<Vec<T>, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .request(reqwest::Method::POST, table)
            .await?
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;

        decode(response).await
    }

    #[instrument(skip(self, filter, patch), fields(table = %table, column = %filter.column()))]
    async fn update<B, T>(
        &self,
        table: Table,
        filter: &Filter,
        patch: &B,
    ) -> Result<Vec<T>, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .request(reqwest::Method::PATCH, table)
            .await?
            .header("Prefer", "return=representation")
            .query(&filter_params(std::slice::from_ref(filter)))
            .json(patch)
            .send()
            .await?;

        decode(response).await
    }

    #[instrument(skip(self, filter), fields(table = %table, column = %filter.column()))]
    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), GatewayError> {
        let response = self
            .request(reqwest::Method::DELETE, table)
            .await?
            .header("Prefer", "return=minimal")
            .query(&filter_params(std::slice::from_ref(filter)))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }

    /// Obtain a fresh anonymous session and cache its token.
    #[instrument(skip(self))]
    async fn reauthenticate(&self) -> Result<(), GatewayError> {
        let url = self.inner.base_url.join(SIGNUP_PATH)?;

        let response = self
            .inner
            .client
            .post(url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .json(&SignupRequest {
                data: serde_json::json!({}),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match api_error(response).await {
                GatewayError::Api { message, .. } => message,
                other => other.to_string(),
            };
            return Err(GatewayError::AuthenticationFailed(format!(
                "HTTP {status}: {message}"
            )));
        }

        let signup: SignupResponse = response.json().await?;
        *self.inner.session.write().await = Some(Session {
            access_token: SecretString::from(signup.access_token),
        });

        tracing::info!("Established anonymous session");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(url: &str) -> RestClient {
        RestClient::new(&RemoteConfig {
            url: Url::parse(url).unwrap(),
            anon_key: SecretString::from("anon-key"),
        })
        .unwrap()
    }

    fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn test_table_url() {
        let client = client("https://project.supabase.co");
        assert_eq!(
            client.table_url(Table::OrderItems).unwrap().as_str(),
            "https://project.supabase.co/rest/v1/order_items"
        );
    }

    #[test]
    fn test_table_url_keeps_base_path() {
        let client = client("http://localhost:54321/proxy");
        assert_eq!(
            client.table_url(Table::Products).unwrap().as_str(),
            "http://localhost:54321/proxy/rest/v1/products"
        );
    }

    #[test]
    fn test_select_params() {
        let query = Query::new()
            .eq("category", "shirts")
            .newest_first()
            .limit(20);
        let params = select_params(&query);

        assert_eq!(param(&params, "select"), Some("*"));
        assert_eq!(param(&params, "category"), Some("eq.shirts"));
        assert_eq!(param(&params, "order"), Some("created_at.desc"));
        assert_eq!(param(&params, "limit"), Some("20"));
        assert_eq!(param(&params, "or"), None);
    }

    #[test]
    fn test_search_params_are_quoted() {
        let query = Query::new().search(&["name", "description"], "black, slim");
        let params = select_params(&query);

        assert_eq!(
            param(&params, "or"),
            Some(r#"(name.ilike."*black, slim*",description.ilike."*black, slim*")"#)
        );
    }

    #[test]
    fn test_quote_value_escapes() {
        assert_eq!(quote_value(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[tokio::test]
    async fn test_bearer_defaults_to_anon_key() {
        let client = client("https://project.supabase.co");
        assert!(!client.has_session().await);
        assert_eq!(client.bearer_token().await, "anon-key");

        *client.inner.session.write().await = Some(Session {
            access_token: SecretString::from("session-token"),
        });
        assert_eq!(client.bearer_token().await, "session-token");

        client.clear_session().await;
        assert_eq!(client.bearer_token().await, "anon-key");
    }
}
