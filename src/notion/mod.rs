pub mod dto;
pub mod oauth;
pub mod properties;

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{optional, required};
use crate::error::AppError;
use oauth::{OAuthConfig, TokenSet, TokenStore};
use properties::{PropertyBag, PropertyKind, TargetSchema};

pub const NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_API_BASE: &str = "https://api.notion.com/v1";
const QUERY_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug)]
pub struct NotionConfig {
    pub api_base: String,
    pub database_id: String,
    pub auth: NotionAuth,
}

#[derive(Clone, Debug)]
pub enum NotionAuth {
    /// Internal integration secret.
    Token(String),
    /// Public integration; tokens live in a local file and are refreshed on 401.
    OAuth(OAuthConfig),
}

impl NotionConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = optional(lookup, "NOTION_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let database_id = required(lookup, "NOTION_DATABASE_ID")?;

        let auth = match optional(lookup, "NOTION_TOKEN") {
            Some(token) => NotionAuth::Token(token),
            None => {
                let client_id = optional(lookup, "NOTION_CLIENT_ID");
                let client_secret = optional(lookup, "NOTION_CLIENT_SECRET");
                match (client_id, client_secret) {
                    (Some(client_id), Some(client_secret)) => NotionAuth::OAuth(OAuthConfig {
                        client_id,
                        client_secret,
                        redirect_uri: optional(lookup, "NOTION_REDIRECT_URI")
                            .unwrap_or_else(|| "http://localhost:8000/callback".to_string()),
                        token_file: PathBuf::from(
                            optional(lookup, "NOTION_TOKEN_FILE")
                                .unwrap_or_else(|| ".token.json".to_string()),
                        ),
                    }),
                    _ => {
                        return Err(AppError::Config(
                            "NOTION_TOKEN or NOTION_CLIENT_ID and NOTION_CLIENT_SECRET must be set"
                                .to_string(),
                        ));
                    }
                }
            }
        };

        Ok(Self {
            api_base,
            database_id,
            auth,
        })
    }
}

/// A database row: Notion page id plus its properties.
#[derive(Debug, Clone)]
pub struct TargetRecord {
    pub id: String,
    pub properties: HashMap<String, dto::Property>,
}

impl TargetRecord {
    /// Plain text of a title or rich text property.
    pub fn text(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(|prop| match prop {
            dto::Property::Title { title } => {
                Some(title.iter().map(|t| t.plain_text.as_str()).collect())
            }
            dto::Property::RichText { rich_text } => {
                Some(rich_text.iter().map(|t| t.plain_text.as_str()).collect())
            }
            _ => None,
        })
    }
}

impl From<dto::Page> for TargetRecord {
    fn from(page: dto::Page) -> Self {
        Self {
            id: page.id,
            properties: page.properties,
        }
    }
}

/// One page of the cursor protocol.
#[derive(Debug, Default)]
pub struct QueryPage {
    pub records: Vec<TargetRecord>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait NotionClient: Send + Sync {
    async fn fetch_schema(&self) -> Result<TargetSchema, AppError>;

    async fn query_page(
        &self,
        cursor: Option<String>,
        filter: Option<serde_json::Value>,
    ) -> Result<QueryPage, AppError>;

    async fn create_page(&self, properties: &PropertyBag) -> Result<TargetRecord, AppError>;

    async fn update_page(
        &self,
        page_id: &str,
        properties: &PropertyBag,
    ) -> Result<TargetRecord, AppError>;

    /// Drains every page of the query before returning.
    async fn query_all(
        &self,
        filter: Option<serde_json::Value>,
    ) -> Result<Vec<TargetRecord>, AppError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.query_page(cursor.take(), filter.clone()).await?;
            debug!(
                "query page: {} records, has_more={}",
                page.records.len(),
                page.has_more
            );
            records.extend(page.records);

            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    warn!("Notion reported more pages without a cursor; stopping");
                    break;
                }
            }
        }

        Ok(records)
    }
}

enum Credentials {
    Static(String),
    OAuth {
        config: OAuthConfig,
        tokens: RwLock<TokenSet>,
    },
}

pub struct NotionHttpClient {
    client: Client,
    config: NotionConfig,
    credentials: Credentials,
}

impl NotionHttpClient {
    /// For OAuth, loads the token file or runs the interactive flow when it is missing.
    pub async fn new(config: NotionConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;

        let credentials = match &config.auth {
            NotionAuth::Token(token) => Credentials::Static(token.clone()),
            NotionAuth::OAuth(oauth_config) => {
                let tokens = oauth::load_or_authorize(&client, &config.api_base, oauth_config).await?;
                Credentials::OAuth {
                    config: oauth_config.clone(),
                    tokens: RwLock::new(tokens),
                }
            }
        };

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    async fn access_token(&self) -> String {
        match &self.credentials {
            Credentials::Static(token) => token.clone(),
            Credentials::OAuth { tokens, .. } => tokens.read().await.access_token.clone(),
        }
    }

    /// Refreshes and persists the OAuth token pair. `Ok(false)` for static tokens.
    async fn refresh_access_token(&self) -> Result<bool, AppError> {
        let Credentials::OAuth { config, tokens } = &self.credentials else {
            return Ok(false);
        };

        let mut guard = tokens.write().await;
        let refresh_token = guard
            .refresh_token
            .clone()
            .ok_or_else(|| AppError::Unauthorized("no refresh token on file".to_string()))?;

        let fresh = oauth::refresh(&self.client, &self.config.api_base, config, &refresh_token).await?;
        TokenStore::new(&config.token_file).save(&fresh).await?;
        *guard = fresh;
        info!("Refreshed Notion access token");
        Ok(true)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, AppError> {
        let token = self.access_token().await;
        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Sends a request, retrying exactly once after a token refresh on 401.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, AppError> {
        let body = body.map(serde_json::to_value).transpose()?;

        let mut response = self.send_once(&method, url, body.as_ref()).await?;
        if response.status() == StatusCode::UNAUTHORIZED && self.refresh_access_token().await? {
            response = self.send_once(&method, url, body.as_ref()).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Unauthorized(format!("Notion rejected credentials: {}", body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_for_page<B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> Result<TargetRecord, AppError> {
        let response = self.send(method, url, Some(body)).await?;
        let page: dto::Page = response.json().await?;
        Ok(page.into())
    }
}

#[async_trait]
impl NotionClient for NotionHttpClient {
    async fn fetch_schema(&self) -> Result<TargetSchema, AppError> {
        let url = format!("{}/databases/{}", self.config.api_base, self.config.database_id);
        let response = self.send::<()>(Method::GET, &url, None).await?;
        let database: dto::DatabaseResponse = response.json().await?;

        Ok(database
            .properties
            .into_iter()
            .map(|(name, schema)| (name, PropertyKind::from_api(&schema.kind)))
            .collect())
    }

    async fn query_page(
        &self,
        cursor: Option<String>,
        filter: Option<serde_json::Value>,
    ) -> Result<QueryPage, AppError> {
        let url = format!(
            "{}/databases/{}/query",
            self.config.api_base, self.config.database_id
        );
        let request_body = dto::QueryDatabaseRequest {
            filter,
            start_cursor: cursor,
            page_size: Some(QUERY_PAGE_SIZE),
        };

        let response = self.send(Method::POST, &url, Some(&request_body)).await?;
        let parsed: dto::QueryDatabaseResponse = response.json().await?;

        Ok(QueryPage {
            records: parsed.results.into_iter().map(TargetRecord::from).collect(),
            has_more: parsed.has_more,
            next_cursor: parsed.next_cursor,
        })
    }

    async fn create_page(&self, properties: &PropertyBag) -> Result<TargetRecord, AppError> {
        let url = format!("{}/pages", self.config.api_base);
        let request_body = dto::CreatePageRequest {
            parent: dto::Parent {
                database_id: &self.config.database_id,
            },
            properties,
        };
        self.send_for_page(Method::POST, &url, &request_body).await
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: &PropertyBag,
    ) -> Result<TargetRecord, AppError> {
        let url = format!("{}/pages/{}", self.config.api_base, page_id);
        let request_body = dto::UpdatePageRequest { properties };
        self.send_for_page(Method::PATCH, &url, &request_body).await
    }
}
