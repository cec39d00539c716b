use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP client for the streaming backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| AppError::Config(format!("Invalid api_url {}: {}", config.api_url, e)))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("mobify-player/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a server-relative path (`/audio/abc`) against the API base.
    /// Absolute URLs are returned unchanged.
    pub fn absolute_url(&self, path: &str) -> AppResult<Url> {
        let joined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|e| AppError::Config(format!("Invalid URL {}: {}", joined, e)))
    }

    fn headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

        if let Some(token) = &self.access_token {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value).map_err(|e| AppError::Config(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    pub async fn get(&self, path: &str) -> AppResult<reqwest::Response> {
        let url = self.absolute_url(path)?;
        let response = self.http.get(url).headers(self.headers()?).send().await?;
        self.check_response(response).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<reqwest::Response> {
        let url = self.absolute_url(path)?;
        let response = self
            .http
            .get(url)
            .headers(self.headers()?)
            .query(query)
            .send()
            .await?;
        self.check_response(response).await
    }

    pub async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<reqwest::Response> {
        let url = self.absolute_url(path)?;
        let response = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;
        self.check_response(response).await
    }

    pub async fn delete(&self, path: &str) -> AppResult<reqwest::Response> {
        let url = self.absolute_url(path)?;
        let response = self.http.delete(url).headers(self.headers()?).send().await?;
        self.check_response(response).await
    }

    async fn check_response(&self, response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == reqwest::StatusCode::UNAUTHORIZED {
            Err(AppError::AuthRequired)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(AppError::NotFound("Resource not found".into()))
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(AppError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
