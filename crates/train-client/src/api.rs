//! Message service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use train_types::api::{CreateMessageRequest, ErrorBody, ReactMessageRequest};
use train_types::{Message, ReactionAction, SortBy};

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The three operations the board needs from the message service.
#[async_trait]
pub trait MessageApi: Send + Sync {
    async fn list(&self, sort: SortBy) -> Result<Vec<Message>, ClientError>;
    async fn create(&self, text: &str) -> Result<Message, ClientError>;
    async fn react(&self, id: &str, action: ReactionAction) -> Result<Message, ClientError>;
}

pub struct HttpMessageApi {
    http: Client,
    base_url: String,
}

impl HttpMessageApi {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn messages_url(&self) -> String {
        format!("{}/api/messages", self.base_url)
    }
}

#[async_trait]
impl MessageApi for HttpMessageApi {
    async fn list(&self, sort: SortBy) -> Result<Vec<Message>, ClientError> {
        let response = self
            .http
            .get(self.messages_url())
            .query(&[("sortBy", sort.as_str())])
            .send()
            .await?;
        let messages: Vec<Message> = read_json(response).await?;
        debug!("Fetched {} messages ({})", messages.len(), sort);
        Ok(messages)
    }

    async fn create(&self, text: &str) -> Result<Message, ClientError> {
        let body = CreateMessageRequest { text: Some(text.to_string()) };
        let response = self.http.post(self.messages_url()).json(&body).send().await?;
        read_json(response).await
    }

    async fn react(&self, id: &str, action: ReactionAction) -> Result<Message, ClientError> {
        let body = ReactMessageRequest {
            id: Some(id.to_string()),
            action: Some(action.as_str().to_string()),
        };
        let response = self.http.patch(self.messages_url()).json(&body).send().await?;
        read_json(response).await
    }
}

/// Decode a success body, or turn an error status into `ClientError::Status`
/// carrying the server's `{message}` when it sent one.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    Ok(response.json().await?)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}
