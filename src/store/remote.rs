//! Remote document table reached over a PostgREST-style HTTP API.
//!
//! `GET  <base>/rest/v1/users?id=eq.<id>&select=*` returns `[record]` or `[]`.
//! `POST <base>/rest/v1/users` with `Prefer: resolution=merge-duplicates`
//! upserts only the columns present in the body.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{RecordPatch, UserRecord, UserStore};
use crate::error::{Error, Result};

const USERS_PATH: &str = "rest/v1/users";

pub struct RemoteUserStore {
    client: Client,
    users_url: Url,
    api_key: String,
}

impl RemoteUserStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Configuration("REMOTE_API_KEY is empty".to_string()));
        }
        let mut base = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("invalid REMOTE_URL '{}': {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let users_url = base
            .join(USERS_PATH)
            .map_err(|e| Error::Configuration(format!("invalid REMOTE_URL '{}': {}", base_url, e)))?;

        Ok(Self {
            client: Client::new(),
            users_url,
            api_key: api_key.to_string(),
        })
    }

    fn record_url(&self, user_id: &str) -> Url {
        let mut url = self.users_url.clone();
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", user_id))
            .append_pair("select", "*");
        url
    }

    fn upsert_body(user_id: &str, patch: &RecordPatch) -> Result<Value> {
        let mut body = serde_json::to_value(patch)?;
        if let Value::Object(map) = &mut body {
            map.insert("id".to_string(), Value::String(user_id.to_string()));
        }
        Ok(body)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl UserStore for RemoteUserStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let rows: Vec<UserRecord> = self
            .authorized(self.client.get(self.record_url(user_id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn save(&self, user_id: &str, patch: &RecordPatch) -> Result<()> {
        self.authorized(self.client.post(self.users_url.clone()))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&Self::upsert_body(user_id, patch)?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
