// Authenticated REST client for the save-file object store

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::auth::{AuthFinished, AuthFlow, TokenStore};
use crate::cloud::models::{FileList, FileMetadata, SaveEntry};
use crate::common::{SyncConfig, SyncError};
use crate::storage::kv::KEY_FOLDER_ID;
use crate::storage::KvStore;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const SAVE_MIME: &str = "application/octet-stream";

/// Append the `.sav` suffix unless the caller already did.
fn save_file_name(game_name: &str) -> String {
    if game_name.ends_with(".sav") {
        game_name.to_string()
    } else {
        format!("{}.sav", game_name)
    }
}

/// REST client for the cloud object store.
///
/// All public operations are best-effort: an empty result means "not
/// authenticated or request failed" and callers fall back to local
/// storage. Any non-success response is treated as an authentication
/// failure — the session is cleared and the subsystem runs offline.
/// Retries are the caller's responsibility.
pub struct CloudClient {
    config: SyncConfig,
    http: Client,
    tokens: Arc<TokenStore>,
    flow: Arc<AuthFlow>,
    kv: Arc<KvStore>,
    /// Resolved at most once per process lifetime unless invalidated by
    /// an auth failure.
    folder_id: RwLock<Option<String>>,
    /// Single reauth slot: a second expired-token call waits here for the
    /// in-flight attempt instead of issuing its own.
    reauth_gate: Mutex<()>,
}

impl CloudClient {
    pub fn new(
        config: SyncConfig,
        http: Client,
        tokens: Arc<TokenStore>,
        flow: Arc<AuthFlow>,
        kv: Arc<KvStore>,
    ) -> Self {
        Self {
            config,
            http,
            tokens,
            flow,
            kv,
            folder_id: RwLock::new(None),
            reauth_gate: Mutex::new(()),
        }
    }

    /// Whether battery-backup traffic should go to the cloud store.
    pub async fn using_cloud(&self) -> bool {
        self.tokens.load().await.authenticated
    }

    /// Execute a gated call and parse the body as JSON.
    ///
    /// The factory receives the shared client and a live bearer token; it
    /// is invoked only after the gate decides the token is usable, so a
    /// silently refreshed token is picked up transparently.
    pub async fn request_json<T, F>(&self, build: F) -> Option<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client, &str) -> reqwest::RequestBuilder,
    {
        let response = self.gated(build).await?;
        match response.json::<T>().await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "malformed cloud response");
                None
            }
        }
    }

    /// Execute a gated call and return the raw body.
    pub async fn request_bytes<F>(&self, build: F) -> Option<Bytes>
    where
        F: Fn(&Client, &str) -> reqwest::RequestBuilder,
    {
        let response = self.gated(build).await?;
        match response.bytes().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(error = %e, "could not read cloud response body");
                None
            }
        }
    }

    async fn gated<F>(&self, build: F) -> Option<reqwest::Response>
    where
        F: Fn(&Client, &str) -> reqwest::RequestBuilder,
    {
        let token = match self.ready_token().await {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "request not executed");
                return None;
            }
        };

        match self.execute(build(&self.http, &token)).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!(error = %e, "request failed");
                None
            }
        }
    }

    /// The gating protocol: a valid token passes through; an expired one
    /// triggers exactly one silent re-authentication, waited on under the
    /// configured timeout. Without a usable token the underlying call is
    /// never executed.
    async fn ready_token(&self) -> Result<String, SyncError> {
        let session = self.tokens.load().await;
        if !session.authenticated {
            return Err(SyncError::AuthExpired);
        }
        if !session.is_expired(Utc::now().timestamp()) {
            return Ok(session.access_token);
        }

        let _slot = self.reauth_gate.lock().await;

        // another caller may have finished the refresh while we waited
        let session = self.tokens.load().await;
        if session.authenticated && !session.is_expired(Utc::now().timestamp()) {
            return Ok(session.access_token);
        }

        let mut finished = self.flow.subscribe();
        match self.flow.begin_silent_sign_in().await {
            Ok(true) => {}
            Ok(false) => return Err(SyncError::AuthExpired),
            Err(e) => {
                warn!(error = %e, "silent sign-in failed to start");
                return Err(SyncError::AuthExpired);
            }
        }

        match timeout(self.config.reauth_timeout, finished.recv()).await {
            Ok(Ok(AuthFinished)) => {}
            Ok(Err(_)) | Err(_) => {
                warn!("silent re-authentication did not complete in time");
                return Err(SyncError::AuthExpired);
            }
        }

        let session = self.tokens.load().await;
        if session.authenticated {
            Ok(session.access_token)
        } else {
            Err(SyncError::AuthExpired)
        }
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SyncError> {
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // fail-closed: a rejected call invalidates the whole session
        warn!(status = %status, "cloud request rejected, dropping session");
        self.demote().await;
        Err(SyncError::AuthRejected {
            status: status.as_u16(),
        })
    }

    async fn demote(&self) {
        *self.folder_id.write().await = None;
        if let Err(e) = self.tokens.clear().await {
            warn!(error = %e, "could not clear rejected session");
        }
    }

    /// Resolve the reserved folder's id, creating the folder remotely if
    /// it does not exist yet. The id is cached in memory and in the
    /// durable medium.
    pub async fn ensure_saves_folder(&self) -> Option<String> {
        if let Some(id) = self.folder_id.read().await.as_ref() {
            return Some(id.clone());
        }
        if let Ok(Some(id)) = self.kv.get(KEY_FOLDER_ID).await {
            *self.folder_id.write().await = Some(id.clone());
            return Some(id);
        }

        let url = format!("{}/files", self.config.api_base);
        let query = format!(
            r#"mimeType = "{}" and name="{}""#,
            FOLDER_MIME, self.config.folder_name
        );
        let list: FileList = self
            .request_json(|http, token| {
                http.get(&url)
                    .query(&[("q", query.as_str())])
                    .bearer_auth(token)
            })
            .await?;

        let id = match list.files.into_iter().next() {
            Some(folder) => folder.id,
            None => {
                let metadata = json!({
                    "name": self.config.folder_name,
                    "mimeType": FOLDER_MIME,
                });
                let created: FileMetadata = self
                    .request_json(|http, token| {
                        http.post(&url).bearer_auth(token).json(&metadata)
                    })
                    .await?;
                info!(folder = %self.config.folder_name, "created reserved cloud folder");
                created.id
            }
        };

        if let Err(e) = self.kv.set(KEY_FOLDER_ID, &id).await {
            warn!(error = %e, "could not cache folder id");
        }
        *self.folder_id.write().await = Some(id.clone());
        Some(id)
    }

    /// Query the store for a title's save file. `search_root` widens the
    /// query beyond the reserved folder.
    pub async fn save_info(&self, game_name: &str, search_root: bool) -> Option<FileList> {
        let file_name = save_file_name(game_name);
        let query = if search_root {
            format!(r#"name = "{}""#, file_name)
        } else {
            let folder_id = self.ensure_saves_folder().await?;
            format!(r#"name = "{}" and parents in "{}""#, file_name, folder_id)
        };

        let url = format!("{}/files", self.config.api_base);
        self.request_json(|http, token| {
            http.get(&url)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "files/id,files/parents,files/name"),
                ])
                .bearer_auth(token)
        })
        .await
    }

    async fn find_save(&self, game_name: &str) -> Result<FileMetadata, SyncError> {
        let file_name = save_file_name(game_name);
        let list = self
            .save_info(game_name, false)
            .await
            .ok_or_else(|| SyncError::RequestFailed("save query resolved empty".to_string()))?;

        list.files
            .into_iter()
            .next()
            .ok_or(SyncError::NotFound(file_name))
    }

    /// List the save files in the reserved folder as name-only entries.
    pub async fn list_saves(&self) -> Vec<SaveEntry> {
        let Some(folder_id) = self.ensure_saves_folder().await else {
            return Vec::new();
        };

        let url = format!("{}/files", self.config.api_base);
        let query = format!(r#"parents in "{}""#, folder_id);
        let list: Option<FileList> = self
            .request_json(|http, token| {
                http.get(&url)
                    .query(&[("q", query.as_str())])
                    .bearer_auth(token)
            })
            .await;

        list.map(|l| {
            l.files
                .into_iter()
                .filter_map(|f| f.name)
                .map(SaveEntry::empty)
                .collect()
        })
        .unwrap_or_default()
    }

    /// Fetch a title's battery backup. A missing file yields an entry
    /// with empty data ("no cloud save yet"); `None` means the request
    /// itself failed.
    pub async fn download_save(&self, game_name: &str) -> Option<SaveEntry> {
        match self.find_save(game_name).await {
            Ok(file) => {
                let url = format!("{}/files/{}", self.config.api_base, file.id);
                let body = self
                    .request_bytes(|http, token| {
                        http.get(&url).query(&[("alt", "media")]).bearer_auth(token)
                    })
                    .await?;

                Some(SaveEntry {
                    game_name: game_name.to_string(),
                    data: body.to_vec(),
                })
            }
            Err(SyncError::NotFound(_)) => Some(SaveEntry::empty(game_name)),
            Err(e) => {
                debug!(error = %e, "download skipped");
                None
            }
        }
    }

    /// Store a title's battery backup. An existing file is overwritten in
    /// place by id; a new one is created in two phases — upload the
    /// bytes, then patch name/mimetype and move it into the reserved
    /// folder by diffing `parents`.
    pub async fn upload_save(&self, game_name: &str, data: &[u8]) -> bool {
        let file_name = save_file_name(game_name);

        match self.find_save(game_name).await {
            Ok(file) => {
                let url = format!(
                    "{}/files/{}?uploadType=media",
                    self.config.upload_base, file.id
                );
                let body = data.to_vec();
                let updated: Option<FileMetadata> = self
                    .request_json(move |http, token| {
                        http.patch(&url)
                            .bearer_auth(token)
                            .header(CONTENT_TYPE, SAVE_MIME)
                            .body(body.clone())
                    })
                    .await;

                updated.is_some()
            }
            Err(SyncError::NotFound(_)) => {
                let Some(folder_id) = self.ensure_saves_folder().await else {
                    return false;
                };

                let create_url = format!(
                    "{}/files?uploadType=media&fields=id,name,parents",
                    self.config.upload_base
                );
                let body = data.to_vec();
                let created: Option<FileMetadata> = self
                    .request_json(move |http, token| {
                        http.post(&create_url)
                            .bearer_auth(token)
                            .header(CONTENT_TYPE, SAVE_MIME)
                            .body(body.clone())
                    })
                    .await;
                let Some(created) = created else {
                    return false;
                };

                let previous_parents = created.parents.unwrap_or_default().join(",");
                let patch_url = format!(
                    "{}/files/{}?addParents={}&removeParents={}",
                    self.config.api_base,
                    created.id,
                    urlencoding::encode(&folder_id),
                    urlencoding::encode(&previous_parents),
                );
                let metadata = json!({ "name": file_name, "mimeType": SAVE_MIME });
                let patched: Option<FileMetadata> = self
                    .request_json(|http, token| {
                        http.patch(&patch_url).bearer_auth(token).json(&metadata)
                    })
                    .await;

                patched.is_some()
            }
            Err(e) => {
                debug!(error = %e, "upload skipped");
                false
            }
        }
    }

    /// Delete a title's save file. False when the file does not exist or
    /// the request failed.
    pub async fn delete_save(&self, game_name: &str) -> bool {
        match self.find_save(game_name).await {
            Ok(file) => {
                let url = format!("{}/files/{}", self.config.api_base, file.id);
                self.request_bytes(|http, token| http.delete(&url).bearer_auth(token))
                    .await
                    .is_some()
            }
            Err(e) => {
                debug!(error = %e, "delete skipped");
                false
            }
        }
    }
}
