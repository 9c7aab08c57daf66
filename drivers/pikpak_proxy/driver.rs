//! PikPak proxy driver implementation / PikPak中转驱动实现
//!
//! 同一套盘API既可直连也可经中转通道访问；上传先以GCID协商秒传，
//! 未命中时用临时凭据把内容传到对象存储。
//! The drive API is reached either directly or through the relay channel;
//! uploads negotiate dedup with the GCID first and fall back to an
//! object-store transfer under temporary credentials.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::storage::{
    paging, ConfigSaver, DriverError, DriverFactory, HashAlg, Object, ObjectHash, Page, PageCursor,
    PageTurn, Result, StorageDriver, UploadDecision, UploadStream,
};

use super::client::{PikPakClient, Platform};
use super::types::*;
use super::util::*;
use super::writer::ObjectStoreTransfer;

const LIST_FILTERS: &str = r#"{"phase":{"eq":"PHASE_TYPE_COMPLETE"},"trashed":{"eq":false}}"#;

/// PikPak proxy driver configuration / PikPak中转驱动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PikPakProxyConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub captcha_token: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub root_folder_id: String,
    #[serde(default)]
    pub use_proxy: bool,
    #[serde(default)]
    pub proxy_url: String,
    #[serde(default = "default_true")]
    pub disable_media_link: bool,
}

fn default_platform() -> String {
    "web".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for PikPakProxyConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            refresh_token: String::new(),
            platform: default_platform(),
            captcha_token: String::new(),
            device_id: String::new(),
            root_folder_id: String::new(),
            use_proxy: false,
            proxy_url: String::new(),
            disable_media_link: true,
        }
    }
}

/// PikPak proxy storage driver / PikPak中转存储驱动
pub struct PikPakProxyDriver {
    config: PikPakProxyConfig,
    client: PikPakClient,
}

impl PikPakProxyDriver {
    pub fn new(config: PikPakProxyConfig, saver: ConfigSaver) -> Self {
        let platform = Platform::from_str(&config.platform);

        // 设备身份从账号派生，配置可覆盖 / device identity derives from the
        // account, overridable from config
        let device_id = if config.device_id.is_empty() {
            md5_hash(&format!("{}{}", config.username, config.password))
        } else {
            config.device_id.clone()
        };

        let base_config = config.clone();
        let persist = Arc::new(move |tokens: &TokenInfo| {
            let mut cfg = base_config.clone();
            cfg.refresh_token = tokens.refresh_token.clone();
            cfg.captcha_token = tokens.captcha_token.clone();
            cfg.device_id = tokens.device_id.clone();
            let value = serde_json::to_value(cfg).map_err(|e| DriverError::Parse(e.to_string()))?;
            saver(value)
        });

        let client = PikPakClient::new(platform, config.use_proxy, config.proxy_url.clone(), persist);
        client.init_token(&device_id, &config.refresh_token, &config.captcha_token);

        Self { config, client }
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<Object>> {
        let client = &self.client;
        paging::drain(
            PageCursor::Token { cursor: String::new(), page_size: 100 },
            |cursor| async move {
                let (token, page_size) = match cursor {
                    PageCursor::Token { cursor, page_size } => (cursor, page_size),
                    _ => return Err(DriverError::Parse("cursor style mismatch".to_string())),
                };
                let query = vec![
                    ("parent_id", folder_id.to_string()),
                    ("thumbnail_size", "SIZE_LARGE".to_string()),
                    ("with_audit", "true".to_string()),
                    ("limit", page_size.to_string()),
                    ("filters", LIST_FILTERS.to_string()),
                    ("page_token", token),
                ];

                let resp: FilesResp = client.get(api::FILES_URL, Some(query)).await?;

                let mut items = Vec::with_capacity(resp.files.len());
                for file in resp.files {
                    items.push(file_to_obj(file)?);
                }
                Ok(Page { items, turn: PageTurn::Next(resp.next_page_token) })
            },
        )
        .await
    }

    /// 获取离线下载任务列表 / List offline download tasks
    pub async fn offline_list(&self, next_page_token: &str, phases: &[&str]) -> Result<Vec<OfflineTask>> {
        let phases: Vec<&str> = if phases.is_empty() {
            vec![
                "PHASE_TYPE_RUNNING",
                "PHASE_TYPE_ERROR",
                "PHASE_TYPE_COMPLETE",
                "PHASE_TYPE_PENDING",
            ]
        } else {
            phases.to_vec()
        };

        let filters = json!({
            "phase": { "in": phases.join(",") },
        });
        let query = vec![
            ("type", "offline".to_string()),
            ("thumbnail_size", "SIZE_SMALL".to_string()),
            ("limit", "10000".to_string()),
            ("page_token", next_page_token.to_string()),
            ("with", "reference_resource".to_string()),
            ("filters", filters.to_string()),
        ];

        let resp: OfflineListResp = self.client.get(api::TASKS_URL, Some(query)).await?;
        Ok(resp.tasks)
    }

    /// 删除离线下载任务 / Delete offline download tasks
    pub async fn delete_offline_tasks(&self, task_ids: &[String], delete_files: bool) -> Result<()> {
        let query = vec![
            ("task_ids", task_ids.join(",")),
            ("delete_files", delete_files.to_string()),
        ];
        let _: Value = self.client.delete(api::TASKS_URL, Some(query)).await?;
        Ok(())
    }
}

fn parse_time_opt(s: &str) -> Result<Option<DateTime<Utc>>> {
    if s.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| DriverError::Parse(format!("bad timestamp: {}", s)))
}

/// 后端文件到规范化条目 / Backend file to canonical entry
fn file_to_obj(file: PikPakFile) -> Result<Object> {
    let is_folder = file.is_dir();
    let size: i64 = if is_folder || file.size.is_empty() {
        0
    } else {
        file.size
            .parse()
            .map_err(|_| DriverError::Parse(format!("bad file size: {}", file.size)))?
    };

    let modified = parse_time_opt(&file.modified_time)?;
    let created = parse_time_opt(&file.created_time)?;

    let mut obj = if is_folder {
        Object::folder(file.id, file.name)
    } else {
        Object::file(file.id, file.name, size)
    }
    .with_times(modified, created);

    if !file.hash.is_empty() {
        obj = obj.with_hash(ObjectHash::new(HashAlg::Gcid, file.hash));
    }
    if !file.thumbnail_link.is_empty() {
        obj = obj.with_thumbnail(file.thumbnail_link);
    }
    Ok(obj)
}

#[async_trait]
impl StorageDriver for PikPakProxyDriver {
    fn name(&self) -> &str {
        "PikPakProxy"
    }

    async fn init(&self) -> Result<()> {
        // 有刷新凭据直接刷新，否则登录建立设备身份；两步都不重试
        // refresh directly when a refresh credential exists, else log in to
        // establish the device identity; neither step is retried
        if self.client.has_refresh_token() {
            self.client.refresh_token().await?;
        } else {
            self.client.login(&self.config.username, &self.config.password).await?;
        }

        // 验证码令牌取到之前驱动不可用 / the driver is unusable until the
        // captcha token is acquired
        let user_id = self.client.get_token_info().user_id;
        self.client
            .refresh_captcha_token_at_login(&get_action("GET", api::FILES_URL), &user_id)
            .await
    }

    fn root(&self) -> Object {
        Object::folder(self.config.root_folder_id.clone(), "")
    }

    async fn list(&self, dir: &Object) -> Result<Vec<Object>> {
        self.list_files(&dir.id).await
    }

    async fn link(&self, file: &Object) -> Result<String> {
        let url = self
            .client
            .get_download_url(&file.id, self.config.disable_media_link)
            .await?;
        Ok(self.client.proxied_link(url))
    }

    async fn create_dir(&self, parent: &Object, name: &str) -> Result<()> {
        let body = json!({
            "kind": "drive#folder",
            "parent_id": parent.id,
            "name": name,
        });
        let _: Value = self.client.post(api::FILES_URL, body).await?;
        Ok(())
    }

    async fn rename(&self, obj: &Object, new_name: &str) -> Result<()> {
        let body = json!({ "name": new_name });
        let url = format!("{}/{}", api::FILES_URL, obj.id);
        let _: Value = self.client.patch(&url, body).await?;
        Ok(())
    }

    async fn move_item(&self, obj: &Object, dst_dir: &Object) -> Result<()> {
        let body = json!({
            "ids": [obj.id],
            "to": { "parent_id": dst_dir.id },
        });
        let _: Value = self.client.post(&format!("{}:batchMove", api::FILES_URL), body).await?;
        Ok(())
    }

    async fn copy_item(&self, obj: &Object, dst_dir: &Object) -> Result<()> {
        let body = json!({
            "ids": [obj.id],
            "to": { "parent_id": dst_dir.id },
        });
        let _: Value = self.client.post(&format!("{}:batchCopy", api::FILES_URL), body).await?;
        Ok(())
    }

    async fn delete(&self, obj: &Object) -> Result<()> {
        let body = json!({ "ids": [obj.id] });
        let _: Value = self.client.post(&format!("{}:batchDelete", api::FILES_URL), body).await?;
        Ok(())
    }

    async fn put(&self, dst_dir: &Object, stream: &mut UploadStream) -> Result<()> {
        let hash = stream.hash(HashAlg::Gcid).await?.to_uppercase();

        let body = json!({
            "kind": "drive#file",
            "name": stream.name(),
            "size": stream.size(),
            "hash": hash,
            "upload_type": "UPLOAD_TYPE_RESUMABLE",
            "objProvider": { "provider": "UPLOAD_TYPE_UNKNOWN" },
            "parent_id": dst_dir.id,
            "folder_type": "NORMAL",
        });

        let resp: UploadTaskResp = self.client.post(api::FILES_URL, body).await?;
        match resp.decision() {
            UploadDecision::AlreadyStored => {
                tracing::debug!("[pikpak] dedup hit for {}", stream.name());
                Ok(())
            }
            UploadDecision::TransferRequired(session) => {
                ObjectStoreTransfer::new(session).upload(stream).await
            }
        }
    }

    async fn offline_download(&self, url: &str) -> Result<()> {
        let body = json!({
            "kind": "drive#file",
            "name": "",
            "upload_type": "UPLOAD_TYPE_URL",
            "url": { "url": url },
            "folder_type": "DOWNLOAD",
        });
        let _: Value = self.client.post(api::FILES_URL, body).await?;
        Ok(())
    }
}

/// PikPak proxy driver factory / PikPak中转驱动工厂
pub struct PikPakProxyDriverFactory;

impl DriverFactory for PikPakProxyDriverFactory {
    fn driver_type(&self) -> &'static str {
        "pikpak_proxy"
    }

    fn create_driver(&self, config: Value, saver: ConfigSaver) -> Result<Box<dyn StorageDriver>> {
        let cfg: PikPakProxyConfig =
            serde_json::from_value(config).map_err(|e| DriverError::Config(e.to_string()))?;
        Ok(Box::new(PikPakProxyDriver::new(cfg, saver)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_mapping_forces_zero_size() {
        let file = PikPakFile {
            id: "d1".to_string(),
            kind: "drive#folder".to_string(),
            name: "docs".to_string(),
            size: "999".to_string(),
            ..Default::default()
        };
        let obj = file_to_obj(file).unwrap();
        assert!(obj.is_folder);
        assert_eq!(obj.size, 0);
        assert!(obj.content_hash.is_none());
    }

    #[test]
    fn file_mapping_carries_gcid_and_thumbnail() {
        let file = PikPakFile {
            id: "f1".to_string(),
            kind: "drive#file".to_string(),
            name: "a.bin".to_string(),
            size: "123".to_string(),
            hash: "6B4F89A54E2D27ECD7E8DA05B4AB8FD9D1D8B119".to_string(),
            thumbnail_link: "https://thumb/1".to_string(),
            created_time: "2024-06-04T15:30:00+08:00".to_string(),
            modified_time: "2024-06-04T16:30:00+08:00".to_string(),
            ..Default::default()
        };
        let obj = file_to_obj(file).unwrap();
        assert_eq!(obj.size, 123);
        assert_eq!(obj.content_hash.as_ref().unwrap().alg, HashAlg::Gcid);
        assert_eq!(obj.thumbnail_url.as_deref(), Some("https://thumb/1"));
        assert!(obj.modified_at.unwrap() > obj.created_at.unwrap());
    }

    #[test]
    fn malformed_size_or_time_is_a_parse_error() {
        let file = PikPakFile {
            id: "f1".to_string(),
            kind: "drive#file".to_string(),
            size: "12x".to_string(),
            ..Default::default()
        };
        assert!(matches!(file_to_obj(file), Err(DriverError::Parse(_))));

        let file = PikPakFile {
            id: "f1".to_string(),
            kind: "drive#file".to_string(),
            size: "12".to_string(),
            modified_time: "yesterday".to_string(),
            ..Default::default()
        };
        assert!(matches!(file_to_obj(file), Err(DriverError::Parse(_))));
    }

    #[test]
    fn device_identity_derives_from_the_account() {
        let saver: ConfigSaver = Arc::new(|_| Ok(()));
        let config = PikPakProxyConfig {
            username: "user@example.com".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        let driver = PikPakProxyDriver::new(config, saver);
        assert_eq!(
            driver.client.get_token_info().device_id,
            md5_hash("user@example.comsecret")
        );
    }
}
