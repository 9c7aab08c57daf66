//! 家庭云驱动实现 / HomeCloud driver implementation
//!
//! 三种账号模式共用一条认证请求管线 / Three account modes share one
//! authenticated-request pipeline:
//! - personal_new: 个人云(新版hcy API)
//! - personal: 个人云(旧版front API)
//! - family: 家庭云

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{
    compute_part_size, ConfigSaver, DriverError, DriverFactory, HashAlg, Object, Result,
    StorageDriver, UploadStream,
};

use super::client::HomeCloudClient;
use super::types::*;
use super::util::unicode_escape;

/// hcy上传的分片约束 / Part constraints for hcy uploads
const MAX_PART_COUNT: i64 = 100;
const DEFAULT_PART_SIZE: i64 = 16 * 1024 * 1024;

/// 家庭云驱动配置 / HomeCloud driver config
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HomeCloudConfig {
    /// Base64编码的 prefix:account:token 三元组 / Base64 prefix:account:token triple
    #[serde(default)]
    pub authorization: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub cloud_id: String,
    #[serde(default = "default_cloud_type")]
    pub cloud_type: String,
    #[serde(default)]
    pub root_folder_id: String,
    #[serde(default)]
    pub custom_upload_part_size: i64,
}

fn default_cloud_type() -> String {
    "personal_new".to_string()
}

/// 家庭云存储驱动 / HomeCloud storage driver
pub struct HomeCloudDriver {
    config: HomeCloudConfig,
    client: HomeCloudClient,
    http_client: Client,
}

impl HomeCloudDriver {
    pub fn new(config: HomeCloudConfig, saver: ConfigSaver) -> Result<Self> {
        let cloud_type = CloudType::from_str(&config.cloud_type);

        let base_config = config.clone();
        let persist = Arc::new(move |tokens: &TokenInfo| {
            let mut cfg = base_config.clone();
            cfg.authorization = tokens.authorization.clone();
            let value = serde_json::to_value(cfg).map_err(|e| DriverError::Parse(e.to_string()))?;
            saver(value)
        });

        let client = HomeCloudClient::new(
            cloud_type,
            config.cloud_id.clone(),
            config.user_id.clone(),
            config.group_id.clone(),
            persist,
        );
        client.init_token(&config.authorization)?;

        Ok(Self {
            config,
            client,
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
        })
    }

    fn cloud_type(&self) -> CloudType {
        CloudType::from_str(&self.config.cloud_type)
    }

    fn part_size_for(&self, size: i64) -> i64 {
        if self.config.custom_upload_part_size != 0 {
            self.config.custom_upload_part_size
        } else {
            compute_part_size(size, MAX_PART_COUNT, DEFAULT_PART_SIZE)
        }
    }

    /// 个人版(新)上传：SHA256协商，秒传未命中则逐分片PUT
    /// Personal (new) upload: SHA256 negotiation, per-part PUTs unless dedup hits
    async fn upload_personal_new(&self, parent_id: &str, stream: &mut UploadStream) -> Result<()> {
        let size = stream.size();
        let hash = stream.hash(HashAlg::Sha256).await?.to_uppercase();

        let part_size = self.part_size_for(size);
        let part_infos = build_part_infos(size, part_size);

        let content_type = stream.mime_type().to_string();
        let resp = self
            .client
            .personal_create_upload(parent_id, stream.name(), size, &content_type, &hash, part_infos)
            .await?;

        if resp.data.is_dedup_hit() {
            tracing::debug!("[homecloud] rapid upload hit for {}", stream.name());
            return Ok(());
        }

        for part in &resp.data.part_infos {
            let offset = (part.part_number - 1) * part_size;
            let chunk = stream.chunk(offset, part_size).await?;

            let resp = self
                .http_client
                .put(&part.upload_url)
                .header("Content-Type", "application/octet-stream")
                .header("Content-Length", chunk.len().to_string())
                .body(chunk)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(DriverError::Transfer(format!(
                    "part {} upload failed: {}",
                    part.part_number,
                    resp.status()
                )));
            }
        }

        self.client
            .personal_complete_upload(&resp.data.file_id, &resp.data.upload_id, &hash)
            .await
    }

    /// 旧版/家庭版上传：取重定向URL后按range分段POST
    /// Legacy/family upload: ranged POSTs against the redirection URL
    async fn upload_legacy(&self, parent_id: &str, stream: &mut UploadStream) -> Result<()> {
        let size = stream.size();
        let resp = self.client.get_upload_url(parent_id, stream.name(), size).await?;

        if resp.data.result.result_code != "0" {
            return Err(DriverError::Api(format!(
                "upload url request failed: {}",
                resp.data.result.result_desc.unwrap_or_default()
            )));
        }

        let upload_url = resp.data.upload_result.redirection_url;
        let upload_task_id = resp.data.upload_result.upload_task_id;

        let part_size = self.part_size_for(size);
        let mut start = 0i64;
        while start < size {
            let chunk = stream.chunk(start, part_size).await?;
            let end = start + chunk.len() as i64;

            let resp = self
                .http_client
                .post(&upload_url)
                .header("Content-Type", format!("text/plain;name={}", unicode_escape(stream.name())))
                .header("contentSize", size.to_string())
                .header("range", format!("bytes={}-{}", start, end - 1))
                .header("uploadtaskID", &upload_task_id)
                .header("rangeType", "0")
                .body(chunk)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(DriverError::Transfer(format!("range upload failed: {}", resp.status())));
            }
            start = end;
        }

        Ok(())
    }
}

/// 按固定分片大小声明分片表 / Declare the part table for a fixed part size
fn build_part_infos(size: i64, part_size: i64) -> Vec<PartInfo> {
    let part_count = if size > 0 { (size + part_size - 1) / part_size } else { 1 };
    (0..part_count)
        .map(|i| {
            let start = i * part_size;
            PartInfo {
                part_number: i + 1,
                part_size: (size - start).min(part_size),
                parallel_hash_ctx: ParallelHashCtx { part_offset: start },
            }
        })
        .collect()
}

#[async_trait]
impl StorageDriver for HomeCloudDriver {
    fn name(&self) -> &str {
        "家庭云"
    }

    async fn init(&self) -> Result<()> {
        // 持久化配置里总有刷新凭据，直接走刷新；失败即驱动不可用
        // the persisted config always carries a refresh credential, so go
        // straight to refreshing; failure leaves the driver unusable
        self.client.refresh_token().await
    }

    fn root(&self) -> Object {
        let id = if self.config.root_folder_id.is_empty() {
            match self.cloud_type() {
                CloudType::PersonalNew => "/".to_string(),
                CloudType::Personal => "root".to_string(),
                CloudType::Family => "0".to_string(),
            }
        } else {
            self.config.root_folder_id.clone()
        };
        Object::folder(id, "")
    }

    async fn list(&self, dir: &Object) -> Result<Vec<Object>> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.client.personal_get_files(&dir.id).await,
            CloudType::Personal => self.client.get_files(&dir.id).await,
            CloudType::Family => self.client.family_get_files(&dir.id).await,
        }
    }

    async fn link(&self, file: &Object) -> Result<String> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.client.personal_get_link(&file.id).await,
            _ => self.client.get_link(&file.id).await,
        }
    }

    async fn create_dir(&self, parent: &Object, name: &str) -> Result<()> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.client.personal_create_folder(&parent.id, name).await,
            _ => self.client.create_folder(&parent.id, name).await,
        }
    }

    async fn rename(&self, obj: &Object, new_name: &str) -> Result<()> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.client.personal_rename(&obj.id, new_name).await,
            _ => Err(DriverError::NotSupported("rename on this account mode")),
        }
    }

    async fn move_item(&self, obj: &Object, dst_dir: &Object) -> Result<()> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.client.personal_move(vec![obj.id.clone()], &dst_dir.id).await,
            _ => Err(DriverError::NotSupported("move on this account mode")),
        }
    }

    async fn copy_item(&self, obj: &Object, dst_dir: &Object) -> Result<()> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.client.personal_copy(vec![obj.id.clone()], &dst_dir.id).await,
            _ => Err(DriverError::NotSupported("copy on this account mode")),
        }
    }

    async fn delete(&self, obj: &Object) -> Result<()> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.client.personal_delete(vec![obj.id.clone()]).await,
            _ => {
                let (content_ids, catalog_ids) = if obj.is_folder {
                    (vec![], vec![obj.id.clone()])
                } else {
                    (vec![obj.id.clone()], vec![])
                };
                self.client.delete(content_ids, catalog_ids).await
            }
        }
    }

    async fn put(&self, dst_dir: &Object, stream: &mut UploadStream) -> Result<()> {
        match self.cloud_type() {
            CloudType::PersonalNew => self.upload_personal_new(&dst_dir.id, stream).await,
            _ => self.upload_legacy(&dst_dir.id, stream).await,
        }
    }
}

/// 家庭云驱动工厂 / HomeCloud driver factory
pub struct HomeCloudDriverFactory;

impl DriverFactory for HomeCloudDriverFactory {
    fn driver_type(&self) -> &'static str {
        "homecloud"
    }

    fn create_driver(&self, config: Value, saver: ConfigSaver) -> Result<Box<dyn StorageDriver>> {
        let config: HomeCloudConfig =
            serde_json::from_value(config).map_err(|e| DriverError::Config(e.to_string()))?;
        Ok(Box::new(HomeCloudDriver::new(config, saver)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_table_covers_the_size_exactly() {
        let parts = build_part_infos(33, 10);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].part_number, 1);
        assert_eq!(parts[0].part_size, 10);
        assert_eq!(parts[0].parallel_hash_ctx.part_offset, 0);
        assert_eq!(parts[3].part_size, 3);
        assert_eq!(parts[3].parallel_hash_ctx.part_offset, 30);
        assert_eq!(parts.iter().map(|p| p.part_size).sum::<i64>(), 33);
    }

    #[test]
    fn empty_content_still_declares_one_part() {
        let parts = build_part_infos(0, 10);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].part_size, 0);
    }

    #[test]
    fn root_id_follows_the_account_mode() {
        let saver: ConfigSaver = Arc::new(|_| Ok(()));
        let auth = super::super::util::encode_authorization("p", "13800000000", "tok");

        for (mode, expected) in [("personal_new", "/"), ("personal", "root"), ("family", "0")] {
            let config = HomeCloudConfig {
                authorization: auth.clone(),
                cloud_type: mode.to_string(),
                ..Default::default()
            };
            let driver = HomeCloudDriver::new(config, saver.clone()).unwrap();
            assert_eq!(driver.root().id, expected);
        }

        let config = HomeCloudConfig {
            authorization: auth,
            cloud_type: "family".to_string(),
            root_folder_id: "custom".to_string(),
            ..Default::default()
        };
        let driver = HomeCloudDriver::new(config, saver).unwrap();
        assert_eq!(driver.root().id, "custom");
    }

    #[test]
    fn malformed_authorization_is_fatal_at_creation() {
        let saver: ConfigSaver = Arc::new(|_| Ok(()));
        let config = HomeCloudConfig {
            authorization: "not-base64!!!".to_string(),
            ..Default::default()
        };
        assert!(matches!(HomeCloudDriver::new(config, saver), Err(DriverError::Auth(_))));
    }
}
