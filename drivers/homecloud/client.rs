//! 家庭云API客户端 / HomeCloud API client
//!
//! front与mcloud两条通道共用一份凭据；凭据的任何变更都经由单飞闸串行化，
//! 并在成功后立刻回写配置存储。
//! Both the front and the mcloud channel share one credential; every
//! credential mutation is serialized behind the single-flight gate and
//! written back to config storage immediately on success.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::storage::{
    paging, DriverError, HashAlg, Object, ObjectHash, PageCursor, Page, PageTurn, Result, SingleFlight,
};

use super::types::*;
use super::util::{self, api};

/// 凭据回写钩子 / Credential write-back hook
pub type PersistFn = Arc<dyn Fn(&TokenInfo) -> Result<()> + Send + Sync>;

/// 家庭云API客户端 / HomeCloud API client
pub struct HomeCloudClient {
    client: Client,
    token_info: Arc<RwLock<TokenInfo>>,
    refresh_flight: SingleFlight,
    cloud_type: CloudType,
    cloud_id: String,
    user_id: String,
    group_id: String,
    persist: PersistFn,
}

impl HomeCloudClient {
    pub fn new(
        cloud_type: CloudType,
        cloud_id: String,
        user_id: String,
        group_id: String,
        persist: PersistFn,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            token_info: Arc::new(RwLock::new(TokenInfo::default())),
            refresh_flight: SingleFlight::new(),
            cloud_type,
            cloud_id,
            user_id,
            group_id,
            persist,
        }
    }

    /// 初始化令牌 / Initialize token
    pub fn init_token(&self, authorization: &str) -> Result<()> {
        let (_, account, _) = util::decode_authorization(authorization)?;
        let mut info = self.token_info.write().unwrap();
        info.authorization = authorization.to_string();
        info.account = account;
        Ok(())
    }

    /// 获取令牌信息 / Get token info
    pub fn get_token_info(&self) -> TokenInfo {
        self.token_info.read().unwrap().clone()
    }

    fn authorization(&self) -> String {
        self.token_info.read().unwrap().authorization.clone()
    }

    fn account(&self) -> String {
        self.token_info.read().unwrap().account.clone()
    }

    fn is_family(&self) -> bool {
        self.cloud_type == CloudType::Family
    }

    /// 刷新令牌：单飞，成功后只替换轮转段并立即回写
    /// Refresh the token: single-flight; only the rotating segment is
    /// replaced and the credential is persisted right away.
    pub async fn refresh_token(&self) -> Result<()> {
        self.refresh_flight.run(|| self.do_refresh()).await.map(|_| ())
    }

    async fn do_refresh(&self) -> Result<()> {
        let auth = self.authorization();
        let (prefix, account, token) = util::decode_authorization(&auth)?;

        let req_body = format!(
            "<root><token>{}</token><account>{}</account><clienttype>656</clienttype></root>",
            token, account
        );
        let resp = self
            .client
            .post(api::AUTH_REFRESH_URL)
            .header("Content-Type", "application/xml")
            .body(req_body)
            .send()
            .await?;
        let text = resp.text().await?;

        let parsed = RefreshTokenResp::from_xml(&text);
        if parsed.return_code != "0" || parsed.token.is_empty() {
            return Err(DriverError::Auth(format!("token refresh rejected: {}", parsed.desc)));
        }

        {
            let mut info = self.token_info.write().unwrap();
            info.authorization = util::encode_authorization(&prefix, &account, &parsed.token);
            info.account = account;
        }
        self.persist_tokens()
    }

    fn persist_tokens(&self) -> Result<()> {
        let snapshot = self.get_token_info();
        (self.persist)(&snapshot)
    }

    // ==================== front 通道 (Scheme A) ====================

    /// front POST / front POST request
    pub async fn post<T: DeserializeOwned>(&self, pathname: &str, body: Value) -> Result<T> {
        let auth = self.authorization();
        if auth.is_empty() {
            return Err(DriverError::SigningPrecondition("front bearer token".to_string()));
        }

        let body_str = serde_json::to_string(&body).unwrap_or_default();
        let request_id = util::random_string(12);
        let timestamp = util::front_timestamp();
        let signature = util::sign_front(pathname, &body_str, &request_id, &auth, &timestamp);

        let url = format!("{}{}", api::FRONT_HOST, pathname);
        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Authorization", format!("Bearer {}", auth))
            .header("Content-Type", "application/json")
            .header(
                "X-User-Agent",
                "Web|Chrome 127.0.0.0||OS X|homecloudWebDisk_1.1.1||yunpan 1.1.1|unknown",
            )
            .header("Timestamp", &timestamp)
            .header("Signature", &signature)
            .header("Request-Id", &request_id)
            .header("userId", &self.user_id)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let preview: String = text.chars().take(200).collect();
        tracing::debug!("[homecloud] front {} -> {} {}", pathname, status, preview);

        let envelope: FrontResp = serde_json::from_str(&text).unwrap_or_default();
        if envelope.ret != 200 {
            if envelope.ret == 401 {
                return Err(DriverError::Auth(envelope.reason));
            }
            return Err(DriverError::Api(envelope.reason));
        }

        serde_json::from_str(&text).map_err(|e| DriverError::Parse(e.to_string()))
    }

    /// front POST，401等价失败刷新一次后重放 / front POST with one refresh-and-retry on a 401-equivalent
    pub async fn post_with_reauth<T: DeserializeOwned>(&self, pathname: &str, body: Value) -> Result<T> {
        match self.post(pathname, body.clone()).await {
            Err(e) if e.is_auth() => {
                self.refresh_token().await?;
                self.post(pathname, body).await
            }
            other => other,
        }
    }

    // ==================== mcloud 通道 (Scheme B) ====================

    /// mcloud POST / mcloud POST request
    pub async fn personal_post<T: DeserializeOwned>(&self, pathname: &str, body: Value) -> Result<T> {
        let auth = self.authorization();
        if auth.is_empty() {
            return Err(DriverError::SigningPrecondition("mcloud basic token".to_string()));
        }

        let body_str = serde_json::to_string(&body).unwrap_or_default();
        let rand_str = util::random_string(16);
        let ts = util::mcloud_timestamp();
        let sign = util::calc_sign(&body_str, &ts, &rand_str);

        let url = format!("{}{}", api::PERSONAL_HOST, pathname);
        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Authorization", format!("Basic {}", auth))
            .header("Caller", "web")
            .header("Cms-Device", "default")
            .header("Mcloud-Channel", "1000101")
            .header("Mcloud-Client", "10701")
            .header("Mcloud-Route", "001")
            .header("Mcloud-Sign", format!("{},{},{}", ts, rand_str, sign))
            .header("Mcloud-Version", "7.13.0")
            .header("Origin", "https://yun.139.com")
            .header("Referer", "https://yun.139.com/w/")
            .header("x-DeviceInfo", "||9|7.13.0|chrome|120.0.0.0|||windows 10||zh-CN|||")
            .header("x-huawei-channelSrc", "10000034")
            .header("x-inner-ntwk", "2")
            .header("x-m4c-caller", "PC")
            .header("x-m4c-src", "10002")
            .header("x-SvcType", self.cloud_type.svc_type())
            .header("X-Yun-Api-Version", "v1")
            .header("X-Yun-App-Channel", "10000034")
            .header("X-Yun-Channel-Source", "10000034")
            .header(
                "X-Yun-Client-Info",
                "||9|7.13.0|chrome|120.0.0.0|||windows 10||zh-CN|||dW5kZWZpbmVk||",
            )
            .header("X-Yun-Module-Type", "100")
            .header("X-Yun-Svc-Type", "1")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let preview: String = text.chars().take(200).collect();
        tracing::debug!("[homecloud] mcloud {} -> {} {}", pathname, status, preview);

        let envelope: BaseResp = serde_json::from_str(&text).unwrap_or_default();
        if !envelope.success {
            return Err(DriverError::Api(envelope.message));
        }

        serde_json::from_str(&text).map_err(|e| DriverError::Parse(e.to_string()))
    }

    // ==================== 列举 / Listings ====================

    /// 个人版(新)文件列表：游标分页 / Personal (new) listing: cursor paging
    pub async fn personal_get_files(&self, file_id: &str) -> Result<Vec<Object>> {
        let client = self;
        paging::drain(
            PageCursor::Token { cursor: String::new(), page_size: 100 },
            |cursor| async move {
                let (page_cursor, page_size) = match cursor {
                    PageCursor::Token { cursor, page_size } => (cursor, page_size),
                    _ => return Err(DriverError::Parse("cursor style mismatch".to_string())),
                };
                let body = json!({
                    "imageThumbnailStyleList": ["Small", "Large"],
                    "orderBy": "updated_at",
                    "orderDirection": "DESC",
                    "pageInfo": {
                        "pageCursor": page_cursor,
                        "pageSize": page_size,
                    },
                    "parentFileId": file_id,
                });
                let resp: PersonalListResp = client.personal_post("/hcy/file/list", body).await?;

                let mut items = Vec::with_capacity(resp.data.items.len());
                for item in resp.data.items {
                    items.push(personal_item_to_object(item)?);
                }
                Ok(Page { items, turn: PageTurn::Next(resp.data.next_page_cursor) })
            },
        )
        .await
    }

    /// 个人版(旧)文件列表：偏移分页，目录与文件分列表返回
    /// Personal (legacy) listing: offset paging with split folder/file sub-lists
    pub async fn get_files(&self, catalog_id: &str) -> Result<Vec<Object>> {
        let client = self;
        let account = self.account();
        let account = &account;
        paging::drain(PageCursor::Offset { start: 0, limit: 100 }, |cursor| async move {
            let (start, limit) = match cursor {
                PageCursor::Offset { start, limit } => (start, limit),
                _ => return Err(DriverError::Parse("cursor style mismatch".to_string())),
            };
            let body = json!({
                "catalogID": catalog_id,
                "sortDirection": 1,
                "startNumber": start + 1,
                "endNumber": start + limit,
                "filterType": 0,
                "catalogSortType": 0,
                "contentSortType": 0,
                "commonAccountInfo": {
                    "account": account,
                    "accountType": 1,
                },
            });
            let resp: GetDiskResp = client
                .post_with_reauth("/orchestration/personalCloud/catalog/v1.0/getDisk", body)
                .await?;

            let result = resp.data.get_disk_result;
            let mut items = Vec::with_capacity(result.catalog_list.len() + result.content_list.len());
            for catalog in result.catalog_list {
                items.push(catalog_to_object(catalog)?);
            }
            for content in result.content_list {
                items.push(content_to_object(content)?);
            }
            Ok(Page { items, turn: PageTurn::Total(result.node_count) })
        })
        .await
    }

    /// 家庭版文件列表：页码分页，总数为数字字符串
    /// Family listing: page-number paging, total count as a numeric string
    pub async fn family_get_files(&self, file_id: &str) -> Result<Vec<Object>> {
        // 根目录以路径形式出现时归一为"0" / a path-shaped root collapses to "0"
        let file_id = if file_id.contains('/') { "0" } else { file_id };

        let client = self;
        paging::drain(PageCursor::Numbered { page_num: 1, page_size: 100 }, |cursor| async move {
            let (page_num, page_size) = match cursor {
                PageCursor::Numbered { page_num, page_size } => (page_num, page_size),
                _ => return Err(DriverError::Parse("cursor style mismatch".to_string())),
            };
            let body = json!({
                "pageInfo": {
                    "pageNum": page_num,
                    "pageSize": page_size,
                },
                "sortInfo": {
                    "sortField": 1,
                    "sortOrder": 2,
                },
                "userId": client.user_id,
                "groupId": client.group_id,
                "fileId": file_id,
            });
            let resp: FileInfoListResp = client
                .post_with_reauth("/storage/getFileInfoList/v1", body)
                .await?;

            let total: i64 = resp
                .data
                .total
                .parse()
                .map_err(|_| DriverError::Parse(format!("bad total count: {}", resp.data.total)))?;

            let mut items = Vec::with_capacity(resp.data.file_infos.len());
            for info in resp.data.file_infos {
                items.push(family_info_to_object(info)?);
            }
            Ok(Page { items, turn: PageTurn::Total(total) })
        })
        .await
    }

    // ==================== 直链 / Links ====================

    /// front下载直链，经CDN网关 / front download link through the CDN gateway
    pub async fn get_link(&self, file_id: &str) -> Result<String> {
        let body = json!({
            "userId": self.user_id,
            "groupId": self.group_id,
            "fileId": file_id,
        });
        let resp: FrontDownloadUrlResp = self
            .post_with_reauth("/storage/getFileDownloadUrl/v1", body)
            .await?;
        Ok(format!("{}{}", api::CDN_GATEWAY, resp.data.download_url))
    }

    /// 个人版(新)下载直链 / Personal (new) download link
    pub async fn personal_get_link(&self, file_id: &str) -> Result<String> {
        let body = json!({ "fileId": file_id });
        let resp: PersonalDownloadUrlResp = self.personal_post("/hcy/file/getDownloadUrl", body).await?;

        if !resp.data.cdn_url.is_empty() {
            Ok(resp.data.cdn_url)
        } else {
            Ok(resp.data.url)
        }
    }

    // ==================== 个人版(新) 变更 / Personal (new) mutations ====================

    pub async fn personal_create_folder(&self, parent_id: &str, name: &str) -> Result<()> {
        let body = json!({
            "parentFileId": parent_id,
            "name": name,
            "description": "",
            "type": "folder",
            "fileRenameMode": "force_rename",
        });
        let _: Value = self.personal_post("/hcy/file/create", body).await?;
        Ok(())
    }

    pub async fn personal_rename(&self, file_id: &str, new_name: &str) -> Result<()> {
        let body = json!({
            "fileId": file_id,
            "name": new_name,
            "description": "",
        });
        let _: Value = self.personal_post("/hcy/file/update", body).await?;
        Ok(())
    }

    pub async fn personal_move(&self, file_ids: Vec<String>, to_parent_id: &str) -> Result<()> {
        let body = json!({
            "fileIds": file_ids,
            "toParentFileId": to_parent_id,
        });
        let _: Value = self.personal_post("/hcy/file/batchMove", body).await?;
        Ok(())
    }

    pub async fn personal_copy(&self, file_ids: Vec<String>, to_parent_id: &str) -> Result<()> {
        let body = json!({
            "fileIds": file_ids,
            "toParentFileId": to_parent_id,
        });
        let _: Value = self.personal_post("/hcy/file/batchCopy", body).await?;
        Ok(())
    }

    pub async fn personal_delete(&self, file_ids: Vec<String>) -> Result<()> {
        let body = json!({ "fileIds": file_ids });
        let _: Value = self.personal_post("/hcy/recyclebin/batchTrash", body).await?;
        Ok(())
    }

    /// 个人版创建上传任务 / Personal create upload task
    pub async fn personal_create_upload(
        &self,
        parent_id: &str,
        name: &str,
        size: i64,
        content_type: &str,
        hash: &str,
        part_infos: Vec<PartInfo>,
    ) -> Result<PersonalUploadResp> {
        let body = json!({
            "contentHash": hash,
            "contentHashAlgorithm": "SHA256",
            "contentType": content_type,
            "parallelUpload": false,
            "partInfos": part_infos,
            "size": size,
            "parentFileId": parent_id,
            "name": name,
            "type": "file",
            "fileRenameMode": "auto_rename",
        });
        self.personal_post("/hcy/file/create", body).await
    }

    /// 个人版完成上传 / Personal complete upload
    pub async fn personal_complete_upload(&self, file_id: &str, upload_id: &str, hash: &str) -> Result<()> {
        let body = json!({
            "contentHash": hash,
            "contentHashAlgorithm": "SHA256",
            "fileId": file_id,
            "uploadId": upload_id,
        });
        let _: Value = self.personal_post("/hcy/file/complete", body).await?;
        Ok(())
    }

    // ==================== 旧版/家庭版 变更 / Legacy & family mutations ====================

    /// 构建家庭云公共JSON / Build common JSON for the family cloud
    fn new_json(&self, data: Value) -> Value {
        let mut result = json!({
            "catalogType": 3,
            "cloudID": self.cloud_id,
            "cloudType": 1,
            "commonAccountInfo": {
                "account": self.account(),
                "accountType": 1,
            },
        });

        if let (Some(result_obj), Some(data_obj)) = (result.as_object_mut(), data.as_object()) {
            for (k, v) in data_obj {
                result_obj.insert(k.clone(), v.clone());
            }
        }
        result
    }

    /// 创建文件夹(旧版/家庭版) / Create folder (legacy/family)
    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<()> {
        let body = json!({
            "createCatalogExtReq": {
                "parentCatalogID": parent_id,
                "newCatalogName": name,
                "commonAccountInfo": {
                    "account": self.account(),
                    "accountType": 1,
                },
            },
        });
        let _: Value = self
            .post_with_reauth("/orchestration/personalCloud/catalog/v1.0/createCatalogExt", body)
            .await?;
        Ok(())
    }

    /// 删除(旧版/家庭版) / Delete (legacy/family)
    pub async fn delete(&self, content_ids: Vec<String>, catalog_ids: Vec<String>) -> Result<()> {
        let body = json!({
            "createBatchOprTaskReq": {
                "taskType": 2,
                "actionType": 201,
                "taskInfo": {
                    "newCatalogID": "",
                    "contentInfoList": content_ids,
                    "catalogInfoList": catalog_ids,
                },
                "commonAccountInfo": {
                    "account": self.account(),
                    "accountType": 1,
                },
            },
        });

        let pathname = if self.is_family() {
            "/orchestration/familyCloud-rebuild/batchOprTask/v1.0/createBatchOprTask"
        } else {
            "/orchestration/personalCloud/batchOprTask/v1.0/createBatchOprTask"
        };
        let _: Value = self.post_with_reauth(pathname, body).await?;
        Ok(())
    }

    /// 获取上传URL(旧版/家庭版) / Get upload URL (legacy/family)
    pub async fn get_upload_url(&self, parent_id: &str, name: &str, size: i64) -> Result<UploadResp> {
        let body = if self.is_family() {
            self.new_json(json!({
                "fileCount": 1,
                "manualRename": 2,
                "operation": 0,
                "path": parent_id,
                "seqNo": util::random_string(32),
                "totalSize": size,
                "uploadContentList": [{
                    "contentName": name,
                    "contentSize": size,
                }],
            }))
        } else {
            json!({
                "manualRename": 2,
                "operation": 0,
                "fileCount": 1,
                "totalSize": size,
                "uploadContentList": [{
                    "contentName": name,
                    "contentSize": size,
                }],
                "parentCatalogID": parent_id,
                "newCatalogName": "",
                "commonAccountInfo": {
                    "account": self.account(),
                    "accountType": 1,
                },
            })
        };

        let pathname = if self.is_family() {
            "/orchestration/familyCloud-rebuild/content/v1.0/getFileUploadURL"
        } else {
            "/orchestration/personalCloud/uploadAndDownload/v1.0/pcUploadFileRequest"
        };
        self.post_with_reauth(pathname, body).await
    }
}

// ==================== 规范化映射 / Canonical mapping ====================

fn opt_time(s: &str, parse: fn(&str) -> Result<DateTime<Utc>>) -> Result<Option<DateTime<Utc>>> {
    if s.is_empty() {
        Ok(None)
    } else {
        parse(s).map(Some)
    }
}

fn catalog_to_object(catalog: Catalog) -> Result<Object> {
    Ok(Object::folder(catalog.catalog_id, catalog.catalog_name).with_times(
        opt_time(&catalog.update_time, util::parse_time)?,
        opt_time(&catalog.create_time, util::parse_time)?,
    ))
}

fn content_to_object(content: Content) -> Result<Object> {
    let mut obj = Object::file(content.content_id, content.content_name, content.content_size)
        .with_times(
            opt_time(&content.update_time, util::parse_time)?,
            opt_time(&content.create_time, util::parse_time)?,
        );
    if !content.digest.is_empty() {
        obj = obj.with_hash(ObjectHash::new(HashAlg::Md5, content.digest));
    }
    if !content.thumbnail_url.is_empty() {
        obj = obj.with_thumbnail(content.thumbnail_url);
    }
    Ok(obj)
}

fn family_info_to_object(info: FamilyFileInfo) -> Result<Object> {
    let is_folder = info.file_type == 1;
    let size: i64 = if is_folder {
        0
    } else {
        info.size
            .parse()
            .map_err(|_| DriverError::Parse(format!("bad file size: {}", info.size)))?
    };

    let times = (
        opt_time(&info.update_time, util::parse_time)?,
        opt_time(&info.create_time, util::parse_time)?,
    );
    let obj = if is_folder {
        Object::folder(info.id, info.name)
    } else {
        Object::file(info.id, info.name, size)
    };
    Ok(obj.with_times(times.0, times.1))
}

fn personal_item_to_object(item: PersonalFileItem) -> Result<Object> {
    let times = (
        opt_time(&item.updated_at, util::parse_personal_time)?,
        opt_time(&item.created_at, util::parse_personal_time)?,
    );

    if item.is_folder() {
        Ok(Object::folder(item.file_id, item.name).with_times(times.0, times.1))
    } else {
        let mut obj = Object::file(item.file_id, item.name, item.size).with_times(times.0, times.1);
        // 末位缩略图为代表图 / the last thumbnail is the representative one
        if let Some(thumb) = item.thumbnails.last() {
            if !thumb.url.is_empty() {
                obj = obj.with_thumbnail(thumb.url.clone());
            }
        }
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_size_and_type_mapping() {
        let folder = FamilyFileInfo {
            id: "d1".to_string(),
            name: "docs".to_string(),
            size: "ignored".to_string(),
            file_type: 1,
            create_time: String::new(),
            update_time: "20240604153000".to_string(),
        };
        let obj = family_info_to_object(folder).unwrap();
        assert!(obj.is_folder);
        assert_eq!(obj.size, 0);
        assert!(obj.modified_at.is_some());
        assert!(obj.created_at.is_none());

        let file = FamilyFileInfo {
            id: "f1".to_string(),
            name: "a.bin".to_string(),
            size: "123".to_string(),
            file_type: 0,
            create_time: String::new(),
            update_time: String::new(),
        };
        let obj = family_info_to_object(file).unwrap();
        assert!(!obj.is_folder);
        assert_eq!(obj.size, 123);
    }

    #[test]
    fn malformed_family_size_is_a_parse_error() {
        let file = FamilyFileInfo {
            id: "f1".to_string(),
            name: "a.bin".to_string(),
            size: "12x3".to_string(),
            file_type: 0,
            ..Default::default()
        };
        assert!(matches!(family_info_to_object(file), Err(DriverError::Parse(_))));
    }

    #[test]
    fn malformed_timestamp_is_a_parse_error() {
        let catalog = Catalog {
            catalog_id: "c1".to_string(),
            catalog_name: "x".to_string(),
            create_time: "not-a-time".to_string(),
            update_time: String::new(),
        };
        assert!(matches!(catalog_to_object(catalog), Err(DriverError::Parse(_))));
    }

    #[test]
    fn personal_item_takes_the_last_thumbnail() {
        let item = PersonalFileItem {
            file_id: "f1".to_string(),
            name: "pic.jpg".to_string(),
            size: 42,
            file_type: "file".to_string(),
            created_at: "2024-06-04T15:30:00.000+08:00".to_string(),
            updated_at: "2024-06-04T15:30:00.000+08:00".to_string(),
            thumbnails: vec![
                PersonalThumbnail { style: "Small".to_string(), url: "https://t/small".to_string() },
                PersonalThumbnail { style: "Large".to_string(), url: "https://t/large".to_string() },
            ],
        };
        let obj = personal_item_to_object(item).unwrap();
        assert_eq!(obj.thumbnail_url.as_deref(), Some("https://t/large"));
        assert_eq!(obj.size, 42);
    }

    #[test]
    fn content_digest_is_an_md5_hash_tag() {
        let content = Content {
            content_id: "c1".to_string(),
            content_name: "a.jpg".to_string(),
            content_size: 9,
            digest: "D41D8CD98F00B204E9800998ECF8427E".to_string(),
            ..Default::default()
        };
        let obj = content_to_object(content).unwrap();
        let hash = obj.content_hash.unwrap();
        assert_eq!(hash.alg, HashAlg::Md5);
        assert_eq!(hash.value, "D41D8CD98F00B204E9800998ECF8427E");
    }
}
