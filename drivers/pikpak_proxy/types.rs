//! PikPak data type definitions / PikPak数据类型定义

use serde::{Deserialize, Serialize};

use crate::storage::{UploadDecision, UploadSession};

/// API error response / API错误响应
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrResp {
    #[serde(default, rename = "error_code")]
    pub error_code: i64,
    #[serde(default, rename = "error")]
    pub error: String,
    #[serde(default, rename = "error_description")]
    pub error_description: String,
}

impl ErrResp {
    pub fn is_error(&self) -> bool {
        self.error_code != 0 || !self.error.is_empty() || !self.error_description.is_empty()
    }

    pub fn error_message(&self) -> String {
        if self.error_code != 0 {
            return format!(
                "ErrorCode: {}, Error: {}, Description: {}",
                self.error_code, self.error, self.error_description
            );
        }
        if !self.error.is_empty() {
            return format!("Error: {}, Description: {}", self.error, self.error_description);
        }
        "Unknown error".to_string()
    }
}

/// File list response / 文件列表响应
#[derive(Debug, Deserialize, Default)]
pub struct FilesResp {
    #[serde(default)]
    pub files: Vec<PikPakFile>,
    #[serde(default, rename = "next_page_token")]
    pub next_page_token: String,
}

/// PikPak file info / PikPak文件信息
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PikPakFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    /// 数字字符串 / numeric string
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub modified_time: String,
    #[serde(default)]
    pub thumbnail_link: String,
    #[serde(default)]
    pub web_content_link: String,
    #[serde(default)]
    pub medias: Vec<Media>,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub trashed: bool,
}

impl PikPakFile {
    pub fn is_dir(&self) -> bool {
        self.kind == "drive#folder"
    }
}

/// Media info (for video streaming) / 媒体信息
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Media {
    #[serde(default)]
    pub media_id: String,
    #[serde(default)]
    pub media_name: String,
    #[serde(default)]
    pub link: MediaLink,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_origin: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MediaLink {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub expire: String,
}

/// Login response / 登录响应
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoginResp {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub sub: String,
    #[serde(flatten)]
    pub error: ErrResp,
}

/// Captcha token request / 验证码令牌请求
#[derive(Debug, Clone, Serialize)]
pub struct CaptchaTokenRequest {
    pub action: String,
    pub captcha_token: String,
    pub client_id: String,
    pub device_id: String,
    pub meta: std::collections::HashMap<String, String>,
    pub redirect_uri: String,
}

/// Captcha token response / 验证码令牌响应
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CaptchaTokenResp {
    #[serde(default)]
    pub captcha_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub url: String,
}

/// Upload task response / 上传任务响应
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UploadTaskResp {
    #[serde(default)]
    pub upload_type: String,
    #[serde(default)]
    pub resumable: Option<ResumableInfo>,
    #[serde(default)]
    pub file: PikPakFile,
}

impl UploadTaskResp {
    /// 协商结果：无传输会话段即秒传命中 / Negotiation outcome: a missing
    /// transfer-session section is a dedup hit.
    pub fn decision(self) -> UploadDecision {
        match self.resumable {
            None => UploadDecision::AlreadyStored,
            Some(info) => UploadDecision::TransferRequired(UploadSession {
                provider: info.provider,
                endpoint: info.params.endpoint,
                bucket: info.params.bucket,
                key: info.params.key,
                access_key_id: info.params.access_key_id,
                access_key_secret: info.params.access_key_secret,
                security_token: info.params.security_token,
                resumable: true,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResumableInfo {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub params: S3Params,
    #[serde(default)]
    pub provider: String,
}

/// S3 upload params / S3上传参数
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct S3Params {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub access_key_secret: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub expiration: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub security_token: String,
}

/// Offline task / 离线任务
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OfflineTask {
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub name: String,
    /// PHASE_TYPE_RUNNING / PHASE_TYPE_ERROR / PHASE_TYPE_COMPLETE / PHASE_TYPE_PENDING
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub third_task_id: String,
    #[serde(default, rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub updated_time: String,
    #[serde(default)]
    pub user_id: String,
}

/// Offline task list response / 离线任务列表响应
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OfflineListResp {
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub next_page_token: String,
    #[serde(default)]
    pub tasks: Vec<OfflineTask>,
}

/// Token info (internal state) / 令牌信息(内部状态)
#[derive(Debug, Clone, Default)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub captcha_token: String,
    pub device_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_resumable_section_is_a_dedup_hit() {
        let resp: UploadTaskResp = serde_json::from_str(
            r#"{"upload_type":"UPLOAD_TYPE_UNKNOWN","file":{"id":"f1","kind":"drive#file","name":"a.bin"}}"#,
        )
        .unwrap();
        assert_eq!(resp.decision(), UploadDecision::AlreadyStored);
    }

    #[test]
    fn resumable_section_yields_a_scoped_session() {
        let resp: UploadTaskResp = serde_json::from_str(
            r#"{
                "upload_type": "UPLOAD_TYPE_RESUMABLE",
                "resumable": {
                    "kind": "drive#resumable",
                    "provider": "PROVIDER_ALIYUN",
                    "params": {
                        "access_key_id": "AKID",
                        "access_key_secret": "SECRET",
                        "bucket": "bkt",
                        "endpoint": "bkt.oss-cn-hongkong.aliyuncs.com",
                        "expiration": "2024-06-04T16:30:00Z",
                        "key": "upload/obj",
                        "security_token": "STS"
                    }
                },
                "file": {"id":"f1"}
            }"#,
        )
        .unwrap();

        match resp.decision() {
            UploadDecision::TransferRequired(session) => {
                assert_eq!(session.provider, "PROVIDER_ALIYUN");
                assert_eq!(session.bucket, "bkt");
                assert_eq!(session.key, "upload/obj");
                assert_eq!(session.access_key_id, "AKID");
                assert!(session.resumable);
            }
            other => panic!("expected a transfer session, got {:?}", other),
        }
    }

    #[test]
    fn error_body_detection() {
        let err: ErrResp = serde_json::from_str(
            r#"{"error_code":9,"error":"captcha_invalid","error_description":"captcha token expired"}"#,
        )
        .unwrap();
        assert!(err.is_error());
        assert!(err.error_message().contains("captcha_invalid"));

        let ok: ErrResp = serde_json::from_str(r#"{}"#).unwrap();
        assert!(!ok.is_error());
    }
}
