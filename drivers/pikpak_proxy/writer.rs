//! Object-store transfer / 对象存储传输
//!
//! 秒传未命中时，用建文件响应签发的临时凭据把已缓冲的内容传到对象存储：
//! 小内容单次PUT，大内容走init/part/complete分片流程。传输自身绝不重试，
//! 失败时尽力中止已开启的分片任务；取消由调用方丢弃future完成。
//! When dedup misses, the buffered content is transferred with the temporary
//! credentials issued by the create-file response: one PUT for small content,
//! init/part/complete multipart otherwise. The transfer never retries; on
//! failure it best-effort aborts an opened multipart task. Cancellation is
//! the caller dropping the future.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha1::Sha1;

use crate::storage::{compute_part_size, DriverError, Result, UploadSession, UploadStream};

const OSS_SECURITY_TOKEN_HEADER: &str = "x-oss-security-token";
const OSS_USER_AGENT: &str = "aliyun-sdk-android/2.9.13(Linux/Android 14/M2004j7ac;UKQ1.231108.001)";

/// 对象存储分片约束 / Object-store part constraints
pub const MAX_UPLOAD_PARTS: i64 = 10_000;
pub const DEFAULT_UPLOAD_PART_SIZE: i64 = 5 * 1024 * 1024;

type HmacSha1 = Hmac<Sha1>;

/// 端点首段是桶前缀，构造URL前去掉 / The endpoint's first label is the bucket
/// prefix; strip it before building URLs.
fn strip_endpoint_label(endpoint: &str) -> String {
    match endpoint.split_once('.') {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => endpoint.to_string(),
    }
}

/// Uploaded part info / 已上传分片信息
#[derive(Debug, Clone)]
struct UploadedPart {
    part_number: i64,
    etag: String,
}

/// 单次传输的执行器，凭据作用域限于这一次 / Executor for one transfer; the
/// credentials are scoped to exactly this transfer.
pub struct ObjectStoreTransfer {
    session: UploadSession,
    endpoint: String,
    client: Client,
}

impl ObjectStoreTransfer {
    pub fn new(session: UploadSession) -> Self {
        let endpoint = strip_endpoint_label(&session.endpoint);
        Self {
            session,
            endpoint,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
        }
    }

    /// 执行传输 / Execute the transfer
    pub async fn upload(&self, stream: &mut UploadStream) -> Result<()> {
        let size = stream.size();
        let part_size = compute_part_size(size, MAX_UPLOAD_PARTS, DEFAULT_UPLOAD_PART_SIZE);

        if size <= part_size {
            let data = stream.chunk(0, size).await?;
            return self.upload_single(data).await;
        }

        let upload_id = self.init_multipart().await?;
        match self.upload_parts(stream, part_size, &upload_id).await {
            Ok(parts) => self.complete_multipart(&upload_id, &parts).await,
            Err(e) => {
                let _ = self.abort_multipart(&upload_id).await;
                Err(e)
            }
        }
    }

    fn build_url(&self) -> String {
        format!("https://{}.{}/{}", self.session.bucket, self.endpoint, self.session.key)
    }

    /// 临时凭据签名 / Temporary-credential request signature
    fn sign_request(&self, method: &str, content_type: &str, date: &str, resource: &str) -> String {
        let canonicalized_headers = format!("{}:{}", OSS_SECURITY_TOKEN_HEADER, self.session.security_token);
        let string_to_sign = format!(
            "{}\n\n{}\n{}\n{}\n/{}{}",
            method, content_type, date, canonicalized_headers, self.session.bucket, resource
        );

        let mut mac = HmacSha1::new_from_slice(self.session.access_key_secret.as_bytes())
            .expect("HMAC accepts any key size");
        mac.update(string_to_sign.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn gmt_date() -> String {
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    /// Upload in one request / 单次请求上传
    async fn upload_single(&self, data: Bytes) -> Result<()> {
        let url = self.build_url();
        let date = Self::gmt_date();
        let content_type = "application/octet-stream";
        let resource = format!("/{}", self.session.key);
        let signature = self.sign_request("PUT", content_type, &date, &resource);
        let auth = format!("OSS {}:{}", self.session.access_key_id, signature);

        let resp = self
            .client
            .put(&url)
            .header("User-Agent", OSS_USER_AGENT)
            .header("Date", &date)
            .header("Authorization", &auth)
            .header(OSS_SECURITY_TOKEN_HEADER, &self.session.security_token)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| DriverError::Transfer(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DriverError::Transfer(format!("upload failed: {} - {}", status, text)));
        }
        Ok(())
    }

    /// Initialize multipart upload / 初始化分片上传
    async fn init_multipart(&self) -> Result<String> {
        let url = format!("{}?uploads", self.build_url());
        let date = Self::gmt_date();
        let resource = format!("/{}?uploads", self.session.key);
        let signature = self.sign_request("POST", "", &date, &resource);
        let auth = format!("OSS {}:{}", self.session.access_key_id, signature);

        let resp = self
            .client
            .post(&url)
            .header("User-Agent", OSS_USER_AGENT)
            .header("Date", &date)
            .header("Authorization", &auth)
            .header(OSS_SECURITY_TOKEN_HEADER, &self.session.security_token)
            .send()
            .await
            .map_err(|e| DriverError::Transfer(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DriverError::Transfer(format!("init multipart failed: {} - {}", status, text)));
        }

        let text = resp.text().await.map_err(|e| DriverError::Transfer(e.to_string()))?;
        if let Some(start) = text.find("<UploadId>") {
            if let Some(end) = text.find("</UploadId>") {
                return Ok(text[start + 10..end].to_string());
            }
        }
        Err(DriverError::Transfer(format!("no UploadId in response: {}", text)))
    }

    async fn upload_parts(
        &self,
        stream: &mut UploadStream,
        part_size: i64,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>> {
        let size = stream.size();
        let mut parts = Vec::new();
        let mut part_number = 1i64;
        let mut offset = 0i64;

        while offset < size {
            let data = stream.chunk(offset, part_size).await?;
            offset += data.len() as i64;
            parts.push(self.upload_part(part_number, upload_id, data).await?);
            part_number += 1;
        }

        Ok(parts)
    }

    /// Upload a part / 上传一个分片
    async fn upload_part(&self, part_number: i64, upload_id: &str, data: Bytes) -> Result<UploadedPart> {
        let url = format!("{}?partNumber={}&uploadId={}", self.build_url(), part_number, upload_id);
        let date = Self::gmt_date();
        let content_type = "application/octet-stream";
        let resource = format!("/{}?partNumber={}&uploadId={}", self.session.key, part_number, upload_id);
        let signature = self.sign_request("PUT", content_type, &date, &resource);
        let auth = format!("OSS {}:{}", self.session.access_key_id, signature);

        let resp = self
            .client
            .put(&url)
            .header("User-Agent", OSS_USER_AGENT)
            .header("Date", &date)
            .header("Authorization", &auth)
            .header(OSS_SECURITY_TOKEN_HEADER, &self.session.security_token)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| DriverError::Transfer(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DriverError::Transfer(format!(
                "part {} upload failed: {} - {}",
                part_number, status, text
            )));
        }

        let etag = resp
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .trim_matches('"')
            .to_string();

        Ok(UploadedPart { part_number, etag })
    }

    /// Complete multipart upload / 完成分片上传
    async fn complete_multipart(&self, upload_id: &str, parts: &[UploadedPart]) -> Result<()> {
        let url = format!("{}?uploadId={}", self.build_url(), upload_id);
        let date = Self::gmt_date();
        let content_type = "application/xml";
        let resource = format!("/{}?uploadId={}", self.session.key, upload_id);
        let signature = self.sign_request("POST", content_type, &date, &resource);
        let auth = format!("OSS {}:{}", self.session.access_key_id, signature);

        let mut xml = String::from("<CompleteMultipartUpload>");
        for part in parts {
            xml.push_str(&format!(
                "<Part><PartNumber>{}</PartNumber><ETag>{}</ETag></Part>",
                part.part_number, part.etag
            ));
        }
        xml.push_str("</CompleteMultipartUpload>");

        let resp = self
            .client
            .post(&url)
            .header("User-Agent", OSS_USER_AGENT)
            .header("Date", &date)
            .header("Authorization", &auth)
            .header(OSS_SECURITY_TOKEN_HEADER, &self.session.security_token)
            .header("Content-Type", content_type)
            .body(xml)
            .send()
            .await
            .map_err(|e| DriverError::Transfer(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DriverError::Transfer(format!("complete multipart failed: {} - {}", status, text)));
        }
        Ok(())
    }

    /// Abort multipart upload / 中止分片上传
    async fn abort_multipart(&self, upload_id: &str) -> Result<()> {
        let url = format!("{}?uploadId={}", self.build_url(), upload_id);
        let date = Self::gmt_date();
        let resource = format!("/{}?uploadId={}", self.session.key, upload_id);
        let signature = self.sign_request("DELETE", "", &date, &resource);
        let auth = format!("OSS {}:{}", self.session.access_key_id, signature);

        let _ = self
            .client
            .delete(&url)
            .header("User-Agent", OSS_USER_AGENT)
            .header("Date", &date)
            .header("Authorization", &auth)
            .header(OSS_SECURITY_TOKEN_HEADER, &self.session.security_token)
            .send()
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> UploadSession {
        UploadSession {
            provider: "PROVIDER_ALIYUN".to_string(),
            endpoint: "bkt.oss-cn-hongkong.aliyuncs.com".to_string(),
            bucket: "bkt".to_string(),
            key: "upload/obj".to_string(),
            access_key_id: "AKID".to_string(),
            access_key_secret: "SECRET".to_string(),
            security_token: "STS".to_string(),
            resumable: true,
        }
    }

    #[test]
    fn endpoint_drops_its_bucket_label() {
        assert_eq!(
            strip_endpoint_label("bkt.oss-cn-hongkong.aliyuncs.com"),
            "oss-cn-hongkong.aliyuncs.com"
        );
        assert_eq!(strip_endpoint_label("plain-host"), "plain-host");
    }

    #[test]
    fn transfer_url_targets_the_bucket_host() {
        let transfer = ObjectStoreTransfer::new(test_session());
        assert_eq!(transfer.build_url(), "https://bkt.oss-cn-hongkong.aliyuncs.com/upload/obj");
    }

    #[test]
    fn request_signature_matches_golden_vector() {
        let transfer = ObjectStoreTransfer::new(test_session());
        let signature = transfer.sign_request(
            "PUT",
            "application/octet-stream",
            "Tue, 04 Jun 2024 08:00:00 GMT",
            "/upload/obj",
        );
        assert_eq!(signature, "2QLOZtRnjFR5pg/DgkkG/lVQdqc=");
    }

    #[test]
    fn part_size_respects_the_part_count_cap() {
        // below the threshold the default applies
        assert_eq!(
            compute_part_size(100, MAX_UPLOAD_PARTS, DEFAULT_UPLOAD_PART_SIZE),
            DEFAULT_UPLOAD_PART_SIZE
        );
        // above it, size / (max_parts - 1)
        let size = MAX_UPLOAD_PARTS * DEFAULT_UPLOAD_PART_SIZE + 7;
        assert_eq!(
            compute_part_size(size, MAX_UPLOAD_PARTS, DEFAULT_UPLOAD_PART_SIZE),
            size / (MAX_UPLOAD_PARTS - 1)
        );
    }
}
