//! 家庭云数据类型定义 / HomeCloud data types

use serde::{Deserialize, Serialize};

/// 反序列化null为空字符串
fn deserialize_null_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 反序列化null为0
fn deserialize_null_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<i64>::deserialize(deserializer)?;
    Ok(opt.unwrap_or(0))
}

/// 反序列化null为false
fn deserialize_null_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<bool>::deserialize(deserializer)?;
    Ok(opt.unwrap_or(false))
}

/// 反序列化null为空Vec
fn deserialize_null_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// 账号模式 / Account mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloudType {
    /// 个人云(新版hcy API, 游标分页) / Personal cloud (new hcy API, cursor paging)
    #[default]
    PersonalNew,
    /// 个人云(旧版front API, 偏移分页) / Personal cloud (legacy front API, offset paging)
    Personal,
    /// 家庭云(front API, 页码分页) / Family cloud (front API, page-number paging)
    Family,
}

impl CloudType {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "personal" => CloudType::Personal,
            "family" => CloudType::Family,
            _ => CloudType::PersonalNew,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            CloudType::PersonalNew => "personal_new",
            CloudType::Personal => "personal",
            CloudType::Family => "family",
        }
    }

    /// mcloud服务类型区分符 / mcloud service-type discriminator
    pub fn svc_type(&self) -> &'static str {
        match self {
            CloudType::Family => "2",
            _ => "1",
        }
    }
}

/// front响应信封 / front response envelope
///
/// ret != 200 即应用层失败 / ret != 200 is an application-level failure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FrontResp {
    #[serde(default)]
    pub ret: i64,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub reason: String,
}

/// mcloud响应信封 / mcloud response envelope
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BaseResp {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub code: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub message: String,
}

/// 目录信息 / Catalog info
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default, rename = "catalogID")]
    pub catalog_id: String,
    #[serde(default)]
    pub catalog_name: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub create_time: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub update_time: String,
}

/// 文件内容信息 / Content info
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, rename = "contentID")]
    pub content_id: String,
    #[serde(default)]
    pub content_name: String,
    #[serde(default, deserialize_with = "deserialize_null_i64")]
    pub content_size: i64,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub create_time: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub update_time: String,
    #[serde(default, rename = "thumbnailURL", deserialize_with = "deserialize_null_string")]
    pub thumbnail_url: String,
    /// MD5摘要 / MD5 digest
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub digest: String,
}

/// 获取磁盘结果 / Get disk result
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetDiskResult {
    #[serde(default, deserialize_with = "deserialize_null_i64")]
    pub node_count: i64,
    #[serde(default, deserialize_with = "deserialize_null_vec")]
    pub catalog_list: Vec<Catalog>,
    #[serde(default, deserialize_with = "deserialize_null_vec")]
    pub content_list: Vec<Content>,
}

/// 获取磁盘响应数据 / Get disk response data
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetDiskData {
    #[serde(default)]
    pub get_disk_result: GetDiskResult,
}

/// 获取磁盘响应 / Get disk response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GetDiskResp {
    #[serde(flatten)]
    pub envelope: FrontResp,
    #[serde(default)]
    pub data: GetDiskData,
}

/// 家庭版文件信息 / Family file info
///
/// size与总数均为数字字符串，畸形值让整次列举失败
/// size and the total count are numeric strings; malformed values fail the whole listing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FamilyFileInfo {
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub size: String,
    /// 1表示目录 / 1 means folder
    #[serde(default, rename = "type", deserialize_with = "deserialize_null_i64")]
    pub file_type: i64,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub create_time: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub update_time: String,
}

/// 家庭版列表响应数据 / Family list response data
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoListData {
    #[serde(default, deserialize_with = "deserialize_null_vec")]
    pub file_infos: Vec<FamilyFileInfo>,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub total: String,
}

/// 家庭版列表响应 / Family list response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileInfoListResp {
    #[serde(flatten)]
    pub envelope: FrontResp,
    #[serde(default)]
    pub data: FileInfoListData,
}

/// 下载URL数据 / Download URL data
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlData {
    #[serde(default, rename = "downloadUrl", deserialize_with = "deserialize_null_string")]
    pub download_url: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub cdn_url: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub url: String,
}

/// front下载URL响应 / front download URL response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FrontDownloadUrlResp {
    #[serde(flatten)]
    pub envelope: FrontResp,
    #[serde(default)]
    pub data: DownloadUrlData,
}

/// mcloud下载URL响应 / mcloud download URL response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PersonalDownloadUrlResp {
    #[serde(flatten)]
    pub envelope: BaseResp,
    #[serde(default)]
    pub data: DownloadUrlData,
}

/// 个人版文件缩略图 / Personal file thumbnail
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PersonalThumbnail {
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub style: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub url: String,
}

/// 个人版文件项 / Personal file item
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersonalFileItem {
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub file_id: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_i64")]
    pub size: i64,
    #[serde(default, rename = "type", deserialize_with = "deserialize_null_string")]
    pub file_type: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub updated_at: String,
    #[serde(default, rename = "thumbnailUrls", deserialize_with = "deserialize_null_vec")]
    pub thumbnails: Vec<PersonalThumbnail>,
}

impl PersonalFileItem {
    pub fn is_folder(&self) -> bool {
        self.file_type == "folder"
    }
}

/// 个人版列表响应数据 / Personal list response data
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersonalListData {
    #[serde(default, deserialize_with = "deserialize_null_vec")]
    pub items: Vec<PersonalFileItem>,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub next_page_cursor: String,
}

/// 个人版列表响应 / Personal list response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PersonalListResp {
    #[serde(flatten)]
    pub envelope: BaseResp,
    #[serde(default)]
    pub data: PersonalListData,
}

/// 并行哈希上下文 / Parallel hash context
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParallelHashCtx {
    #[serde(default)]
    pub part_offset: i64,
}

/// 分片信息(请求用) / Part info for request
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartInfo {
    #[serde(default)]
    pub part_number: i64,
    #[serde(default)]
    pub part_size: i64,
    #[serde(default)]
    pub parallel_hash_ctx: ParallelHashCtx,
}

/// 个人版分片信息(响应用) / Personal part info in responses
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersonalPartInfo {
    #[serde(default, deserialize_with = "deserialize_null_i64")]
    pub part_number: i64,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub upload_url: String,
}

/// 个人版上传响应数据 / Personal upload response data
///
/// exist/rapidUpload 任一为真即秒传命中 / Either exist or rapidUpload marks a dedup hit.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersonalUploadData {
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub file_id: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub file_name: String,
    #[serde(default, deserialize_with = "deserialize_null_vec")]
    pub part_infos: Vec<PersonalPartInfo>,
    #[serde(default, deserialize_with = "deserialize_null_bool")]
    pub exist: bool,
    #[serde(default, deserialize_with = "deserialize_null_bool")]
    pub rapid_upload: bool,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub upload_id: String,
}

impl PersonalUploadData {
    pub fn is_dedup_hit(&self) -> bool {
        self.exist || self.rapid_upload
    }
}

/// 个人版上传响应 / Personal upload response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PersonalUploadResp {
    #[serde(flatten)]
    pub envelope: BaseResp,
    #[serde(default)]
    pub data: PersonalUploadData,
}

/// 结果信息 / Result info
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResultInfo {
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub result_code: String,
    #[serde(default)]
    pub result_desc: Option<String>,
}

/// 旧版上传结果 / Legacy upload result
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    #[serde(default, rename = "uploadTaskID")]
    pub upload_task_id: String,
    #[serde(default, deserialize_with = "deserialize_null_string")]
    pub redirection_url: String,
}

/// 旧版上传响应数据 / Legacy upload response data
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    #[serde(default)]
    pub result: ResultInfo,
    #[serde(default)]
    pub upload_result: UploadResult,
}

/// 旧版上传响应 / Legacy upload response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UploadResp {
    #[serde(flatten)]
    pub envelope: FrontResp,
    #[serde(default)]
    pub data: UploadData,
}

/// 刷新令牌响应(XML) / Refresh token response (XML)
#[derive(Debug, Clone, Default)]
pub struct RefreshTokenResp {
    pub return_code: String,
    pub token: String,
    pub desc: String,
}

impl RefreshTokenResp {
    pub fn from_xml(xml: &str) -> Self {
        Self {
            return_code: extract_xml_value(xml, "return").unwrap_or_default(),
            token: extract_xml_value(xml, "token").unwrap_or_default(),
            desc: extract_xml_value(xml, "desc").unwrap_or_default(),
        }
    }
}

/// 从XML中提取值 / Extract value from XML
pub fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}>", tag);
    let end_tag = format!("</{}>", tag);
    if let Some(start) = xml.find(&start_tag) {
        if let Some(end) = xml.find(&end_tag) {
            let value_start = start + start_tag.len();
            if value_start < end {
                return Some(xml[value_start..end].to_string());
            }
        }
    }
    None
}

/// 令牌信息 / Token info
#[derive(Debug, Clone, Default)]
pub struct TokenInfo {
    pub authorization: String,
    pub account: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_envelope_detects_failure() {
        let resp: GetDiskResp =
            serde_json::from_str(r#"{"ret":401,"reason":"token expired","data":{}}"#).unwrap();
        assert_eq!(resp.envelope.ret, 401);
        assert_eq!(resp.envelope.reason, "token expired");

        let ok: GetDiskResp = serde_json::from_str(
            r#"{"ret":200,"reason":"","data":{"getDiskResult":{"nodeCount":1,"catalogList":null,"contentList":[{"contentID":"c1","contentName":"a.jpg","contentSize":10,"digest":"D41D8CD98F00B204E9800998ECF8427E","updateTime":"20240604153000","createTime":"20240604153000","thumbnailURL":"https://thumb/1"}]}}}"#,
        )
        .unwrap();
        assert_eq!(ok.envelope.ret, 200);
        assert!(ok.data.get_disk_result.catalog_list.is_empty());
        assert_eq!(ok.data.get_disk_result.content_list[0].content_id, "c1");
    }

    #[test]
    fn mcloud_envelope_and_null_fields() {
        let resp: PersonalUploadResp = serde_json::from_str(
            r#"{"success":true,"code":"0","message":"ok","data":{"fileId":"f1","partInfos":null,"exist":null,"rapidUpload":true,"uploadId":null}}"#,
        )
        .unwrap();
        assert!(resp.envelope.success);
        assert!(resp.data.is_dedup_hit());
        assert!(resp.data.part_infos.is_empty());

        let fail: PersonalListResp =
            serde_json::from_str(r#"{"success":false,"message":"no auth"}"#).unwrap();
        assert!(!fail.envelope.success);
        assert_eq!(fail.envelope.message, "no auth");
    }

    #[test]
    fn refresh_token_xml_round_trip() {
        let xml = "<root><return>0</return><token>newtok</token><desc>ok</desc></root>";
        let resp = RefreshTokenResp::from_xml(xml);
        assert_eq!(resp.return_code, "0");
        assert_eq!(resp.token, "newtok");

        let bad = RefreshTokenResp::from_xml("<root><return>1</return><desc>expired</desc></root>");
        assert_eq!(bad.return_code, "1");
        assert!(bad.token.is_empty());
        assert_eq!(bad.desc, "expired");
    }

    #[test]
    fn cloud_type_parsing() {
        assert_eq!(CloudType::from_str("family"), CloudType::Family);
        assert_eq!(CloudType::from_str("personal"), CloudType::Personal);
        assert_eq!(CloudType::from_str("anything"), CloudType::PersonalNew);
        assert_eq!(CloudType::Family.svc_type(), "2");
        assert_eq!(CloudType::PersonalNew.svc_type(), "1");
    }
}
