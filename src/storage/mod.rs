use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
pub mod manager;
pub mod paging;
pub mod singleflight;
pub mod stream;

pub use error::{DriverError, Result};
pub use manager::{ConfigSaver, ConfigStore, DriverFactory, MemoryConfigStore, StorageManager};
pub use paging::{Page, PageCursor, PageTurn};
pub use singleflight::SingleFlight;
pub use stream::{compute_part_size, UploadStream};

/// 哈希算法标签 / Hash algorithm tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlg {
    Md5,
    Sha1,
    Sha256,
    /// 迅雷系分块SHA1 / Thunder-style block SHA1
    Gcid,
}

/// 带算法标签的内容哈希 / Algorithm-tagged content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHash {
    pub alg: HashAlg,
    pub value: String,
}

impl ObjectHash {
    pub fn new(alg: HashAlg, value: impl Into<String>) -> Self {
        Self { alg, value: value.into() }
    }
}

/// 规范化文件/目录条目 / Canonical file or folder entry
///
/// `id` 在同一个后端会话内稳定 / `id` is stable within one backend session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub id: String,
    pub name: String,
    /// 字节数，目录恒为0 / Bytes, always 0 for folders
    pub size: i64,
    pub is_folder: bool,
    pub modified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ObjectHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Object {
    /// 构造目录条目 / Build a folder entry
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size: 0,
            is_folder: true,
            modified_at: None,
            created_at: None,
            content_hash: None,
            thumbnail_url: None,
        }
    }

    /// 构造文件条目 / Build a file entry
    pub fn file(id: impl Into<String>, name: impl Into<String>, size: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            is_folder: false,
            modified_at: None,
            created_at: None,
            content_hash: None,
            thumbnail_url: None,
        }
    }

    pub fn with_times(mut self, modified: Option<DateTime<Utc>>, created: Option<DateTime<Utc>>) -> Self {
        self.modified_at = modified;
        self.created_at = created;
        self
    }

    pub fn with_hash(mut self, hash: ObjectHash) -> Self {
        self.content_hash = Some(hash);
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// 临时对象存储上传会话 / Temporary object-store upload session
///
/// 仅在秒传未命中时由建文件响应签发，作用域限于单次传输
/// Issued by the create-file response only when dedup misses; scoped to one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub provider: String,
    pub endpoint: String,
    pub bucket: String,
    pub key: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    pub resumable: bool,
}

/// 上传协商结果 / Upload negotiation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDecision {
    /// 秒传命中，服务端已有同内容 / Dedup hit, content already stored server-side
    AlreadyStored,
    /// 需要向临时对象存储端点传输 / Content must be transferred to the issued endpoint
    TransferRequired(UploadSession),
}

/// Storage driver interface (provides only primitive operations) / 存储驱动接口
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// Initialize credentials; a failure here leaves the instance unusable
    /// 初始化凭据，失败则实例不可用
    async fn init(&self) -> Result<()>;

    /// Root directory entry / 根目录条目
    fn root(&self) -> Object;

    /// List directory contents in server order / 按服务端顺序列出目录内容
    async fn list(&self, dir: &Object) -> Result<Vec<Object>>;

    /// Resolve a direct download link / 解析直链
    async fn link(&self, file: &Object) -> Result<String>;

    /// Create directory / 创建目录
    async fn create_dir(&self, parent: &Object, name: &str) -> Result<()>;

    /// Rename file or directory / 重命名文件或目录
    async fn rename(&self, obj: &Object, new_name: &str) -> Result<()>;

    /// Move file or directory / 移动文件或目录
    async fn move_item(&self, obj: &Object, dst_dir: &Object) -> Result<()>;

    /// Copy file or directory / 复制文件或目录
    async fn copy_item(&self, obj: &Object, dst_dir: &Object) -> Result<()>;

    /// Delete file or directory / 删除文件或目录
    async fn delete(&self, obj: &Object) -> Result<()>;

    /// Upload complete content; drivers negotiate dedup vs transfer themselves
    /// 上传完整内容，驱动自行协商秒传或传输
    async fn put(&self, dst_dir: &Object, stream: &mut UploadStream) -> Result<()>;

    /// Submit a remote URL for offline download / 提交离线下载任务
    async fn offline_download(&self, _url: &str) -> Result<()> {
        Err(DriverError::NotSupported("offline download"))
    }
}
