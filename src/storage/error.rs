//! 驱动错误分类 / Driver error taxonomy

use thiserror::Error;

pub type Result<T, E = DriverError> = std::result::Result<T, E>;

/// 统一驱动错误 / Unified driver error
///
/// `Api` carries the backend envelope message verbatim.
#[derive(Debug, Error)]
pub enum DriverError {
    /// 登录/刷新被拒或凭据畸形 / Login or refresh rejected, or malformed credential
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 缺少签名所需的密钥材料 / Secret material needed to sign is missing
    #[error("missing signing material: {0}")]
    SigningPrecondition(String),

    /// 响应信封指示失败 / Response envelope indicates failure
    #[error("backend error: {0}")]
    Api(String),

    /// 时间戳或数字字段畸形 / Malformed timestamp or numeric field
    #[error("malformed field: {0}")]
    Parse(String),

    /// 对象存储传输失败或被取消 / Object-store transfer failed or was canceled
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// 401等价失败，触发一次凭据刷新 / 401-equivalent failure that triggers one credential refresh
    pub fn is_auth(&self) -> bool {
        matches!(self, DriverError::Auth(_))
    }
}
