//! PikPak HTTP client / PikPak HTTP客户端
//!
//! 凭据状态(访问/刷新令牌、验证码令牌、设备身份)集中在这里；
//! 刷新走单飞闸，验证码轮换只有一个变更入口，每次轮换恰好回写一次。
//! Credential state (token pair, captcha token, device identity) lives here;
//! refresh goes through the single-flight gate and captcha rotation has one
//! mutation point that persists exactly once per rotation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::storage::{DriverError, Result, SingleFlight};

use super::types::*;
use super::util::*;

/// 凭据回写钩子 / Credential write-back hook
pub type PersistFn = Arc<dyn Fn(&TokenInfo) -> Result<()> + Send + Sync>;

/// Platform type / 平台类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    Android,
    #[default]
    Web,
    Pc,
}

impl Platform {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "android" => Platform::Android,
            "pc" => Platform::Pc,
            _ => Platform::Web,
        }
    }

    pub fn client_id(&self) -> &'static str {
        match self {
            Platform::Android => platform::android::CLIENT_ID,
            Platform::Web => platform::web::CLIENT_ID,
            Platform::Pc => platform::pc::CLIENT_ID,
        }
    }

    pub fn client_secret(&self) -> &'static str {
        match self {
            Platform::Android => platform::android::CLIENT_SECRET,
            Platform::Web => platform::web::CLIENT_SECRET,
            Platform::Pc => platform::pc::CLIENT_SECRET,
        }
    }

    pub fn client_version(&self) -> &'static str {
        match self {
            Platform::Android => platform::android::CLIENT_VERSION,
            Platform::Web => platform::web::CLIENT_VERSION,
            Platform::Pc => platform::pc::CLIENT_VERSION,
        }
    }

    pub fn package_name(&self) -> &'static str {
        match self {
            Platform::Android => platform::android::PACKAGE_NAME,
            Platform::Web => platform::web::PACKAGE_NAME,
            Platform::Pc => platform::pc::PACKAGE_NAME,
        }
    }

    pub fn sdk_version(&self) -> &'static str {
        match self {
            Platform::Android => platform::android::SDK_VERSION,
            Platform::Web => platform::web::SDK_VERSION,
            Platform::Pc => platform::pc::SDK_VERSION,
        }
    }

    pub fn algorithms(&self) -> &'static [&'static str] {
        match self {
            Platform::Android => platform::android::ALGORITHMS,
            Platform::Web => platform::web::ALGORITHMS,
            Platform::Pc => platform::pc::ALGORITHMS,
        }
    }
}

/// PikPak HTTP client / PikPak HTTP客户端
pub struct PikPakClient {
    pub client: Client,
    pub platform: Platform,
    token_info: Arc<RwLock<TokenInfo>>,
    refresh_flight: SingleFlight,
    use_proxy: bool,
    proxy_url: String,
    persist: PersistFn,
}

impl PikPakClient {
    pub fn new(platform: Platform, use_proxy: bool, proxy_url: String, persist: PersistFn) -> Self {
        Self {
            client: Client::builder()
                .cookie_store(true)
                .redirect(reqwest::redirect::Policy::limited(10))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            platform,
            token_info: Arc::new(RwLock::new(TokenInfo::default())),
            refresh_flight: SingleFlight::new(),
            use_proxy,
            proxy_url,
            persist,
        }
    }

    /// Initialize with existing token info / 使用现有令牌信息初始化
    pub fn init_token(&self, device_id: &str, refresh_token: &str, captcha_token: &str) {
        let mut info = self.token_info.write().unwrap();
        info.device_id = if device_id.is_empty() {
            uuid::Uuid::new_v4().to_string().replace('-', "")
        } else {
            device_id.to_string()
        };
        info.refresh_token = refresh_token.to_string();
        info.captcha_token = captcha_token.to_string();
    }

    /// Get current token info / 获取当前令牌信息
    pub fn get_token_info(&self) -> TokenInfo {
        self.token_info.read().unwrap().clone()
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.token_info.read().unwrap().refresh_token.is_empty()
    }

    /// 中转通道：盘API地址改写到代理前缀 / Proxy channel: drive API URLs rewritten onto the proxy prefix
    fn proxied_url(&self, url: &str) -> String {
        if self.use_proxy && !self.proxy_url.is_empty() {
            if let Some(rest) = url.strip_prefix(api::API_HOST) {
                return format!("{}{}", self.proxy_url.trim_end_matches('/'), rest);
            }
        }
        url.to_string()
    }

    /// 下载直链的代理前缀 / Proxy prefix for download links
    pub fn proxied_link(&self, link: String) -> String {
        if !self.use_proxy || self.proxy_url.is_empty() {
            return link;
        }
        if self.proxy_url.ends_with('/') {
            format!("{}{}", self.proxy_url, link)
        } else {
            format!("{}/{}", self.proxy_url, link)
        }
    }

    /// Get user agent based on platform / 根据平台获取用户代理
    pub fn get_user_agent(&self) -> String {
        let info = self.token_info.read().unwrap();
        match self.platform {
            Platform::Android => build_android_user_agent(
                &info.device_id,
                self.platform.client_id(),
                self.platform.package_name(),
                self.platform.sdk_version(),
                self.platform.client_version(),
                self.platform.package_name(),
                &info.user_id,
            ),
            Platform::Web => build_web_user_agent(),
            Platform::Pc => build_pc_user_agent(),
        }
    }

    /// Get captcha sign / 获取验证码签名
    fn get_captcha_sign(&self) -> (i64, String) {
        let device_id = self.token_info.read().unwrap().device_id.clone();
        let timestamp = chrono::Utc::now().timestamp_millis();
        let sign = generate_captcha_sign(
            self.platform.client_id(),
            self.platform.client_version(),
            self.platform.package_name(),
            &device_id,
            timestamp,
            self.platform.algorithms(),
        );
        (timestamp, sign)
    }

    /// 验证码令牌的唯一变更入口：更新内存态并恰好回写一次
    /// The single mutation point for the captcha token: updates the
    /// in-memory state and persists exactly once.
    pub fn set_captcha_token(&self, token: &str) {
        {
            let mut info = self.token_info.write().unwrap();
            info.captcha_token = token.to_string();
        }
        let snapshot = self.get_token_info();
        if let Err(e) = (self.persist)(&snapshot) {
            // 回写失败保留内存令牌，本会话仍然可用 / a failed write keeps the
            // in-memory token, the session stays usable
            tracing::warn!("[pikpak] persisting rotated captcha token failed: {}", e);
        }
    }

    /// Login with username and password / 使用用户名密码登录
    ///
    /// 登录本身不回写凭据；登录路径要等验证码获取成功后才持久化
    /// Login itself does not persist; the login path persists only after
    /// the captcha acquisition succeeds.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(DriverError::Auth("username or password is empty".to_string()));
        }

        let captcha_token = self.token_info.read().unwrap().captcha_token.clone();
        if captcha_token.is_empty() {
            self.refresh_captcha_token_in_login(&get_action("POST", api::LOGIN_URL), username)
                .await?;
        }

        let body = {
            let info = self.token_info.read().unwrap();
            json!({
                "captcha_token": info.captcha_token,
                "client_id": self.platform.client_id(),
                "client_secret": self.platform.client_secret(),
                "username": username,
                "password": password,
            })
        };

        let resp: LoginResp = self
            .client
            .post(api::LOGIN_URL)
            .query(&[("client_id", self.platform.client_id())])
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if resp.error.is_error() {
            return Err(DriverError::Auth(format!("login failed: {}", resp.error.error_message())));
        }

        let mut info = self.token_info.write().unwrap();
        info.access_token = resp.access_token;
        info.refresh_token = resp.refresh_token;
        info.user_id = resp.sub;
        Ok(())
    }

    /// 刷新访问令牌：单飞，成功即回写 / Refresh the access token: single-flight, persisted on success
    pub async fn refresh_token(&self) -> Result<()> {
        self.refresh_flight.run(|| self.do_refresh()).await.map(|_| ())
    }

    async fn do_refresh(&self) -> Result<()> {
        let token = self.token_info.read().unwrap().refresh_token.clone();
        if token.is_empty() {
            return Err(DriverError::Auth("no refresh token".to_string()));
        }

        let body = json!({
            "client_id": self.platform.client_id(),
            "client_secret": self.platform.client_secret(),
            "grant_type": "refresh_token",
            "refresh_token": token,
        });

        let resp: LoginResp = self
            .client
            .post(api::TOKEN_URL)
            .query(&[("client_id", self.platform.client_id())])
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if resp.error.is_error() {
            if resp.error.error_code == 4126 {
                return Err(DriverError::Auth("refresh token invalid".to_string()));
            }
            return Err(DriverError::Auth(format!("refresh failed: {}", resp.error.error_message())));
        }

        {
            let mut info = self.token_info.write().unwrap();
            info.access_token = resp.access_token;
            info.refresh_token = resp.refresh_token;
            info.user_id = resp.sub;
        }
        let snapshot = self.get_token_info();
        (self.persist)(&snapshot)
    }

    /// Refresh captcha token (after login) / 刷新验证码令牌(登录后)
    pub async fn refresh_captcha_token_at_login(&self, action: &str, user_id: &str) -> Result<()> {
        let (timestamp, captcha_sign) = self.get_captcha_sign();
        let mut metas = HashMap::new();
        metas.insert("client_version".to_string(), self.platform.client_version().to_string());
        metas.insert("package_name".to_string(), self.platform.package_name().to_string());
        metas.insert("user_id".to_string(), user_id.to_string());
        metas.insert("timestamp".to_string(), timestamp.to_string());
        metas.insert("captcha_sign".to_string(), captcha_sign);

        self.refresh_captcha_token(action, metas).await
    }

    /// Refresh captcha token (during login) / 刷新验证码令牌(登录时)
    pub async fn refresh_captcha_token_in_login(&self, action: &str, username: &str) -> Result<()> {
        let mut metas = HashMap::new();
        if is_email(username) {
            metas.insert("email".to_string(), username.to_string());
        } else if is_phone_number(username) {
            metas.insert("phone_number".to_string(), username.to_string());
        } else {
            metas.insert("username".to_string(), username.to_string());
        }

        self.refresh_captcha_token(action, metas).await
    }

    async fn refresh_captcha_token(&self, action: &str, metas: HashMap<String, String>) -> Result<()> {
        let req = {
            let info = self.token_info.read().unwrap();
            CaptchaTokenRequest {
                action: action.to_string(),
                captcha_token: info.captcha_token.clone(),
                client_id: self.platform.client_id().to_string(),
                device_id: info.device_id.clone(),
                meta: metas,
                redirect_uri: "xlaccsdk01://xbase.cloud/callback?state=harbor".to_string(),
            }
        };

        let resp: CaptchaTokenResp = self
            .client
            .post(api::CAPTCHA_URL)
            .query(&[("client_id", self.platform.client_id())])
            .json(&req)
            .send()
            .await?
            .json()
            .await?;

        if !resp.url.is_empty() {
            return Err(DriverError::Auth(format!("captcha verification required: {}", resp.url)));
        }

        self.set_captcha_token(&resp.captcha_token);
        Ok(())
    }

    /// Make authenticated request / 发送认证请求
    async fn request<T: DeserializeOwned>(
        &self,
        url: &str,
        method: Method,
        query: Option<Vec<(&str, String)>>,
        body: Option<Value>,
    ) -> Result<T> {
        // 在await之前提取所需状态并释放锁 / take what we need before awaiting, then drop the lock
        let (device_id, captcha_token, access_token) = {
            let info = self.token_info.read().unwrap();
            (info.device_id.clone(), info.captcha_token.clone(), info.access_token.clone())
        };
        let user_agent = self.get_user_agent();

        let mut req = self
            .client
            .request(method, self.proxied_url(url))
            .header("User-Agent", &user_agent)
            .header("X-Device-ID", &device_id)
            .header("X-Captcha-Token", &captcha_token);

        if !access_token.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", access_token));
        }

        if let Some(q) = query {
            req = req.query(&q);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let preview: String = text.chars().take(200).collect();
        tracing::debug!("[pikpak] {} -> {} {}", url, status, preview);

        if let Ok(err) = serde_json::from_str::<ErrResp>(&text) {
            if err.is_error() {
                return Err(match err.error_code {
                    4122 | 4121 | 16 => DriverError::Auth(format!("TOKEN_EXPIRED: {}", err.error_description)),
                    9 => DriverError::Auth(format!("CAPTCHA_EXPIRED: {}", err.error_description)),
                    10 => DriverError::Api(format!("rate limited: {}", err.error_description)),
                    _ => DriverError::Api(err.error_message()),
                });
            }
        }

        serde_json::from_str(&text).map_err(|e| DriverError::Parse(e.to_string()))
    }

    /// 过期则刷新对应凭据并重放一次 / Refresh the matching credential on expiry and replay once
    async fn request_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
        method: Method,
        query: Option<Vec<(&str, String)>>,
        body: Option<Value>,
    ) -> Result<T> {
        match self.request::<T>(url, method.clone(), query.clone(), body.clone()).await {
            Err(DriverError::Auth(msg)) if msg.starts_with("TOKEN_EXPIRED") => {
                self.refresh_token().await?;
                self.request(url, method, query, body).await
            }
            Err(DriverError::Auth(msg)) if msg.starts_with("CAPTCHA_EXPIRED") => {
                let user_id = self.token_info.read().unwrap().user_id.clone();
                self.refresh_captcha_token_at_login(&get_action(method.as_str(), url), &user_id)
                    .await?;
                self.request(url, method, query, body).await
            }
            other => other,
        }
    }

    /// GET request / GET请求
    pub async fn get<T: DeserializeOwned>(&self, url: &str, query: Option<Vec<(&str, String)>>) -> Result<T> {
        self.request_with_retry(url, Method::GET, query, None).await
    }

    /// POST request / POST请求
    pub async fn post<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T> {
        self.request_with_retry(url, Method::POST, None, Some(body)).await
    }

    /// PATCH request / PATCH请求
    pub async fn patch<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T> {
        self.request_with_retry(url, Method::PATCH, None, Some(body)).await
    }

    /// DELETE request / DELETE请求
    pub async fn delete<T: DeserializeOwned>(&self, url: &str, query: Option<Vec<(&str, String)>>) -> Result<T> {
        self.request_with_retry(url, Method::DELETE, query, None).await
    }

    /// Get download URL / 获取下载链接
    pub async fn get_download_url(&self, file_id: &str, disable_media_link: bool) -> Result<String> {
        let usage = if disable_media_link { "FETCH" } else { "CACHE" };
        let query = vec![
            ("_magic", "2021".to_string()),
            ("usage", usage.to_string()),
            ("thumbnail_size", "SIZE_LARGE".to_string()),
        ];

        let url = format!("{}/{}", api::FILES_URL, file_id);
        let resp: PikPakFile = self.get(&url, Some(query)).await?;

        if !disable_media_link {
            if let Some(media) = resp.medias.first() {
                if !media.link.url.is_empty() {
                    tracing::debug!("[pikpak] using media link for {}", file_id);
                    return Ok(media.link.url.clone());
                }
            }
        }

        Ok(resp.web_content_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(use_proxy: bool, proxy_url: &str) -> PikPakClient {
        let persist: PersistFn = Arc::new(|_| Ok(()));
        let client = PikPakClient::new(Platform::Web, use_proxy, proxy_url.to_string(), persist);
        client.init_token("deadbeef", "rt", "ct");
        client
    }

    #[test]
    fn proxy_channel_rewrites_only_drive_urls() {
        let client = test_client(true, "https://relay.example.com/");
        assert_eq!(
            client.proxied_url("https://api-drive.mypikpak.com/drive/v1/files"),
            "https://relay.example.com/drive/v1/files"
        );
        // auth endpoints bypass the proxy channel
        assert_eq!(
            client.proxied_url("https://user.mypikpak.com/v1/auth/token"),
            "https://user.mypikpak.com/v1/auth/token"
        );

        let direct = test_client(false, "https://relay.example.com");
        assert_eq!(
            direct.proxied_url("https://api-drive.mypikpak.com/drive/v1/files"),
            "https://api-drive.mypikpak.com/drive/v1/files"
        );
    }

    #[test]
    fn proxied_link_joins_with_a_single_slash() {
        let client = test_client(true, "https://relay.example.com");
        assert_eq!(
            client.proxied_link("https://dl.host/obj".to_string()),
            "https://relay.example.com/https://dl.host/obj"
        );
        let client = test_client(true, "https://relay.example.com/");
        assert_eq!(
            client.proxied_link("https://dl.host/obj".to_string()),
            "https://relay.example.com/https://dl.host/obj"
        );
        let client = test_client(false, "");
        assert_eq!(client.proxied_link("https://dl.host/obj".to_string()), "https://dl.host/obj");
    }

    #[test]
    fn captcha_rotation_persists_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let writes = Arc::new(AtomicUsize::new(0));
        let writes_in_persist = writes.clone();
        let persist: PersistFn = Arc::new(move |info| {
            writes_in_persist.fetch_add(1, Ordering::SeqCst);
            assert_eq!(info.captcha_token, "fresh");
            Ok(())
        });

        let client = PikPakClient::new(Platform::Web, false, String::new(), persist);
        client.init_token("dev", "rt", "old");
        client.set_captcha_token("fresh");

        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(client.get_token_info().captcha_token, "fresh");
    }

    #[test]
    fn failed_captcha_persist_keeps_the_in_memory_token() {
        let persist: PersistFn = Arc::new(|_| Err(DriverError::Config("store offline".to_string())));
        let client = PikPakClient::new(Platform::Web, false, String::new(), persist);
        client.init_token("dev", "rt", "old");
        client.set_captcha_token("fresh");
        assert_eq!(client.get_token_info().captcha_token, "fresh");
    }

    #[test]
    fn empty_device_id_gets_a_generated_identity() {
        let client = test_client(false, "");
        assert_eq!(client.get_token_info().device_id, "deadbeef");

        let persist: PersistFn = Arc::new(|_| Ok(()));
        let generated = PikPakClient::new(Platform::Web, false, String::new(), persist);
        generated.init_token("", "", "");
        let device_id = generated.get_token_info().device_id;
        assert_eq!(device_id.len(), 32);
        assert!(!device_id.contains('-'));
    }
}
