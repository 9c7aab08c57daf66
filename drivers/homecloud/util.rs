//! 家庭云工具函数 / HomeCloud utility functions
//!
//! 两套互不相关的签名方案，远端逐位校验，必须与线上实现完全一致:
//! Two unrelated signing schemes, validated bit-exact by the remote side:
//! - front API: SHA1正文摘要 + MD5拼接串 / SHA1 body digest + MD5 over a joined string
//! - mcloud API: 定制百分号编码 + 字符排序 + 双MD5 / custom percent encoding + char sort + double MD5

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use rand::Rng;
use sha1::{Digest as Sha1Digest, Sha1};

use crate::storage::DriverError;

/// API端点 / API endpoints
pub mod api {
    pub const FRONT_HOST: &str = "https://homecloud.komect.com/front";
    pub const PERSONAL_HOST: &str = "https://personal-kd-njs.yun.139.com";
    pub const CDN_GATEWAY: &str = "https://cdn.homecloud.komect.com/gateway";
    pub const AUTH_REFRESH_URL: &str = "https://aas.caiyun.feixin.10086.cn:443/tellin/authTokenRefresh.do";
}

/// URL编码(类似JavaScript的encodeURIComponent) / URL encode like JavaScript's encodeURIComponent
pub fn encode_uri_component(s: &str) -> String {
    let encoded = urlencoding::encode(s).to_string();
    encoded
        .replace('+', "%20")
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// mcloud签名 / mcloud signature (Scheme B)
pub fn calc_sign(body: &str, ts: &str, rand_str: &str) -> String {
    let body = encode_uri_component(body);
    let mut chars: Vec<char> = body.chars().collect();
    chars.sort();
    let sorted_body: String = chars.into_iter().collect();
    let body_base64 = BASE64.encode(sorted_body.as_bytes());

    let md5_body = md5_hex(&body_base64);
    let md5_ts_rand = md5_hex(&format!("{}:{}", ts, rand_str));
    let combined = format!("{}{}", md5_body, md5_ts_rand);
    md5_hex(&combined).to_uppercase()
}

/// front签名 / front signature (Scheme A)
///
/// 空正文按"{}"计摘要 / An empty body is digested as "{}".
pub fn sign_front(pathname: &str, body: &str, request_id: &str, authorization: &str, timestamp: &str) -> String {
    let body = if body.is_empty() { "{}" } else { body };
    let body_hash = sha1_hex(body).to_uppercase();
    let enc = format!(
        "{};{};{};Bearer {};{}",
        pathname, body_hash, request_id, authorization, timestamp
    );
    md5_hex(&enc).to_uppercase()
}

/// MD5哈希(十六进制) / MD5 hash (hex)
pub fn md5_hex(data: &str) -> String {
    format!("{:x}", md5::compute(data.as_bytes()))
}

/// SHA1哈希(十六进制) / SHA1 hash (hex)
pub fn sha1_hex(data: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// front时间戳：毫秒，三位小数 / front timestamp: milliseconds with 3 decimal places
pub fn front_timestamp() -> String {
    format!("{:.3}", Utc::now().timestamp_micros() as f64 / 1000.0)
}

/// mcloud时间戳(本地时间) / mcloud timestamp (local time)
pub fn mcloud_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 解析时间字符串(格式: 20060102150405, 东八区) / Parse time string (format: 20060102150405, UTC+8)
pub fn parse_time(t: &str) -> Result<DateTime<Utc>, DriverError> {
    let naive = NaiveDateTime::parse_from_str(t, "%Y%m%d%H%M%S")
        .map_err(|_| DriverError::Parse(format!("bad timestamp: {}", t)))?;
    let cn = FixedOffset::east_opt(8 * 3600).expect("fixed offset");
    cn.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| DriverError::Parse(format!("ambiguous timestamp: {}", t)))
}

/// 解析个人版时间字符串(RFC3339) / Parse personal time string (RFC3339)
pub fn parse_personal_time(t: &str) -> Result<DateTime<Utc>, DriverError> {
    DateTime::parse_from_rfc3339(t)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DriverError::Parse(format!("bad timestamp: {}", t)))
}

/// 生成随机字符串 / Generate random string
pub fn random_string(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Unicode转义 / Unicode escape
pub fn unicode_escape(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        if c.is_ascii() {
            result.push(c);
        } else {
            for u in c.encode_utf16(&mut [0; 2]) {
                result.push_str(&format!("\\u{:04x}", u));
            }
        }
    }
    result
}

/// 解码Authorization取(前缀, 账号, 令牌)三元组 / Decode authorization into its (prefix, account, token) triple
pub fn decode_authorization(auth: &str) -> Result<(String, String, String), DriverError> {
    let decoded = BASE64
        .decode(auth)
        .map_err(|_| DriverError::Auth("authorization is not valid base64".to_string()))?;
    let decoded_str = String::from_utf8(decoded)
        .map_err(|_| DriverError::Auth("authorization is not valid utf-8".to_string()))?;
    let parts: Vec<&str> = decoded_str.split(':').collect();
    if parts.len() >= 3 {
        Ok((parts[0].to_string(), parts[1].to_string(), parts[2].to_string()))
    } else {
        Err(DriverError::Auth("authorization is not a prefix:account:token triple".to_string()))
    }
}

/// 编码Authorization / Encode authorization
pub fn encode_authorization(prefix: &str, account: &str, token: &str) -> String {
    BASE64.encode(format!("{}:{}:{}", prefix, account, token).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex("hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn front_sign_matches_golden_vector() {
        let body = r#"{"fileId":"0"}"#;
        assert_eq!(sha1_hex(body).to_uppercase(), "B39B5E4FA9FDF4A356F5A3CB90E8442AE025D211");

        let sig = sign_front(
            "/storage/getFileInfoList/v1",
            body,
            "aB3dE5fG7hI9",
            "dGVzdDphY2NvdW50OnRva2Vu",
            "1717490400000.000",
        );
        assert_eq!(sig, "59D639C500A50E8038841EF9A7CB37F2");
    }

    #[test]
    fn front_sign_digests_empty_body_as_braces() {
        assert_eq!(sha1_hex("{}").to_uppercase(), "BF21A9E8FBC5A3846FB05B4FA0859E0917B2202F");
        let sig = sign_front("/path", "", "reqid000", "tok", "1000.000");
        assert_eq!(sig, "A0589356720CFDEA875E2C7007E97D22");
    }

    #[test]
    fn mcloud_sign_matches_golden_vector() {
        let sig = calc_sign(r#"{"parentFileId":"root"}"#, "2024-06-04 15:30:00", "0A1b2C3d4E5f6G7h");
        assert_eq!(sig, "40D305AF6055D76D9530049568D05C44");
    }

    #[test]
    fn mcloud_encoding_restores_the_literal_characters() {
        // '+' stays escaped, space becomes %20, and ! ' ( ) * ~ stay literal
        assert_eq!(encode_uri_component("a+b !*()'~"), "a%2Bb%20!*()'~");
        let sig = calc_sign("a+b !*()'~", "2024-01-01 00:00:00", "xxxxyyyyzzzz0000");
        assert_eq!(sig, "225AF5C1B713F0B16B675BBF6D80213F");
    }

    #[test]
    fn parse_time_is_cn_local() {
        let dt = parse_time("20240604153000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 6, 4, 7, 30, 0).unwrap());
        assert!(matches!(parse_time("2024060"), Err(DriverError::Parse(_))));
        assert!(matches!(parse_time("abcdefgh123456"), Err(DriverError::Parse(_))));
    }

    #[test]
    fn parse_personal_time_rejects_malformed_values() {
        let dt = parse_personal_time("2024-06-04T15:30:00.999+08:00").unwrap();
        assert_eq!(dt.timestamp_millis(), Utc.with_ymd_and_hms(2024, 6, 4, 7, 30, 0).unwrap().timestamp_millis() + 999);
        assert!(matches!(parse_personal_time("2024/06/04"), Err(DriverError::Parse(_))));
    }

    #[test]
    fn test_random_string() {
        let s = random_string(16);
        assert_eq!(s.len(), 16);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn authorization_triple_round_trips() {
        let auth = encode_authorization("p", "13800000000", "tok123");
        let (prefix, account, token) = decode_authorization(&auth).unwrap();
        assert_eq!(prefix, "p");
        assert_eq!(account, "13800000000");
        assert_eq!(token, "tok123");

        assert!(matches!(decode_authorization("###"), Err(DriverError::Auth(_))));
        assert!(matches!(
            decode_authorization(&BASE64.encode(b"only:two")),
            Err(DriverError::Auth(_))
        ));
    }

    #[test]
    fn unicode_escape_leaves_ascii_alone() {
        assert_eq!(unicode_escape("abc.txt"), "abc.txt");
        assert_eq!(unicode_escape("文a"), "\\u6587a");
    }

    #[test]
    fn front_timestamp_has_three_decimals() {
        let ts = front_timestamp();
        let dot = ts.find('.').unwrap();
        assert_eq!(ts.len() - dot - 1, 3);
    }
}
