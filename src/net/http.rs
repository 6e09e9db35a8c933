// ==========================================
// 船期延误追踪系统 - HTTP 客户端
// ==========================================
// 职责: 以浏览器身份发起 GET 请求, 返回响应文本
// 范围: 不做重试, 不做超时策略 (传输层默认), 单请求单挂起点
// ==========================================

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;

// 统一的浏览器身份
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP 错误类型
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("客户端构建失败: {0}")]
    Build(reqwest::Error),

    #[error("请求失败: {0}")]
    Request(#[from] reqwest::Error),

    #[error("非法请求头: {0}")]
    InvalidHeader(String),
}

// ==========================================
// PortalClient - 门户客户端
// ==========================================
// Cookie 随会话自动维护 (同一运行内复用)
pub struct PortalClient {
    inner: reqwest::Client,
}

impl PortalClient {
    pub fn new() -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { inner })
    }

    /// GET 请求, 返回响应体文本
    ///
    /// # 参数
    /// - url: 完整 URL
    /// - extra_headers: 承运人特定的附加请求头 (Referer/Accept 等)
    pub async fn get_text(
        &self,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<String, HttpError> {
        let mut request = self.inner.get(url);
        for (name, value) in extra_headers {
            let name = HeaderName::try_from(*name)
                .map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
            let value = HeaderValue::try_from(*value)
                .map_err(|_| HttpError::InvalidHeader(value.to_string()))?;
            request = request.header(name, value);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
