//! 客户端 IP 提取
//!
//! 配额按客户端地址计数。默认使用 TCP 连接的对端地址；
//! 部署在反向代理之后时开启 `server.xheaders`，改用
//! X-Forwarded-For / X-Real-IP。

use std::net::SocketAddr;

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::debug;

/// 无法确定客户端地址时使用的占位标识
pub const UNKNOWN_CLIENT: &str = "unknown";

/// 从 HttpRequest 提取客户端标识
///
/// `trust_xheaders` 为 true 时优先使用转发头，否则只使用连接 IP（防止伪造）。
pub fn client_identity(req: &HttpRequest, trust_xheaders: bool) -> String {
    if trust_xheaders && let Some(forwarded) = extract_forwarded_ip_from_headers(req.headers()) {
        debug!("Using forwarded client address {}", forwarded);
        return forwarded;
    }

    peer_ip(req.peer_addr()).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn peer_ip(addr: Option<SocketAddr>) -> Option<String> {
    addr.map(|a| a.ip().to_string())
}

/// 从 HeaderMap 提取转发的 IP
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    // 优先 X-Forwarded-For（取第一个，即原始客户端 IP）
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            // 其次 X-Real-IP
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}
