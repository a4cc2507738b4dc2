//! IPv4 地址编解码
//!
//! 将点分十进制文本（或主机名解析结果）转换为 32 位大端整数键。
//! IPv6 不在支持范围内。

use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::errors::{GeoError, Result};
use crate::services::resolver::HostResolver;

/// 地址或主机名的最大长度
pub const MAX_INPUT_LEN: usize = 256;

/// Parse strict dotted-decimal IPv4 text into its big-endian `u32` key.
///
/// Exactly four decimal octets in `0..=255`, no surrounding whitespace and
/// no trailing characters. Returns `None` for anything else.
pub fn parse_literal(text: &str) -> Option<u32> {
    text.parse::<Ipv4Addr>().ok().map(u32::from)
}

/// Format a key back into dotted-decimal text.
pub fn format(key: u32) -> String {
    Ipv4Addr::from(key).to_string()
}

/// Resolve user input to `(canonical_text, key)`.
///
/// Empty input falls back to `remote_fallback` (the caller's own address).
/// Anything that is not a literal is handed to `resolver` and the answer is
/// parsed again; every failure along the way is reported as invalid input.
pub async fn resolve(
    input: &str,
    remote_fallback: &str,
    resolver: &dyn HostResolver,
) -> Result<(String, u32)> {
    let address = if input.is_empty() {
        remote_fallback
    } else {
        input
    };

    if address.is_empty() {
        return Err(GeoError::invalid_input("empty address"));
    }
    if address.len() > MAX_INPUT_LEN {
        return Err(GeoError::invalid_input(format!(
            "address longer than {} characters",
            MAX_INPUT_LEN
        )));
    }

    if let Some(key) = parse_literal(address) {
        trace!("Parsed literal address {}", address);
        return Ok((address.to_string(), key));
    }

    let resolved = match resolver.resolve(address).await {
        Ok(literal) => literal,
        Err(e) => {
            debug!("Hostname resolution failed for '{}': {}", address, e);
            return Err(GeoError::invalid_input(format!(
                "cannot resolve '{}'",
                address
            )));
        }
    };

    match parse_literal(&resolved) {
        Some(key) => {
            trace!("Resolved {} -> {}", address, resolved);
            Ok((resolved, key))
        }
        None => Err(GeoError::invalid_input(format!(
            "'{}' resolved to non-IPv4 address '{}'",
            address, resolved
        ))),
    }
}
