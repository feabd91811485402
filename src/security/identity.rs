//! Client identification for rate limiting.
//!
//! # Responsibilities
//! - Extract what a limiter may key on (IP, session cookie, user agent,
//!   authenticated identity) from a request
//! - Turn that into an identifier string for the selected mode
//!
//! # Design Decisions
//! - Forwarded-for headers are ignored unless explicitly trusted
//! - Every mode has a fallback, so every request gets an identifier

use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{header, HeaderMap, Request},
};
use serde::{Deserialize, Serialize};

/// Cookie carrying the session used by [`IdentifierMode::IpAndSession`].
pub const SESSION_COOKIE: &str = "session_id";

/// How a limiter tells clients apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum IdentifierMode {
    /// Client IP address.
    #[default]
    #[serde(rename = "ip")]
    IpOnly,
    /// `IP:session`, or `IP:user-agent` without a session cookie. Separates
    /// clients sharing one egress IP (LAN, NAT).
    #[serde(rename = "ip_session")]
    IpAndSession,
    /// Authenticated identity, or IP for anonymous requests.
    #[serde(rename = "user")]
    UserBased,
}

/// Authenticated identity attached to the request by an auth layer that runs
/// before the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// The identifier a limiter charged the request to. Inserted into request
/// extensions for downstream logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

/// Request attributes visible to identification strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub user: Option<String>,
}

impl ClientInfo {
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Collect client attributes from a request.
    pub fn from_request<B>(request: &Request<B>, trust_forwarded_headers: bool) -> Self {
        let headers = request.headers();

        let forwarded = if trust_forwarded_headers {
            forwarded_ip(headers)
        } else {
            None
        };

        let ip = forwarded
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            ip,
            session_id: cookie_value(headers, SESSION_COOKIE),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            user: request
                .extensions()
                .get::<AuthenticatedUser>()
                .map(|u| u.0.clone()),
        }
    }

    /// Identifier for this client under `mode`.
    pub fn identifier(&self, mode: IdentifierMode) -> String {
        match mode {
            IdentifierMode::IpOnly => self.ip.clone(),
            IdentifierMode::IpAndSession => match &self.session_id {
                Some(session) => format!("{}:{}", self.ip, session),
                None => format!("{}:{}", self.ip, self.user_agent.as_deref().unwrap_or_default()),
            },
            IdentifierMode::UserBased => self.user.clone().unwrap_or_else(|| self.ip.clone()),
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .map(str::to_string)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/")
    }

    #[test]
    fn test_ip_from_connect_info() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.0.0.7:51234".parse::<SocketAddr>().unwrap()));
        let info = ClientInfo::from_request(&req, false);
        assert_eq!(info.ip, "10.0.0.7");
        assert_eq!(info.identifier(IdentifierMode::IpOnly), "10.0.0.7");
    }

    #[test]
    fn test_forwarded_headers_only_when_trusted() {
        let mut req = request()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.0.0.1:80".parse::<SocketAddr>().unwrap()));

        assert_eq!(ClientInfo::from_request(&req, false).ip, "10.0.0.1");
        assert_eq!(ClientInfo::from_request(&req, true).ip, "203.0.113.9");

        let req = request().header("X-Real-IP", "198.51.100.4").body(Body::empty()).unwrap();
        assert_eq!(ClientInfo::from_request(&req, true).ip, "198.51.100.4");
    }

    #[test]
    fn test_missing_connect_info() {
        let req = request().body(Body::empty()).unwrap();
        assert_eq!(ClientInfo::from_request(&req, false).ip, "unknown");
    }

    #[test]
    fn test_session_cookie_parsed() {
        let req = request()
            .header("Cookie", "theme=dark; session_id=abc123; other=1")
            .header("User-Agent", "curl/8.0")
            .body(Body::empty())
            .unwrap();
        let info = ClientInfo::from_request(&req, false);
        assert_eq!(info.session_id.as_deref(), Some("abc123"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_ip_and_session_fallbacks() {
        let base = ClientInfo::from_ip("1.2.3.4").with_user_agent("Firefox");
        assert_eq!(base.identifier(IdentifierMode::IpAndSession), "1.2.3.4:Firefox");

        let with_session = base.clone().with_session("s-1");
        assert_eq!(with_session.identifier(IdentifierMode::IpAndSession), "1.2.3.4:s-1");

        let bare = ClientInfo::from_ip("1.2.3.4");
        assert_eq!(bare.identifier(IdentifierMode::IpAndSession), "1.2.3.4:");
    }

    #[test]
    fn test_user_based_falls_back_to_ip() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("5.6.7.8:1000".parse::<SocketAddr>().unwrap()));
        assert_eq!(
            ClientInfo::from_request(&req, false).identifier(IdentifierMode::UserBased),
            "5.6.7.8"
        );

        req.extensions_mut().insert(AuthenticatedUser("user-42".into()));
        assert_eq!(
            ClientInfo::from_request(&req, false).identifier(IdentifierMode::UserBased),
            "user-42"
        );
    }
}
