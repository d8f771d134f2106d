use std::time::Duration;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Pull a named value out of a `Cookie:` request header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k.trim() == name {
            Some(v.trim())
        } else {
            None
        }
    })
}

/// Resolve a bearer token from a request: the named cookie wins, then the
/// `Authorization: Bearer <token>` header. Empty values count as absent.
pub fn extract_bearer_token(
    cookie_header: Option<&str>,
    authorization: Option<&str>,
    cookie_name: &str,
) -> Option<String> {
    if let Some(token) = cookie_header
        .and_then(|h| cookie_value(h, cookie_name))
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }
    authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// `Set-Cookie` value for a session token. HttpOnly + Secure, scoped to the
/// whole site, expiring with the token itself.
pub fn session_cookie(name: &str, value: &str, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        name,
        value,
        max_age.as_secs()
    )
}

/// `Set-Cookie` value that removes a session cookie.
pub fn expired_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let header = "theme=dark; accessToken=abc.def.ghi; lang=en";
        assert_eq!(cookie_value(header, ACCESS_COOKIE), Some("abc.def.ghi"));
        assert_eq!(cookie_value(header, "theme"), Some("dark"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn cookie_takes_precedence_over_header() {
        let token = extract_bearer_token(
            Some("accessToken=from-cookie"),
            Some("Bearer from-header"),
            ACCESS_COOKIE,
        );
        assert_eq!(token.as_deref(), Some("from-cookie"));
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let token = extract_bearer_token(None, Some("Bearer from-header"), ACCESS_COOKIE);
        assert_eq!(token.as_deref(), Some("from-header"));

        let token = extract_bearer_token(
            Some("other=value"),
            Some("Bearer from-header"),
            ACCESS_COOKIE,
        );
        assert_eq!(token.as_deref(), Some("from-header"));
    }

    #[test]
    fn absent_everywhere_is_none() {
        assert_eq!(extract_bearer_token(None, None, ACCESS_COOKIE), None);
        assert_eq!(
            extract_bearer_token(Some("accessToken="), Some("Basic abc"), ACCESS_COOKIE),
            None
        );
    }

    #[test]
    fn session_cookie_attributes() {
        let c = session_cookie(REFRESH_COOKIE, "tok", Duration::from_secs(3600));
        assert!(c.starts_with("refreshToken=tok;"));
        assert!(c.contains("HttpOnly"));
        assert!(c.contains("Secure"));
        assert!(c.contains("Max-Age=3600"));
    }

    #[test]
    fn expired_cookie_clears_value() {
        let c = expired_cookie(ACCESS_COOKIE);
        assert!(c.starts_with("accessToken=;"));
        assert!(c.contains("Max-Age=0"));
    }
}
