use reqwest::Url;
use std::net::IpAddr;

/// True when the backend URL points at this machine: `localhost`, a loopback
/// address, or the unspecified address a dev server binds to.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    match host.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => host.eq_ignore_ascii_case("localhost"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_URL;

    #[test]
    fn test_default_backend_is_local() {
        assert!(is_local_endpoint_url(DEFAULT_API_URL));
        assert!(is_local_endpoint_url(
            " http://LOCALHOST:8000/ask/stream?query=top%2010 "
        ));
    }

    #[test]
    fn test_loopback_hosts_are_local() {
        assert!(is_local_endpoint_url("http://127.0.0.1:8000/ask/stream"));
        assert!(is_local_endpoint_url("http://[::1]:8000"));
        assert!(is_local_endpoint_url("http://0.0.0.0:8000"));
    }

    #[test]
    fn test_remote_and_lookalike_hosts_are_not_local() {
        assert!(!is_local_endpoint_url("https://sql.example.com/ask/stream"));
        assert!(!is_local_endpoint_url("https://localhost.sql.example.com"));
        assert!(!is_local_endpoint_url("smartsql backend"));
    }
}
