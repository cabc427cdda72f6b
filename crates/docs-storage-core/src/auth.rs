use reqwest::{RequestBuilder, Url};

/// Capability that injects credentials into storage requests.
///
/// Credentials are issued elsewhere; backends only consume this.
pub trait Authorization: Send + Sync {
    /// Add credentials carried in the URI (e.g. a query parameter).
    fn authorize_uri(&self, uri: &mut Url);

    /// Add credentials carried in request headers.
    fn authorize_request(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Access credentials handed over by the WOPI host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessToken {
    #[default]
    None,
    /// Sent as the `access_token` query parameter.
    Token(String),
    /// Raw header lines (`Name: value`, CRLF separated); a bare value is
    /// sent as the `Authorization` header.
    Header(String),
}

impl AccessToken {
    fn header_pairs(data: &str) -> Vec<(String, String)> {
        if !data.contains(':') {
            return vec![("Authorization".to_string(), data.trim().to_string())];
        }
        data.split("\r\n")
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }
}

impl Authorization for AccessToken {
    fn authorize_uri(&self, uri: &mut Url) {
        if let AccessToken::Token(token) = self {
            // Replace any token already present rather than sending two.
            let kept: Vec<(String, String)> = uri
                .query_pairs()
                .filter(|(k, _)| k != "access_token")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            let mut pairs = uri.query_pairs_mut();
            pairs.clear();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("access_token", token);
        }
    }

    fn authorize_request(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let AccessToken::Header(data) = self {
            for (name, value) in Self::header_pairs(data) {
                request = request.header(name, value);
            }
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_added_to_query() {
        let mut uri = Url::parse("https://wopi.example.org/wopi/files/1?permission=edit").unwrap();
        AccessToken::Token("abc".to_string()).authorize_uri(&mut uri);
        assert_eq!(
            uri.as_str(),
            "https://wopi.example.org/wopi/files/1?permission=edit&access_token=abc"
        );
    }

    #[test]
    fn test_token_replaces_existing() {
        let mut uri = Url::parse("https://wopi.example.org/wopi/files/1?access_token=old").unwrap();
        AccessToken::Token("new".to_string()).authorize_uri(&mut uri);
        assert_eq!(uri.as_str(), "https://wopi.example.org/wopi/files/1?access_token=new");
    }

    #[test]
    fn test_header_does_not_touch_uri() {
        let mut uri = Url::parse("https://wopi.example.org/wopi/files/1").unwrap();
        AccessToken::Header("Bearer abc".to_string()).authorize_uri(&mut uri);
        assert_eq!(uri.as_str(), "https://wopi.example.org/wopi/files/1");
    }

    #[test]
    fn test_header_pairs() {
        assert_eq!(
            AccessToken::header_pairs("Bearer abc"),
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
        assert_eq!(
            AccessToken::header_pairs("Authorization: Bearer abc\r\nX-Tenant: 7"),
            vec![
                ("Authorization".to_string(), "Bearer abc".to_string()),
                ("X-Tenant".to_string(), "7".to_string()),
            ]
        );
    }
}
