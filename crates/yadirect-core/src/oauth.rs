//! Obtaining an access token
//!
//! Every request needs an OAuth token. Yandex issues one through the implicit grant:
//! open [`oauth_authorize_url`] in a browser, allow access, and copy the token from
//! the redirect.

use url::Url;

use crate::{Error, Result};

/// Yandex OAuth authorization endpoint
pub const OAUTH_AUTHORIZE_URL: &str = "https://oauth.yandex.ru/authorize";

/// Documentation for getting a token for the Direct API
pub const OAUTH_DOCS_URL: &str = "https://yandex.ru/dev/direct/doc/start/token.html";

/// Authorization URL that issues a token for the application `client_id`
pub fn oauth_authorize_url(client_id: &str) -> Result<Url> {
    let client_id = client_id.trim();
    if client_id.is_empty() {
        return Err(Error::Configuration {
            message: "OAuth client_id must not be empty".to_string(),
            source: None,
        });
    }
    Url::parse_with_params(
        OAUTH_AUTHORIZE_URL,
        &[("response_type", "token"), ("client_id", client_id)],
    )
    .map_err(|e| Error::Configuration {
        message: format!("invalid OAuth URL: {}", e),
        source: Some(e.into()),
    })
}
