//! OAuth authentication module for Twitter/X API integration.
//!
//! The bot authenticates every request with an OAuth 2.0 User Context access
//! token. When the token expires, it can be exchanged for a new one using the
//! refresh token and the app's client credentials.

use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

/// Token endpoint for the OAuth 2.0 refresh-token grant.
const TOKEN_URL: &str = "https://api.x.com/2/oauth2/token";

/// Successful response of the token endpoint. Other fields are ignored.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Present when Twitter rotates the refresh token.
    refresh_token: Option<String>,
}

/// Builds the Authorization header for OAuth 2.0 User Context authentication.
///
/// # Example
///
/// ```rust
/// use altbot::build_oauth2_user_context_header;
///
/// let header = build_oauth2_user_context_header("your_access_token");
/// assert_eq!(header, "Bearer your_access_token");
/// ```
pub fn build_oauth2_user_context_header(access_token: &str) -> String {
    format!("Bearer {}", access_token)
}

/// Exchanges a refresh token for a new access token.
///
/// # Parameters
///
/// - `client`: HTTP client to send the request with
/// - `client_id`: OAuth 2.0 client id of the app
/// - `client_secret`: OAuth 2.0 client secret of the app
/// - `refresh_token`: The current refresh token
///
/// # Returns
///
/// - `Ok((access_token, Some(refresh_token)))`: If Twitter rotated the refresh token too
/// - `Ok((access_token, None))`: If the old refresh token stays valid
/// - `Err(...)`: If the request fails or the response has no access token
pub async fn refresh_access_token(
    client: &Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<(String, Option<String>), Box<dyn std::error::Error + Send + Sync>> {
    info!("Requesting new access token with refresh token");

    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", client_id),
    ];

    let response = client
        .post(TOKEN_URL)
        .basic_auth(client_id, Some(client_secret))
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    let response_text = response.text().await?;
    if !status.is_success() {
        warn!("Token refresh rejected with status {}", status);
        debug!(
            "Token refresh error body: {}",
            crate::twitter::sanitize_for_logging(&response_text, 200)
        );
        return Err(format!("Token refresh failed ({})", status).into());
    }

    let token: TokenResponse = serde_json::from_str(&response_text)
        .map_err(|e| format!("Unexpected token refresh response: {}", e))?;
    let new_refresh_token = token.refresh_token;

    if new_refresh_token.is_some() {
        info!("Token refresh also rotated the refresh token");
    }

    Ok((token.access_token, new_refresh_token))
}
