//! Session authorization (C1): exchanges the long-lived refresh token for
//! a short-lived access token via the identity provider's OAuth2
//! refresh-token grant.

use crate::error::AuthError;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, warn};

const TOKEN_URL: &str =
    "https://be.broker.ru/trade-api-keycloak/realms/tradeapi/protocol/openid-connect/token";
const CLIENT_ID: &str = "trade-api-write";
const MAX_ATTEMPTS: u32 = 4;

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Obtains an access token for `refresh_token`, retrying up to
/// [`MAX_ATTEMPTS`] times with linearly increasing backoff
/// (3, 5, 7, 9 seconds) on network error or non-2xx response.
pub async fn obtain_access_token(
    http: &reqwest::Client,
    refresh_token: &str,
) -> Result<String, AuthError> {
    let mut payload = HashMap::new();
    payload.insert("client_id", CLIENT_ID);
    payload.insert("refresh_token", refresh_token);
    payload.insert("grant_type", "refresh_token");

    for attempt in 0..MAX_ATTEMPTS {
        let result = http
            .post(TOKEN_URL)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .form(&payload)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    let parsed: TokenResponse = serde_json::from_str(&body)
                        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
                    return Ok(parsed.access_token);
                }

                let body = response.text().await.unwrap_or_default();
                warn!(
                    attempt = attempt + 1,
                    status = status.as_u16(),
                    "invalid response while authorizing"
                );
                if attempt + 1 == MAX_ATTEMPTS {
                    return Err(AuthError::Rejected {
                        status: status.as_u16(),
                        body,
                    });
                }
            }
            Err(e) => {
                error!(attempt = attempt + 1, error = %e, "failed attempt while authorizing");
                if attempt + 1 == MAX_ATTEMPTS {
                    return Err(AuthError::Network(e));
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(3 + 2 * attempt as u64)).await;
    }

    Err(AuthError::Exhausted {
        attempts: MAX_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_matches_spec() {
        let schedule: Vec<u64> = (0..MAX_ATTEMPTS).map(|a| 3 + 2 * a as u64).collect();
        assert_eq!(schedule, vec![3, 5, 7, 9]);
    }
}
