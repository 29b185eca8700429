//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Only what the X endpoints need: user-context signing with a consumer key
//! pair and an access token pair. Form-encoded body parameters take part in
//! the signature; JSON bodies do not.

use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;

use crate::error::ClientError;

/// RFC 3986 unreserved characters stay as they are
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Consumer and access token pairs for one X account
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"[REDACTED]")
            .finish()
    }
}

impl OAuthCredentials {
    /// Build the `Authorization` header value for a request
    ///
    /// `url` must not carry a query string; pass query and form parameters in
    /// `params` instead.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, ClientError> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.header_with(method, url, params, &nonce, &timestamp)
    }

    fn header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, ClientError> {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = self.signature(method, url, params, &oauth_params)?;
        oauth_params.push(("oauth_signature", signature.as_str()));
        oauth_params.sort();

        let fields = oauth_params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {}", fields))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth_params: &[(&str, &str)],
    ) -> Result<String, ClientError> {
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .chain(oauth_params)
            .map(|(key, value)| (encode(key), encode(value)))
            .collect();
        pairs.sort();

        let parameter_string = pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(url),
            encode(&parameter_string)
        );
        let signing_key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.access_token_secret)
        );

        let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
            .map_err(|e| ClientError::Authentication(format!("invalid signing key: {}", e)))?;
        mac.update(base_string.as_bytes());

        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from X's "Creating a signature" developer documentation
    fn documented_credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            access_token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        }
    }

    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const STATUS: &str = "Hello Ladies + Gentlemen, a signed OAuth request!";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: &str = "1318622958";

    #[test]
    fn test_encode_keeps_unreserved_characters() {
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_signature_matches_documented_example() {
        let credentials = documented_credentials();
        let oauth_params = [
            ("oauth_consumer_key", credentials.consumer_key.as_str()),
            ("oauth_nonce", NONCE),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", TIMESTAMP),
            ("oauth_token", credentials.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = credentials
            .signature(
                "post",
                URL,
                &[("include_entities", "true"), ("status", STATUS)],
                &oauth_params,
            )
            .unwrap();

        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_header_contains_encoded_signature() {
        let header = documented_credentials()
            .header_with(
                "POST",
                URL,
                &[("include_entities", "true"), ("status", STATUS)],
                NONCE,
                TIMESTAMP,
            )
            .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", "));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(!header.contains("status="));
    }

    #[test]
    fn test_fresh_nonce_per_header() {
        let credentials = documented_credentials();

        let first = credentials.authorization_header("POST", URL, &[]).unwrap();
        let second = credentials.authorization_header("POST", URL, &[]).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", documented_credentials());

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
    }
}
