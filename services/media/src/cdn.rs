//! CloudFront canned-policy URL signing
//!
//! Objects stay private in the bucket; clients receive a URL on the CDN
//! domain carrying `Expires`, `Signature` and `Key-Pair-Id` parameters.

use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::{
    RsaPrivateKey,
    pkcs1::DecodeRsaPrivateKey,
    pkcs1v15::SigningKey,
    pkcs8::DecodePrivateKey,
    signature::{SignatureEncoding, Signer},
};
use sha1::Sha1;
use std::path::Path;

use crate::error::{StorageError, StorageResult};

#[derive(Clone)]
pub struct CloudFrontSigner {
    domain: String,
    key_pair_id: String,
    signing_key: SigningKey<Sha1>,
}

impl CloudFrontSigner {
    pub fn new(domain: &str, key_pair_id: &str, private_key: RsaPrivateKey) -> StorageResult<Self> {
        let domain = normalize_domain(domain);
        if domain == "https://" {
            return Err(StorageError::Config("CDN domain is empty".to_string()));
        }
        if key_pair_id.trim().is_empty() {
            return Err(StorageError::Config("CDN key pair id is empty".to_string()));
        }

        Ok(Self {
            domain,
            key_pair_id: key_pair_id.trim().to_string(),
            signing_key: SigningKey::<Sha1>::new(private_key),
        })
    }

    /// Build a signer from PEM text or a path to a PEM file
    pub fn from_pem(domain: &str, key_pair_id: &str, pem_or_path: &str) -> StorageResult<Self> {
        let pem = load_pem(pem_or_path)?;
        Self::new(domain, key_pair_id, parse_private_key(&pem)?)
    }

    /// Public URL of an object on the CDN, without a signature
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.domain, urlencoding::encode(key))
    }

    /// Sign `key` for access until `expires_at` (unix seconds)
    pub fn sign(&self, key: &str, expires_at: i64) -> StorageResult<String> {
        let url = self.object_url(key);
        let policy = canned_policy(&url, expires_at);

        let signature = self
            .signing_key
            .try_sign(policy.as_bytes())
            .map_err(|e| StorageError::Signing(e.to_string()))?;

        Ok(format!(
            "{}?Expires={}&Signature={}&Key-Pair-Id={}",
            url,
            expires_at,
            url_safe_base64(&signature.to_bytes()),
            self.key_pair_id
        ))
    }
}

impl std::fmt::Debug for CloudFrontSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFrontSigner")
            .field("domain", &self.domain)
            .field("key_pair_id", &self.key_pair_id)
            .finish_non_exhaustive()
    }
}

fn canned_policy(url: &str, expires_at: i64) -> String {
    format!(
        r#"{{"Statement":[{{"Resource":"{}","Condition":{{"DateLessThan":{{"AWS:EpochTime":{}}}}}}}]}}"#,
        url, expires_at
    )
}

/// CloudFront's base64 variant: `+` -> `-`, `=` -> `_`, `/` -> `~`
fn url_safe_base64(bytes: &[u8]) -> String {
    STANDARD
        .encode(bytes)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            other => other,
        })
        .collect()
}

fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn load_pem(pem_or_path: &str) -> StorageResult<String> {
    if pem_or_path.contains("-----BEGIN") {
        // Keys passed through env files often carry escaped newlines
        return Ok(pem_or_path.replace("\\n", "\n"));
    }

    let path = Path::new(pem_or_path.trim());
    std::fs::read_to_string(path).map_err(|e| {
        StorageError::Config(format!(
            "Failed to read CDN private key from {}: {}",
            path.display(),
            e
        ))
    })
}

fn parse_private_key(pem: &str) -> StorageResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| StorageError::Config(format!("Invalid CDN private key: {}", e)))
}
