//! Detached feature signatures.
//!
//! A feature archive `x-1.0.esa` may be accompanied by `x-1.0.esa.sig`: a
//! base64 ed25519 signature over the archive bytes. Public keys come from
//! the `[keys]` section, each `keyurl` pointing at a file or an HTTP URL
//! holding the base64 key.

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use liberty_schema::{Coordinate, KeyRecord, VerifyPolicy};
use std::path::{Path, PathBuf};

use crate::error::{ExecutionError, SignatureError};
use crate::reporter::Reporter;
use crate::resolver::CoordinateResolver;

/// Packaging type suffix of a detached signature.
pub const SIGNATURE_SUFFIX: &str = "sig";

/// The public keys a signature may be checked against.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: Vec<(String, VerifyingKey)>,
}

impl KeyRing {
    /// Read every key. A key that cannot be read is an error: a typo in a
    /// `keyurl` must not silently weaken verification.
    pub async fn load(
        records: &[KeyRecord],
        client: &reqwest::Client,
        reporter: &dyn Reporter,
    ) -> Result<Self, SignatureError> {
        let mut keys = Vec::with_capacity(records.len());
        for record in records {
            let text = read_key_text(&record.keyurl, client)
                .await
                .map_err(|reason| key_error(record, reason))?;
            let key = decode_key(&text).map_err(|reason| key_error(record, reason))?;
            reporter.debug(&format!("Loaded verification key {}", record.keyid));
            keys.push((record.keyid.clone(), key));
        }
        Ok(Self { keys })
    }

    pub fn from_keys(keys: Vec<(String, VerifyingKey)>) -> Self {
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check `signature_b64` over `data`; returns the id of the matching key.
    pub fn verify(&self, data: &[u8], signature_b64: &str, feature: &str) -> Result<String, SignatureError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(signature_b64.trim())
            .map_err(|e| SignatureError::Malformed {
                feature: feature.to_string(),
                reason: e.to_string(),
            })?;
        let bytes: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SignatureError::Malformed {
                feature: feature.to_string(),
                reason: format!("expected 64 bytes, got {}", bytes.len()),
            })?;
        let signature = Signature::from_bytes(&bytes);

        self.keys
            .iter()
            .find(|(_, key)| key.verify(data, &signature).is_ok())
            .map(|(keyid, _)| keyid.clone())
            .ok_or_else(|| SignatureError::Invalid(feature.to_string()))
    }
}

fn key_error(record: &KeyRecord, reason: String) -> SignatureError {
    SignatureError::Key {
        keyid: record.keyid.clone(),
        keyurl: record.keyurl.clone(),
        reason,
    }
}

async fn read_key_text(keyurl: &str, client: &reqwest::Client) -> Result<String, String> {
    if keyurl.starts_with("http://") || keyurl.starts_with("https://") {
        let resp = client
            .get(keyurl)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| e.to_string())?;
        resp.text().await.map_err(|e| e.to_string())
    } else {
        let path = keyurl.strip_prefix("file://").unwrap_or(keyurl);
        tokio::fs::read_to_string(path).await.map_err(|e| e.to_string())
    }
}

fn decode_key(text: &str) -> Result<VerifyingKey, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| e.to_string())?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected a 32 byte ed25519 key, got {} bytes", bytes.len()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| e.to_string())
}

/// Result of checking one archive.
#[derive(Debug)]
pub enum Verification {
    Valid { keyid: String },
    Missing,
    NoKeys,
    Invalid(SignatureError),
}

impl Verification {
    /// Apply `policy`: `Ok` means installation may go ahead.
    pub fn apply(self, policy: VerifyPolicy, feature: &str, reporter: &dyn Reporter) -> Result<(), SignatureError> {
        match (self, policy) {
            (_, VerifyPolicy::Skip) => Ok(()),
            (Self::Valid { keyid }, _) => {
                reporter.debug(&format!("Signature of {feature} verified with key {keyid}"));
                Ok(())
            }
            (Self::Missing, VerifyPolicy::All) => Err(SignatureError::Missing(feature.to_string())),
            (Self::NoKeys, VerifyPolicy::All) => Err(SignatureError::Invalid(feature.to_string())),
            (Self::Invalid(e), VerifyPolicy::All | VerifyPolicy::Enforce) => Err(e),
            (Self::Missing, _) => {
                reporter.warn(&format!("Feature {feature} is not signed"));
                Ok(())
            }
            (Self::NoKeys, _) => {
                reporter.warn(&format!(
                    "No verification keys are configured; the signature of {feature} was not checked"
                ));
                Ok(())
            }
            (Self::Invalid(e), VerifyPolicy::Warn) => {
                reporter.warn(&e.to_string());
                Ok(())
            }
        }
    }
}

/// Verifies archives according to a policy.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    policy: VerifyPolicy,
    ring: KeyRing,
}

impl SignatureVerifier {
    pub fn new(policy: VerifyPolicy, ring: KeyRing) -> Self {
        Self { policy, ring }
    }

    pub fn policy(&self) -> VerifyPolicy {
        self.policy
    }

    /// Verify an archive fetched from a repository; its signature is the
    /// sibling artifact of type `<type>.sig`.
    pub async fn verify_artifact(
        &self,
        resolver: &CoordinateResolver,
        esa: &Path,
        coordinate: &Coordinate,
        feature: &str,
        reporter: &dyn Reporter,
    ) -> Result<(), ExecutionError> {
        if self.policy == VerifyPolicy::Skip {
            return Ok(());
        }
        let kind = format!("{}.{SIGNATURE_SUFFIX}", coordinate.kind);
        let signature = match resolver
            .resolve_signature(
                esa,
                &coordinate.group_id,
                &coordinate.artifact_id,
                &kind,
                &coordinate.version,
            )
            .await
        {
            Ok(path) => Some(path),
            Err(ExecutionError::Fetch { source, .. }) if source.is_missing() => None,
            Err(e) => return Err(e),
        };
        self.check(esa, signature, feature, reporter)
    }

    /// Verify an archive given as a file; its signature is `<file>.sig`.
    pub fn verify_file(&self, esa: &Path, feature: &str, reporter: &dyn Reporter) -> Result<(), ExecutionError> {
        if self.policy == VerifyPolicy::Skip {
            return Ok(());
        }
        let mut sig = esa.as_os_str().to_owned();
        sig.push(".");
        sig.push(SIGNATURE_SUFFIX);
        let sig = PathBuf::from(sig);
        let signature = sig.is_file().then_some(sig);
        self.check(esa, signature, feature, reporter)
    }

    fn check(
        &self,
        esa: &Path,
        signature: Option<PathBuf>,
        feature: &str,
        reporter: &dyn Reporter,
    ) -> Result<(), ExecutionError> {
        let verification = match signature {
            None => Verification::Missing,
            Some(_) if self.ring.is_empty() => Verification::NoKeys,
            Some(sig) => {
                let data = std::fs::read(esa).map_err(|e| ExecutionError::io(esa, e))?;
                let text = std::fs::read_to_string(&sig).map_err(|e| ExecutionError::io(&sig, e))?;
                match self.ring.verify(&data, &text, feature) {
                    Ok(keyid) => Verification::Valid { keyid },
                    Err(e) => Verification::Invalid(e),
                }
            }
        };
        Ok(verification.apply(self.policy, feature, reporter)?)
    }
}
