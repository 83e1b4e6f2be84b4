/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Capability tokens and the signing identities that mint and verify them.
//!
//! The app holds a process-local ed25519 key generated at startup. Tokens it
//! stamps on its own outgoing requests carry a signature over the creator
//! package and a per-token nonce; nothing outside this process can produce
//! one. Affiliates are checked against public keys supplied by configuration.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_CONTEXT: &[u8] = b"activation-router.capability.v1";

/// Opaque proof of origin attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityToken {
    pub creator: String,
    pub nonce: Uuid,
    #[serde(with = "proof_serde")]
    pub proof: Vec<u8>,
}

impl CapabilityToken {
    fn signed_payload(creator: &str, nonce: &Uuid) -> Vec<u8> {
        let mut payload =
            Vec::with_capacity(TOKEN_CONTEXT.len() + creator.len() + 17);
        payload.extend_from_slice(TOKEN_CONTEXT);
        payload.push(0);
        payload.extend_from_slice(creator.as_bytes());
        payload.extend_from_slice(nonce.as_bytes());
        payload
    }

    pub fn verify_with(&self, key: &VerifyingKey) -> Result<(), TokenError> {
        let signature = Signature::from_slice(&self.proof)
            .map_err(|_| TokenError::BadProofLength(self.proof.len()))?;
        key.verify(&Self::signed_payload(&self.creator, &self.nonce), &signature)
            .map_err(|_| TokenError::SignatureMismatch)
    }
}

// Proof bytes travel as base64 text.
mod proof_serde {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(proof: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(proof))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// This app's own signing identity.
pub struct AppIdentity {
    package: String,
    signing_key: SigningKey,
}

impl AppIdentity {
    /// Fresh identity with a key that lives only as long as this process.
    pub fn generate(package: &str) -> Self {
        let mut rng = rand::rngs::OsRng;
        Self::from_signing_key(package, SigningKey::generate(&mut rng))
    }

    pub fn from_signing_key(package: &str, signing_key: SigningKey) -> Self {
        Self {
            package: package.to_string(),
            signing_key,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.verifying_key().as_bytes())
    }

    pub fn mint(&self) -> CapabilityToken {
        let nonce = Uuid::new_v4();
        let signature = self
            .signing_key
            .sign(&CapabilityToken::signed_payload(&self.package, &nonce));
        CapabilityToken {
            creator: self.package.clone(),
            nonce,
            proof: signature.to_bytes().to_vec(),
        }
    }

    /// Whether `token` was minted by this identity.
    pub fn verify(&self, token: &CapabilityToken) -> Result<(), TokenError> {
        if token.creator != self.package {
            return Err(TokenError::UnknownSigner(token.creator.clone()));
        }
        token.verify_with(&self.verifying_key())
    }
}

impl std::fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppIdentity")
            .field("package", &self.package)
            .field("public_key", &self.public_key_base64())
            .finish()
    }
}

/// First-party signers whose tokens earn affiliate trust.
#[derive(Debug, Clone, Default)]
pub struct TrustedSigners {
    keys: HashMap<String, VerifyingKey>,
}

impl TrustedSigners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: &str, key: VerifyingKey) {
        self.keys.insert(package.to_string(), key);
    }

    pub fn insert_base64(&mut self, package: &str, public_key: &str) -> Result<(), TokenError> {
        let bytes = STANDARD
            .decode(public_key.trim())
            .map_err(|e| TokenError::InvalidKeyEncoding(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TokenError::InvalidKeyLength(bytes.len()))?;
        let key = VerifyingKey::from_bytes(&array)
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        self.insert(package, key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn verify(&self, token: &CapabilityToken) -> Result<(), TokenError> {
        let key = self
            .keys
            .get(&token.creator)
            .ok_or_else(|| TokenError::UnknownSigner(token.creator.clone()))?;
        token.verify_with(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    InvalidKeyEncoding(String),
    InvalidKeyLength(usize),
    InvalidKey(String),
    BadProofLength(usize),
    UnknownSigner(String),
    SignatureMismatch,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKeyEncoding(e) => write!(f, "public key is not base64: {}", e),
            Self::InvalidKeyLength(len) => write!(f, "public key is {} bytes, expected 32", len),
            Self::InvalidKey(e) => write!(f, "public key rejected: {}", e),
            Self::BadProofLength(len) => write!(f, "proof is {} bytes, expected 64", len),
            Self::UnknownSigner(creator) => write!(f, "no trusted key for {}", creator),
            Self::SignatureMismatch => write!(f, "proof does not verify"),
        }
    }
}

impl std::error::Error for TokenError {}
