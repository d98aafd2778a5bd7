//! Reversible encrypted representation of state values.
//!
//! Token layout: `surge:` + base64(`iv[16] || ciphertext || tag[32]`)
//!
//! - ciphertext: AES-256-CBC with PKCS#7 padding over the JSON-encoded value
//! - tag: blake3 keyed hash over `iv || ciphertext`
//!
//! Encryption and MAC keys are derived from the configured secret under
//! separate contexts. Decryption never fails loudly: anything that is not a
//! well-formed, untampered token yields `None`.

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::RngCore;
use serde_json::Value;

use super::StateError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Prefix marking an encrypted state token.
pub const TOKEN_PREFIX: &str = "surge:";

/// Minimum length of the configured secret, in characters.
pub const MIN_KEY_LEN: usize = 32;

const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
const TAG_LEN: usize = 32;

const ENC_CONTEXT: &str = "surge 2024-10 state token encryption";
const MAC_CONTEXT: &str = "surge 2024-10 state token integrity";

/// Check whether a string has the shape of a state token.
#[inline]
pub fn is_token(text: &str) -> bool {
    text.starts_with(TOKEN_PREFIX)
}

/// Symmetric cipher for state tokens.
pub struct StateCipher {
    enc_key: [u8; 32],
    mac_key: [u8; 32],
}

impl std::fmt::Debug for StateCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCipher").finish_non_exhaustive()
    }
}

impl StateCipher {
    /// Build a cipher from the configured secret.
    pub fn new(secret: &str) -> Result<Self, StateError> {
        let len = secret.chars().count();
        if len < MIN_KEY_LEN {
            return Err(StateError::WeakKey(len));
        }
        Ok(Self {
            enc_key: blake3::derive_key(ENC_CONTEXT, secret.as_bytes()),
            mac_key: blake3::derive_key(MAC_CONTEXT, secret.as_bytes()),
        })
    }

    /// Encrypt a JSON value into an opaque token.
    pub fn encrypt(&self, value: &Value) -> Result<String, StateError> {
        let plaintext = serde_json::to_vec(value)?;

        let mut iv = [0u8; IV_LEN];
        rand::rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new((&self.enc_key).into(), (&iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
        let tag = self.tag(&iv, &ciphertext);

        let mut raw = Vec::with_capacity(IV_LEN + ciphertext.len() + TAG_LEN);
        raw.extend_from_slice(&iv);
        raw.extend_from_slice(&ciphertext);
        raw.extend_from_slice(tag.as_bytes());

        Ok(format!("{TOKEN_PREFIX}{}", STANDARD.encode(raw)))
    }

    /// Decrypt a token. Malformed, truncated or tampered input yields `None`.
    pub fn decrypt(&self, token: &str) -> Option<Value> {
        let raw = STANDARD.decode(token.strip_prefix(TOKEN_PREFIX)?).ok()?;
        if raw.len() < IV_LEN + BLOCK_LEN + TAG_LEN {
            return None;
        }

        let (iv, rest) = raw.split_at(IV_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);
        if ciphertext.len() % BLOCK_LEN != 0 {
            return None;
        }

        // blake3::Hash equality is constant-time
        let given = blake3::Hash::from_bytes(tag.try_into().ok()?);
        if self.tag(iv, ciphertext) != given {
            return None;
        }

        let iv: [u8; IV_LEN] = iv.try_into().ok()?;
        let plaintext = Aes256CbcDec::new((&self.enc_key).into(), (&iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .ok()?;

        serde_json::from_slice(&plaintext).ok()
    }

    fn tag(&self, iv: &[u8], ciphertext: &[u8]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.mac_key);
        hasher.update(iv);
        hasher.update(ciphertext);
        hasher.finalize()
    }
}
