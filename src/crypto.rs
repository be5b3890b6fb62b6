//! Page encryption.
//!
//! A protected page ships only ciphertext. The key is derived from the
//! page password with PBKDF2-HMAC-SHA-256 and the rendered body is sealed
//! with AES-256-GCM. `static/reader.js` performs the inverse with WebCrypto,
//! so every parameter here is part of the published page format:
//!
//! | parameter  | value                                   |
//! |------------|-----------------------------------------|
//! | KDF        | PBKDF2, HMAC-SHA-256                    |
//! | iterations | 333,333 (stored per page)               |
//! | key        | 256 bits                                |
//! | salt       | 16 random bytes per page                |
//! | cipher     | AES-256-GCM, 12-byte IV, no extra data  |
//! | encoding   | URL-safe base64, no `=` padding         |
//!
//! The GCM tag is appended to the ciphertext, which is also what WebCrypto
//! expects.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub const ITERATIONS: u32 = 333_333;
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum EncryptError {
    #[error("password is empty")]
    EmptyPassword,
    #[error("iteration count must be at least 1")]
    ZeroIterations,
    #[error("cipher failure")]
    Cipher,
}

/// The only error a reader ever sees.
///
/// Wrong password, corrupted payload, truncated base64: all the same.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    #[error("incorrect password")]
    IncorrectPassword,
}

/// Key-derivation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherParams {
    pub iterations: u32,
}

impl Default for CipherParams {
    fn default() -> Self {
        Self {
            iterations: ITERATIONS,
        }
    }
}

/// Everything a reader needs besides the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
    pub iterations: u32,
}

/// A page body as it will be published.
#[derive(Debug, Clone)]
pub enum PageBody {
    /// No password: the HTML goes out as is.
    Published(String),
    /// Password set: only the payload goes out.
    Encrypted(EncryptedPayload),
}

impl PageBody {
    /// Seal `html` if a password is given, otherwise publish it.
    pub fn seal(html: String, password: Option<&str>, params: CipherParams) -> Result<Self, EncryptError> {
        match password {
            Some(password) => Ok(PageBody::Encrypted(encrypt_with_params(
                &html, password, params,
            )?)),
            None => Ok(PageBody::Published(html)),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, PageBody::Encrypted(_))
    }
}

/// Encrypt with the default parameters.
pub fn encrypt(plaintext: &str, password: &str) -> Result<EncryptedPayload, EncryptError> {
    encrypt_with_params(plaintext, password, CipherParams::default())
}

/// Encrypt with a fresh random salt and IV.
pub fn encrypt_with_params(
    plaintext: &str,
    password: &str,
    params: CipherParams,
) -> Result<EncryptedPayload, EncryptError> {
    if password.is_empty() {
        return Err(EncryptError::EmptyPassword);
    }
    if params.iterations == 0 {
        return Err(EncryptError::ZeroIterations);
    }

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt, params.iterations);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| EncryptError::Cipher)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| EncryptError::Cipher)?;

    Ok(EncryptedPayload {
        ciphertext: URL_SAFE_NO_PAD.encode(sealed),
        iv: URL_SAFE_NO_PAD.encode(iv),
        salt: URL_SAFE_NO_PAD.encode(salt),
        iterations: params.iterations,
    })
}

/// Recover the plaintext, or fail with the single generic error.
pub fn decrypt(payload: &EncryptedPayload, password: &str) -> Result<String, DecryptError> {
    let fail = |_| DecryptError::IncorrectPassword;

    if payload.iterations == 0 {
        return Err(DecryptError::IncorrectPassword);
    }
    let salt = URL_SAFE_NO_PAD.decode(&payload.salt).map_err(fail)?;
    let iv = URL_SAFE_NO_PAD.decode(&payload.iv).map_err(fail)?;
    let sealed = URL_SAFE_NO_PAD.decode(&payload.ciphertext).map_err(fail)?;
    if salt.len() != SALT_LEN || iv.len() != IV_LEN {
        return Err(DecryptError::IncorrectPassword);
    }

    let key = derive_key(password, &salt, payload.iterations);
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|_| DecryptError::IncorrectPassword)?;
    let plain = cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| DecryptError::IncorrectPassword)?;
    String::from_utf8(plain).map_err(|_| DecryptError::IncorrectPassword)
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}
