//! One-time credentials for provisioned signers (argon2id PHC hashes).

use crate::foundation::{AccordError, GENERATED_PASSWORD_LEN};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, ParamsBuilder, Version};
use rand::rngs::OsRng;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Params {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self { m_cost: 19 * 1024, t_cost: 2, p_cost: 1 }
    }
}

/// A freshly issued credential. The plaintext leaves this struct exactly once.
pub struct IssuedCredential {
    pub password: SecretString,
    pub password_hash: String,
}

pub trait CredentialIssuer: Send + Sync {
    fn issue(&self) -> Result<IssuedCredential, AccordError>;
    fn hash(&self, password: &SecretString) -> Result<String, AccordError>;
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AccordError>;
}

pub struct Argon2Issuer {
    params: Params,
}

impl Argon2Issuer {
    pub fn new(params: Argon2Params) -> Result<Self, AccordError> {
        let params = ParamsBuilder::new()
            .m_cost(params.m_cost)
            .t_cost(params.t_cost)
            .p_cost(params.p_cost)
            .build()
            .map_err(|err| AccordError::credential("argon2 params", err.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialIssuer for Argon2Issuer {
    fn issue(&self) -> Result<IssuedCredential, AccordError> {
        let password = generate_password();
        let password_hash = self.hash(&password)?;
        Ok(IssuedCredential { password, password_hash })
    }

    fn hash(&self, password: &SecretString) -> Result<String, AccordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map_err(|err| AccordError::credential("hash_password", err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AccordError> {
        let parsed = PasswordHash::new(password_hash).map_err(|err| AccordError::credential("parse hash", err.to_string()))?;
        Ok(self.hasher().verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

/// Random password drawn from the OS CSPRNG over an unambiguous alphabet.
pub fn generate_password() -> SecretString {
    let mut rng = OsRng;
    let mut buf: Vec<u8> =
        (0..GENERATED_PASSWORD_LEN).map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())]).collect();
    let password = String::from_utf8_lossy(&buf).into_owned();
    buf.zeroize();
    SecretString::new(password)
}
