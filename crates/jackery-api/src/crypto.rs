// Login envelope encryption
//
// The login endpoint expects the credential payload AES-128-ECB encrypted
// under a fixed key, with that same key RSA-wrapped (PKCS#1 v1.5) under the
// vendor's embedded public key. Both keys are protocol constants shipped in
// every mobile client; they protect nothing, they only satisfy the server.

use std::io;

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::Error;

/// AES key used for the login payload. Identical for every client.
pub const AES_KEY: &[u8; 16] = b"1234567890123456";

/// Vendor RSA public key (base64 DER SubjectPublicKeyInfo, 1024-bit).
pub const RSA_PUBLIC_KEY: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQCVmzgJy/4XolxPnkfu32YtJqYGFLYqf9/rnVgURJED+8J9J3Pccd6+9L97/+7COZE5OkejsgOkqeLNC9C3r5mhpE4zk/HStss7Q8/5DqkGD1annQ+eoICo3oi0dITZ0Qll56Dowb8lXi6WHViVDdih/oeUwVJY89uJNtTWrz7t7QIDAQAB";

/// `loginType` for account + password logins.
pub const LOGIN_TYPE_PASSWORD: u8 = 2;

/// Application id the mobile client registers with.
pub const REGISTER_APP_ID: &str = "com.hbxn.jackery";

const BLOCK_SIZE: usize = 16;

/// The two login parameters: encrypted payload and wrapped AES key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEnvelope {
    pub aes_encrypt_data: String,
    pub rsa_for_aes_key: String,
}

impl LoginEnvelope {
    /// Query parameters in the order the login endpoint expects them.
    pub fn as_query(&self) -> [(&'static str, &str); 2] {
        [
            ("aesEncryptData", self.aes_encrypt_data.as_str()),
            ("rsaForAesKey", self.rsa_for_aes_key.as_str()),
        ]
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload<'a> {
    account: &'a str,
    login_type: u8,
    mac_id: &'a str,
    password: &'a str,
    phone: &'a str,
    register_app_id: &'a str,
    verification_code: &'a str,
}

/// Key material for building login envelopes.
///
/// [`Handshake::vendor`] carries the embedded protocol keys; tests swap in
/// a locally generated RSA key so the wrapped AES key can be decrypted.
#[derive(Debug, Clone)]
pub struct Handshake {
    aes_key: [u8; 16],
    rsa_key: RsaPublicKey,
}

impl Handshake {
    /// Handshake using the vendor's embedded keys.
    pub fn vendor() -> Result<Self, Error> {
        Ok(Self {
            aes_key: *AES_KEY,
            rsa_key: parse_public_key(RSA_PUBLIC_KEY)?,
        })
    }

    /// Handshake with explicit key material.
    pub fn with_keys(aes_key: [u8; 16], rsa_key: RsaPublicKey) -> Self {
        Self { aes_key, rsa_key }
    }

    /// Build the login envelope for the given credentials and device identifier.
    ///
    /// The AES half is deterministic for fixed inputs. The RSA half is not:
    /// PKCS#1 v1.5 padding is randomized on every call.
    pub fn build_login_envelope(
        &self,
        account: &str,
        password: &str,
        device_id: &str,
    ) -> Result<LoginEnvelope, Error> {
        let payload = LoginPayload {
            account,
            login_type: LOGIN_TYPE_PASSWORD,
            mac_id: device_id,
            password,
            phone: "",
            register_app_id: REGISTER_APP_ID,
            verification_code: "",
        };
        let plaintext = to_spaced_json(&payload)?;

        Ok(LoginEnvelope {
            aes_encrypt_data: encrypt_aes_ecb(&plaintext, &self.aes_key),
            rsa_for_aes_key: encrypt_rsa_with_key(&self.aes_key, &self.rsa_key)?,
        })
    }
}

/// Build a login envelope with the vendor keys.
pub fn build_login_envelope(
    account: &str,
    password: &str,
    device_id: &str,
) -> Result<LoginEnvelope, Error> {
    Handshake::vendor()?.build_login_envelope(account, password, device_id)
}

/// AES-128-ECB with PKCS#7 padding, base64 encoded.
pub fn encrypt_aes_ecb(plaintext: &[u8], key: &[u8; 16]) -> String {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut buf = pkcs7_pad(plaintext);
    for block in buf.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    STANDARD.encode(buf)
}

/// RSA PKCS#1 v1.5 encryption under a base64 DER public key, base64 encoded.
pub fn encrypt_rsa_pkcs1(data: &[u8], public_key_b64: &str) -> Result<String, Error> {
    let key = parse_public_key(public_key_b64)?;
    encrypt_rsa_with_key(data, &key)
}

fn encrypt_rsa_with_key(data: &[u8], key: &RsaPublicKey) -> Result<String, Error> {
    let encrypted = key
        .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, data)
        .map_err(|e| Error::Crypto {
            message: format!("RSA encryption failed: {e}"),
        })?;
    Ok(STANDARD.encode(encrypted))
}

fn parse_public_key(public_key_b64: &str) -> Result<RsaPublicKey, Error> {
    let der = STANDARD
        .decode(public_key_b64.trim())
        .map_err(|e| Error::Crypto {
            message: format!("public key is not valid base64: {e}"),
        })?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| Error::Crypto {
        message: format!("invalid RSA public key: {e}"),
    })
}

fn pkcs7_pad(plaintext: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let pad_byte = u8::try_from(pad_len).unwrap_or(16);
    let mut buf = Vec::with_capacity(plaintext.len() + pad_len);
    buf.extend_from_slice(plaintext);
    buf.resize(plaintext.len() + pad_len, pad_byte);
    buf
}

// ── Payload serialization ────────────────────────────────────────────

/// Compact JSON with `", "` and `": "` separators, matching the byte layout
/// the reference client sends. Non-ASCII is written as UTF-8, unescaped.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }
}

fn to_spaced_json<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut ser).map_err(|e| Error::Crypto {
        message: format!("failed to serialize login payload: {e}"),
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use aes::cipher::BlockDecrypt;
    use pretty_assertions::assert_eq;
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::traits::PublicKeyParts;

    use super::*;

    fn decrypt_aes_ecb(ciphertext_b64: &str, key: &[u8; 16]) -> Vec<u8> {
        let cipher = Aes128::new(GenericArray::from_slice(key));
        let mut buf = STANDARD.decode(ciphertext_b64).unwrap();
        assert_eq!(buf.len() % BLOCK_SIZE, 0);
        for block in buf.chunks_exact_mut(BLOCK_SIZE) {
            cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }
        let pad = usize::from(*buf.last().unwrap());
        assert!((1..=BLOCK_SIZE).contains(&pad), "bad padding byte {pad}");
        assert!(buf[buf.len() - pad..].iter().all(|&b| usize::from(b) == pad));
        buf.truncate(buf.len() - pad);
        buf
    }

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let public = private.to_public_key();
        (private, public)
    }

    #[test]
    fn aes_round_trips_across_padding_boundaries() {
        for len in [0_usize, 1, 16, 17, 1000] {
            let plaintext: Vec<u8> = (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect();
            let encrypted = encrypt_aes_ecb(&plaintext, AES_KEY);

            let raw_len = STANDARD.decode(&encrypted).unwrap().len();
            assert_eq!(raw_len, (len / BLOCK_SIZE + 1) * BLOCK_SIZE);
            assert_eq!(decrypt_aes_ecb(&encrypted, AES_KEY), plaintext);
        }
    }

    #[test]
    fn aes_matches_known_vectors() {
        assert_eq!(encrypt_aes_ecb(b"hello", AES_KEY), "67fHA+Z12z2jlwOLTBeCPA==");
        assert_eq!(encrypt_aes_ecb(b"", AES_KEY), "BQGHoM3lqYcsurCRq3PlUw==");
    }

    #[test]
    fn payload_uses_reference_separators() {
        let payload = LoginPayload {
            account: "user@example.com",
            login_type: LOGIN_TYPE_PASSWORD,
            mac_id: "2abc",
            password: "hunter2",
            phone: "",
            register_app_id: REGISTER_APP_ID,
            verification_code: "",
        };
        let json = String::from_utf8(to_spaced_json(&payload).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"account": "user@example.com", "loginType": 2, "macId": "2abc", "password": "hunter2", "phone": "", "registerAppId": "com.hbxn.jackery", "verificationCode": ""}"#
        );
    }

    #[test]
    fn payload_keeps_non_ascii_unescaped() {
        let payload = LoginPayload {
            account: "józef@example.com",
            login_type: LOGIN_TYPE_PASSWORD,
            mac_id: "2abc",
            password: "pässwörd",
            phone: "",
            register_app_id: REGISTER_APP_ID,
            verification_code: "",
        };
        let json = String::from_utf8(to_spaced_json(&payload).unwrap()).unwrap();
        assert!(json.contains("\"józef@example.com\""));
        assert!(json.contains("\"pässwörd\""));
    }

    #[test]
    fn vendor_key_is_1024_bit() {
        let handshake = Handshake::vendor().unwrap();
        assert_eq!(handshake.rsa_key.size(), 128);
    }

    #[test]
    fn vendor_envelope_matches_known_aes_half() {
        let envelope = build_login_envelope("user@example.com", "hunter2", "2abc").unwrap();
        assert_eq!(
            envelope.aes_encrypt_data,
            "r1o9j1rlI1OMiV9AIYO3t+e6bXoVGQYbUe4rRHCwQ7k/rCgeq48pdj3WNcJGuUHX/jmZq0gObyt8MMEjYGLo9u6SUeGYMVqczJKIHKq7kGmJU4cd16I5r2Cp0zSpsLbQyRIZnB0vIt/40m0DrRLemSEBAPgQeGBZkLkEg7qNWKDbEjG+5s6xI1LCwZrPzRGZxOV8C0qlGkD9+vaLg58J+CkDRmkcuYbsx6u25LaH3YM="
        );
        assert_eq!(STANDARD.decode(&envelope.rsa_for_aes_key).unwrap().len(), 128);
    }

    #[test]
    fn rsa_wraps_aes_key_with_randomized_padding() {
        let (private, public) = test_keypair();
        let der = public.to_public_key_der().unwrap();
        let public_b64 = STANDARD.encode(der.as_bytes());

        let first = encrypt_rsa_pkcs1(AES_KEY, &public_b64).unwrap();
        let second = encrypt_rsa_pkcs1(AES_KEY, &public_b64).unwrap();
        assert_ne!(first, second);

        for wrapped in [first, second] {
            let raw = STANDARD.decode(wrapped).unwrap();
            let unwrapped = private.decrypt(Pkcs1v15Encrypt, &raw).unwrap();
            assert_eq!(unwrapped.as_slice(), AES_KEY);
        }
    }

    #[test]
    fn envelope_is_deterministic_in_aes_half_only() {
        let (private, public) = test_keypair();
        let handshake = Handshake::with_keys(*AES_KEY, public);

        let a = handshake
            .build_login_envelope("user@example.com", "hunter2", "2abc")
            .unwrap();
        let b = handshake
            .build_login_envelope("user@example.com", "hunter2", "2abc")
            .unwrap();

        assert_eq!(a.aes_encrypt_data, b.aes_encrypt_data);
        assert_ne!(a.rsa_for_aes_key, b.rsa_for_aes_key);

        for envelope in [&a, &b] {
            let raw = STANDARD.decode(&envelope.rsa_for_aes_key).unwrap();
            let key = private.decrypt(Pkcs1v15Encrypt, &raw).unwrap();
            assert_eq!(key.as_slice(), AES_KEY);

            let plaintext = decrypt_aes_ecb(&envelope.aes_encrypt_data, AES_KEY);
            let payload: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
            assert_eq!(payload["account"], "user@example.com");
            assert_eq!(payload["loginType"], 2);
            assert_eq!(payload["macId"], "2abc");
        }
    }

    #[test]
    fn malformed_public_key_is_a_crypto_error() {
        let result = encrypt_rsa_pkcs1(AES_KEY, "not base64!!");
        assert!(matches!(result, Err(Error::Crypto { .. })));

        let result = encrypt_rsa_pkcs1(AES_KEY, &STANDARD.encode(b"garbage"));
        assert!(matches!(result, Err(Error::Crypto { .. })));
    }

    #[test]
    fn envelope_query_order() {
        let envelope = LoginEnvelope {
            aes_encrypt_data: "a".into(),
            rsa_for_aes_key: "r".into(),
        };
        assert_eq!(
            envelope.as_query(),
            [("aesEncryptData", "a"), ("rsaForAesKey", "r")]
        );
    }
}
