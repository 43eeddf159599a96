//! Stream cipher service: AES-256-CBC over byte streams.
//!
//! Assets are encrypted once, at securing time, with a key and IV drawn
//! from the OS random source. Both are persisted alongside the asset and
//! used verbatim for every later decryption; nothing is re-derived.
//!
//! Encryption and decryption are chunked so memory use is independent of
//! file size. PKCS#7 padding always appends a final padding block, so
//! ciphertext length is `plaintext + (16 - plaintext % 16)`.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use aes::Aes256;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CoreError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Chunk size for stream processing. Must be a multiple of [`BLOCK_SIZE`].
const CHUNK_SIZE: usize = 64 * 1024;

/// A 256-bit AES key.
///
/// `Debug` is redacted; use [`CipherKey::to_hex`] only where persistence
/// explicitly requires it.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; 32]);

impl CipherKey {
    /// Generate a new key from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex for persistence.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| CoreError::InvalidKeyLength(s.len() / 2))?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidKeyLength(len))?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(redacted)")
    }
}

/// A 128-bit AES-CBC initialization vector.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherIv([u8; 16]);

impl CipherIv {
    /// Generate a new IV from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex for persistence.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| CoreError::InvalidIvLength(s.len() / 2))?;
        let len = bytes.len();
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidIvLength(len))?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for CipherIv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherIv(redacted)")
    }
}

/// The per-asset encryption envelope: key plus IV.
///
/// Sealed onto an asset exactly once, at securing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key: CipherKey,
    pub iv: CipherIv,
}

impl KeyMaterial {
    /// Generate fresh key material.
    pub fn generate() -> Self {
        Self {
            key: CipherKey::generate(),
            iv: CipherIv::generate(),
        }
    }

    /// Rebuild from persisted hex strings.
    pub fn from_hex(key: &str, iv: &str) -> Result<Self> {
        Ok(Self {
            key: CipherKey::from_hex(key)?,
            iv: CipherIv::from_hex(iv)?,
        })
    }
}

/// Encrypt `reader` into `writer`, generating fresh key material.
///
/// Returns the generated key and IV for the caller to persist. Any I/O
/// error fails the whole operation; the caller is responsible for
/// removing partial output.
pub fn encrypt_stream<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> Result<KeyMaterial> {
    let material = KeyMaterial::generate();
    encrypt_stream_with(reader, writer, &material)?;
    Ok(material)
}

/// Encrypt `reader` into `writer` under existing key material.
pub fn encrypt_stream_with<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    material: &KeyMaterial,
) -> Result<()> {
    let mut enc = Aes256CbcEnc::new(
        GenericArray::from_slice(material.key.as_bytes()),
        GenericArray::from_slice(material.iv.as_bytes()),
    );

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut filled = 0usize;

    loop {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == CHUNK_SIZE {
            for block in buf.chunks_exact_mut(BLOCK_SIZE) {
                enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            writer.write_all(&buf)?;
            filled = 0;
        }
    }

    // Trailing data: encrypt whole blocks in place, then pad the tail.
    let full = filled - (filled % BLOCK_SIZE);
    for block in buf[..full].chunks_exact_mut(BLOCK_SIZE) {
        enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    writer.write_all(&buf[..full])?;

    let rem = filled - full;
    let mut tail = [0u8; BLOCK_SIZE];
    tail[..rem].copy_from_slice(&buf[full..filled]);
    let padded = enc
        .encrypt_padded_mut::<Pkcs7>(&mut tail, rem)
        .map_err(|_| CoreError::MalformedPadding)?;
    writer.write_all(padded)?;
    writer.flush()?;
    Ok(())
}

/// Decrypt `reader` into `writer` under the asset's key material.
///
/// The final block is held back until end of input so its padding can be
/// stripped. Truncated input (not a block multiple, or empty) and
/// malformed padding fail the whole operation.
pub fn decrypt_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    material: &KeyMaterial,
) -> Result<()> {
    let mut dec = Aes256CbcDec::new(
        GenericArray::from_slice(material.key.as_bytes()),
        GenericArray::from_slice(material.iv.as_bytes()),
    );

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut filled = 0usize;
    let mut pending: Option<[u8; BLOCK_SIZE]> = None;

    loop {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == CHUNK_SIZE {
            if let Some(prev) = pending.take() {
                writer.write_all(&prev)?;
            }
            for block in buf.chunks_exact_mut(BLOCK_SIZE) {
                dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            writer.write_all(&buf[..CHUNK_SIZE - BLOCK_SIZE])?;
            let mut last = [0u8; BLOCK_SIZE];
            last.copy_from_slice(&buf[CHUNK_SIZE - BLOCK_SIZE..]);
            pending = Some(last);
            filled = 0;
        }
    }

    if filled % BLOCK_SIZE != 0 {
        return Err(CoreError::TruncatedCiphertext);
    }
    if filled > 0 {
        if let Some(prev) = pending.take() {
            writer.write_all(&prev)?;
        }
        for block in buf[..filled].chunks_exact_mut(BLOCK_SIZE) {
            dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        writer.write_all(&buf[..filled - BLOCK_SIZE])?;
        let mut last = [0u8; BLOCK_SIZE];
        last.copy_from_slice(&buf[filled - BLOCK_SIZE..filled]);
        pending = Some(last);
    }

    // The very last block carries the padding.
    let last = pending.ok_or(CoreError::TruncatedCiphertext)?;
    let pad = last[BLOCK_SIZE - 1] as usize;
    if pad == 0 || pad > BLOCK_SIZE {
        return Err(CoreError::MalformedPadding);
    }
    if last[BLOCK_SIZE - pad..].iter().any(|&b| b as usize != pad) {
        return Err(CoreError::MalformedPadding);
    }
    writer.write_all(&last[..BLOCK_SIZE - pad])?;
    writer.flush()?;
    Ok(())
}

/// Encrypt the file at `input` into `output`, generating key material.
///
/// Removes the partial output file if encryption fails.
pub fn encrypt_file(input: &Path, output: &Path) -> Result<KeyMaterial> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    match encrypt_stream(&mut reader, &mut writer) {
        Ok(material) => Ok(material),
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(output);
            Err(e)
        }
    }
}

/// Decrypt the file at `input` into `output` under `material`.
///
/// Removes the partial output file if decryption fails.
pub fn decrypt_file(input: &Path, output: &Path, material: &KeyMaterial) -> Result<()> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    match decrypt_stream(&mut reader, &mut writer, material) {
        Ok(()) => Ok(()),
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(output);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(plaintext: &[u8]) -> Vec<u8> {
        let mut ciphertext = Vec::new();
        let material = encrypt_stream(&mut Cursor::new(plaintext), &mut ciphertext).unwrap();

        // PKCS#7 always appends a padding block.
        let expected_len = plaintext.len() + (BLOCK_SIZE - plaintext.len() % BLOCK_SIZE);
        assert_eq!(ciphertext.len(), expected_len);

        let mut recovered = Vec::new();
        decrypt_stream(&mut Cursor::new(&ciphertext), &mut recovered, &material).unwrap();
        recovered
    }

    #[test]
    fn test_roundtrip_empty() {
        assert_eq!(roundtrip(b""), b"");
    }

    #[test]
    fn test_roundtrip_single_byte() {
        assert_eq!(roundtrip(b"x"), b"x");
    }

    #[test]
    fn test_roundtrip_block_aligned() {
        let data = vec![0x5a; BLOCK_SIZE * 4];
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_roundtrip_multi_chunk() {
        // Crosses the chunk boundary with a ragged tail.
        let data: Vec<u8> = (0..(CHUNK_SIZE * 2 + 7777)).map(|i| (i % 251) as u8).collect();
        assert_eq!(roundtrip(&data), data);
    }

    #[test]
    fn test_nist_cbc_aes256_first_block() {
        // NIST SP 800-38A, F.2.5 CBC-AES256.Encrypt, block 1. Padding only
        // affects the appended block, so the first block must match.
        let key = CipherKey::from_hex(
            "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
        )
        .unwrap();
        let iv = CipherIv::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let material = KeyMaterial { key, iv };

        let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let mut ciphertext = Vec::new();
        encrypt_stream_with(&mut Cursor::new(&plaintext), &mut ciphertext, &material).unwrap();

        assert_eq!(
            hex::encode(&ciphertext[..BLOCK_SIZE]),
            "f58c4c04d6e5f1ba779eabfb5f7bfbd6"
        );
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let mut ciphertext = Vec::new();
        let material =
            encrypt_stream(&mut Cursor::new(&b"some plaintext"[..]), &mut ciphertext).unwrap();

        let truncated = &ciphertext[..ciphertext.len() - 3];
        let mut out = Vec::new();
        let err = decrypt_stream(&mut Cursor::new(truncated), &mut out, &material).unwrap_err();
        assert!(matches!(err, CoreError::TruncatedCiphertext));
    }

    #[test]
    fn test_empty_ciphertext_fails() {
        let material = KeyMaterial::generate();
        let mut out = Vec::new();
        let err = decrypt_stream(&mut Cursor::new(&b""[..]), &mut out, &material).unwrap_err();
        assert!(matches!(err, CoreError::TruncatedCiphertext));
    }

    #[test]
    fn test_wrong_key_is_malformed() {
        let mut ciphertext = Vec::new();
        encrypt_stream(&mut Cursor::new(&b"licensed content"[..]), &mut ciphertext).unwrap();

        let wrong = KeyMaterial::generate();
        let mut out = Vec::new();
        // With an unrelated key the padding check fails with overwhelming
        // probability; CBC has no authentication tag to catch it earlier.
        assert!(decrypt_stream(&mut Cursor::new(&ciphertext), &mut out, &wrong).is_err());
    }

    #[test]
    fn test_key_material_hex_roundtrip() {
        let material = KeyMaterial::generate();
        let recovered =
            KeyMaterial::from_hex(&material.key.to_hex(), &material.iv.to_hex()).unwrap();
        assert_eq!(material, recovered);
    }

    #[test]
    fn test_key_hex_rejects_bad_length() {
        assert!(matches!(
            CipherKey::from_hex("abcd").unwrap_err(),
            CoreError::InvalidKeyLength(2)
        ));
        assert!(matches!(
            CipherIv::from_hex("abcd").unwrap_err(),
            CoreError::InvalidIvLength(2)
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let material = KeyMaterial::generate();
        let dbg = format!("{:?}", material);
        assert!(dbg.contains("redacted"));
        assert!(!dbg.contains(&material.key.to_hex()));
    }

    #[test]
    fn test_file_roundtrip_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plain.bin");
        let enc = dir.path().join("plain.bin.enc");
        let out = dir.path().join("recovered.bin");

        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 256) as u8).collect();
        std::fs::write(&input, &data).unwrap();

        let material = encrypt_file(&input, &enc).unwrap();
        decrypt_file(&enc, &out, &material).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), data);

        // A corrupt source must not leave partial plaintext behind.
        std::fs::write(&enc, b"short").unwrap();
        let out2 = dir.path().join("partial.bin");
        assert!(decrypt_file(&enc, &out2, &material).is_err());
        assert!(!out2.exists());
    }
}
