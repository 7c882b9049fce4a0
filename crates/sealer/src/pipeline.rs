//! Whole-file encrypt/decrypt: read → cipher → codec → atomic write.
//!
//! # Atomicity
//!
//! Output is only written once the complete result exists in memory, and then
//! through a uniquely named temp file in the destination directory that is
//! fsynced and renamed into place. A failed operation leaves neither the
//! output nor a temp file behind.
//!
//! # Errors
//!
//! This is the one layer that turns component errors into the caller-facing
//! [`SealError`]. Kinds are preserved: authentication failures and malformed
//! envelopes are never merged.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use common::SealError;
use tracing::{debug, info, warn};

use crate::convert::ConvertError;
use crate::crypto::{cipher, CipherError};
use crate::envelope::{self, EnvelopeError};
use crate::key::{KeyError, SymmetricKey};

/// Default upper bound for whole-file reads (256 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 256 * 1024 * 1024;

/// Room for the JSON wrapper, the encoded nonce and tag, and indentation.
const ENVELOPE_OVERHEAD: u64 = 256;

/// File transform pipeline bound to one key.
#[derive(Debug)]
pub struct Pipeline<'k> {
    key: &'k SymmetricKey,
    context: Vec<u8>,
    max_input_bytes: u64,
}

impl<'k> Pipeline<'k> {
    /// Pipeline with no associated data and the default input limit.
    pub fn new(key: &'k SymmetricKey) -> Self {
        Self {
            key,
            context: Vec::new(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }

    /// Bind `context` into every tag as associated data.
    ///
    /// Envelopes sealed with a context only open with the same context.
    pub fn with_context(mut self, context: impl Into<Vec<u8>>) -> Self {
        self.context = context.into();
        self
    }

    /// Refuse inputs larger than `limit` bytes.
    pub fn with_max_input_bytes(mut self, limit: u64) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Encrypt the whole of `input` into an envelope at `output`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`SealError::Io`] on read/write failure; `output` is untouched on any error.
    pub fn encrypt_file(&self, input: &Path, output: &Path) -> Result<u64, SealError> {
        let plaintext = self.read_input(input)?;
        self.encrypt_bytes(&plaintext, output)
    }

    /// Encrypt an in-memory payload (e.g. converter output) into an envelope at `output`.
    ///
    /// # Errors
    ///
    /// [`SealError::Unsupported`] if the payload exceeds the input limit, so
    /// every envelope written here can be opened under the same limit;
    /// [`SealError::Io`] if the envelope cannot be written.
    pub fn encrypt_bytes(&self, plaintext: &[u8], output: &Path) -> Result<u64, SealError> {
        self.check_plaintext_len(plaintext.len(), output)?;
        let sealed = cipher::encrypt(plaintext, self.key, &self.context)?;
        let document = envelope::encode(&sealed);
        let bytes = envelope::to_json(&document)?;
        write_atomic(output, &bytes)?;
        info!(
            output = %output.display(),
            plaintext_bytes = plaintext.len(),
            envelope_bytes = bytes.len(),
            "envelope written"
        );
        Ok(bytes.len() as u64)
    }

    /// Verify and decrypt the envelope at `input`, writing plaintext to `output`.
    ///
    /// Returns the number of plaintext bytes written.
    ///
    /// # Errors
    ///
    /// [`SealError::MalformedEnvelope`] if the document is invalid,
    /// [`SealError::Authentication`] if the tag does not verify, and
    /// [`SealError::Io`] on read/write failure. In every error case `output`
    /// is not created.
    pub fn decrypt_file(&self, input: &Path, output: &Path) -> Result<u64, SealError> {
        let raw = read_bounded(input, self.max_envelope_bytes())?;
        let document = envelope::from_json(&raw)?;
        let sealed = envelope::decode(&document)?;
        self.check_plaintext_len(sealed.ciphertext.len(), input)?;
        let plaintext = cipher::decrypt(&sealed, self.key, &self.context).map_err(|e| {
            warn!(input = %input.display(), "envelope failed authentication");
            SealError::from(e)
        })?;
        write_atomic(output, &plaintext)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            plaintext_bytes = plaintext.len(),
            "envelope opened"
        );
        Ok(plaintext.len() as u64)
    }

    /// Read a whole input file, enforcing the size limit first.
    ///
    /// # Errors
    ///
    /// [`SealError::Io`] if the file cannot be read, [`SealError::Unsupported`]
    /// if it exceeds the configured limit.
    pub fn read_input(&self, path: &Path) -> Result<Vec<u8>, SealError> {
        read_bounded(path, self.max_input_bytes)
    }

    /// Largest envelope that can hold a plaintext of `max_input_bytes`.
    fn max_envelope_bytes(&self) -> u64 {
        self.max_input_bytes
            .div_ceil(3)
            .saturating_mul(4)
            .saturating_add(ENVELOPE_OVERHEAD)
    }

    fn check_plaintext_len(&self, len: usize, path: &Path) -> Result<(), SealError> {
        if len as u64 > self.max_input_bytes {
            return Err(SealError::Unsupported(format!(
                "{} carries {len} payload bytes; limit is {} bytes",
                path.display(),
                self.max_input_bytes
            )));
        }
        Ok(())
    }
}

fn read_bounded(path: &Path, limit: u64) -> Result<Vec<u8>, SealError> {
    let len = fs::metadata(path)
        .map_err(|e| SealError::io(format!("failed to stat {}", path.display()), e))?
        .len();
    if len > limit {
        return Err(SealError::Unsupported(format!(
            "{} is {len} bytes; limit is {limit} bytes",
            path.display()
        )));
    }
    fs::read(path).map_err(|e| SealError::io(format!("failed to read {}", path.display()), e))
}

/// Write `bytes` to `path` via fsynced temp file + rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SealError> {
    let tmp = temp_path(path);
    let result = write_and_sync(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(SealError::io(format!("failed to write {}", path.display()), e));
    }
    debug!(path = %path.display(), bytes = bytes.len(), "output committed");
    Ok(())
}

/// Outputs are owner-only on Unix: decrypted files hold plaintext.
fn write_and_sync(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut opts = File::options();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

// ---------------------------------------------------------------------------
// Error translation
// ---------------------------------------------------------------------------

impl From<CipherError> for SealError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Authentication => SealError::Authentication,
            CipherError::Encryption => SealError::Internal(err.to_string()),
        }
    }
}

impl From<EnvelopeError> for SealError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Serialise(_) => SealError::Internal(err.to_string()),
            other => SealError::MalformedEnvelope(other.to_string()),
        }
    }
}

impl From<KeyError> for SealError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::NotFound(_) | KeyError::Read { .. } | KeyError::InvalidLength(_) => {
                SealError::KeyLoad(err.to_string())
            }
            KeyError::AlreadyExists(_) | KeyError::Persist { .. } => {
                SealError::KeyPersist(err.to_string())
            }
        }
    }
}

impl From<ConvertError> for SealError {
    fn from(err: ConvertError) -> Self {
        SealError::Conversion(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KEY_LEN;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Rewrite one field of the envelope at `path` with a single bit flipped.
    fn flip_bit(path: &Path, field: &str) {
        let mut doc: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        let mut raw = STANDARD.decode(doc[field].as_str().unwrap()).unwrap();
        raw[0] ^= 0x01;
        doc[field] = serde_json::Value::String(STANDARD.encode(raw));
        fs::write(path, doc.to_string()).unwrap();
    }

    #[test]
    fn file_round_trip() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let pipeline = Pipeline::new(&key);
        let input = dir.path().join("scan.pdf");
        let sealed = dir.path().join("scan.json");
        let opened = dir.path().join("scan.out.pdf");
        let body = b"%PDF-1.7\n\x00\x01\x02 binary body \xff".to_vec();
        fs::write(&input, &body).unwrap();

        pipeline.encrypt_file(&input, &sealed).unwrap();
        let written = pipeline.decrypt_file(&sealed, &opened).unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(fs::read(&opened).unwrap(), body);
        assert_eq!(entries(dir.path()), ["scan.json", "scan.out.pdf", "scan.pdf"]);
    }

    #[test]
    fn empty_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let pipeline = Pipeline::new(&key);
        let input = dir.path().join("empty.txt");
        fs::write(&input, b"").unwrap();
        pipeline.encrypt_file(&input, &dir.path().join("e.json")).unwrap();
        pipeline
            .decrypt_file(&dir.path().join("e.json"), &dir.path().join("back"))
            .unwrap();
        assert!(fs::read(dir.path().join("back")).unwrap().is_empty());
    }

    #[test]
    fn envelope_on_disk_has_expected_shape() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::from_bytes([0u8; KEY_LEN]);
        let out = dir.path().join("hello.json");
        Pipeline::new(&key).encrypt_bytes(b"hello world", &out).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("{\n    \"nonce\": "));
        let doc = envelope::from_json(text.as_bytes()).unwrap();
        let sealed = envelope::decode(&doc).unwrap();
        assert_eq!(sealed.ciphertext.len(), 11);
    }

    #[test]
    fn tampered_fields_fail_authentication_without_output() {
        for field in ["nonce", "ciphertext", "tag"] {
            let dir = TempDir::new().unwrap();
            let key = SymmetricKey::generate();
            let pipeline = Pipeline::new(&key);
            let sealed = dir.path().join("sealed.json");
            let output = dir.path().join("plain.txt");
            pipeline.encrypt_bytes(b"confidential", &sealed).unwrap();
            flip_bit(&sealed, field);

            let err = pipeline.decrypt_file(&sealed, &output).unwrap_err();
            assert!(matches!(err, SealError::Authentication), "{field}: {err}");
            assert_eq!(entries(dir.path()), ["sealed.json"], "{field}");
        }
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let dir = TempDir::new().unwrap();
        let sealed = dir.path().join("sealed.json");
        let zeros = SymmetricKey::from_bytes([0u8; KEY_LEN]);
        let ones = SymmetricKey::from_bytes([1u8; KEY_LEN]);
        Pipeline::new(&zeros).encrypt_bytes(b"hello world", &sealed).unwrap();

        let err = Pipeline::new(&ones)
            .decrypt_file(&sealed, &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, SealError::Authentication));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn missing_tag_is_malformed_not_authentication() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let sealed = dir.path().join("sealed.json");
        fs::write(&sealed, r#"{"nonce": "AAAAAAAAAAAAAAAA", "ciphertext": ""}"#).unwrap();

        let err = Pipeline::new(&key)
            .decrypt_file(&sealed, &dir.path().join("out"))
            .unwrap_err();
        match err {
            SealError::MalformedEnvelope(msg) => assert!(msg.contains("tag"), "{msg}"),
            other => panic!("expected malformed envelope, got {other:?}"),
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn context_mismatch_fails_authentication() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let sealed = dir.path().join("sealed.json");
        Pipeline::new(&key)
            .with_context("ward-b/labs.csv")
            .encrypt_bytes(b"[]", &sealed)
            .unwrap();

        let out = dir.path().join("out");
        assert!(matches!(
            Pipeline::new(&key).decrypt_file(&sealed, &out),
            Err(SealError::Authentication)
        ));
        Pipeline::new(&key)
            .with_context("ward-b/labs.csv")
            .decrypt_file(&sealed, &out)
            .unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"[]");
    }

    #[test]
    fn oversized_input_is_rejected_before_reading() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let input = dir.path().join("big.pdf");
        fs::write(&input, vec![0u8; 64]).unwrap();
        let err = Pipeline::new(&key)
            .with_max_input_bytes(63)
            .encrypt_file(&input, &dir.path().join("big.json"))
            .unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)));
        assert!(!dir.path().join("big.json").exists());
    }

    #[test]
    fn input_near_the_limit_round_trips() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let pipeline = Pipeline::new(&key).with_max_input_bytes(1000);
        let sealed = dir.path().join("e.json");
        let opened = dir.path().join("e.out");

        for len in [0usize, 1, 749, 750, 900, 999, 1000] {
            let body = vec![0xA5u8; len];
            pipeline.encrypt_bytes(&body, &sealed).unwrap();
            pipeline.decrypt_file(&sealed, &opened).unwrap();
            assert_eq!(fs::read(&opened).unwrap(), body, "len {len}");
        }
    }

    #[test]
    fn oversized_payload_is_refused_at_encrypt() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let out = dir.path().join("e.json");
        let err = Pipeline::new(&key)
            .with_max_input_bytes(10)
            .encrypt_bytes(&[0u8; 11], &out)
            .unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)));
        assert!(!out.exists());
    }

    #[test]
    fn envelope_over_a_smaller_limit_is_refused() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let sealed = dir.path().join("e.json");
        Pipeline::new(&key).encrypt_bytes(&[1u8; 600], &sealed).unwrap();

        let out = dir.path().join("out");
        let err = Pipeline::new(&key)
            .with_max_input_bytes(500)
            .decrypt_file(&sealed, &out)
            .unwrap_err();
        assert!(matches!(err, SealError::Unsupported(_)));
        assert!(!out.exists());
    }

    #[cfg(unix)]
    #[test]
    fn outputs_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let pipeline = Pipeline::new(&key);
        let sealed = dir.path().join("sealed.json");
        let opened = dir.path().join("plain.txt");
        fs::write(&opened, b"stale").unwrap();

        pipeline.encrypt_bytes(b"ward: B", &sealed).unwrap();
        pipeline.decrypt_file(&sealed, &opened).unwrap();
        for path in [&sealed, &opened] {
            let mode = fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
        }
    }

    #[test]
    fn internal_failures_are_not_reported_as_rejected_input() {
        assert!(matches!(SealError::from(CipherError::Encryption), SealError::Internal(_)));
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let err = Pipeline::new(&key)
            .encrypt_file(&dir.path().join("absent.pdf"), &dir.path().join("x.json"))
            .unwrap_err();
        assert!(matches!(err, SealError::Io { .. }));
    }

    #[test]
    fn unwritable_output_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let output = dir.path().join("no_such_dir").join("x.json");
        let err = Pipeline::new(&key).encrypt_bytes(b"x", &output).unwrap_err();
        assert!(matches!(err, SealError::Io { .. }));
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn existing_output_is_replaced() {
        let dir = TempDir::new().unwrap();
        let key = SymmetricKey::generate();
        let out = dir.path().join("sealed.json");
        fs::write(&out, b"stale").unwrap();
        Pipeline::new(&key).encrypt_bytes(b"fresh", &out).unwrap();
        assert!(envelope::from_json(&fs::read(&out).unwrap()).is_ok());
    }

    #[test]
    fn key_errors_keep_their_kind() {
        let load = SealError::from(KeyError::InvalidLength(3));
        assert!(matches!(load, SealError::KeyLoad(_)));
        let persist = SealError::from(KeyError::AlreadyExists(PathBuf::from("key")));
        assert!(matches!(persist, SealError::KeyPersist(_)));
    }
}
