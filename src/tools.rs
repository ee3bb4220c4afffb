//! Developer tools: GUID, hash, and ASP.NET machine key generators.
//!
//! These are pure functions over random bytes and input text; the HTTP
//! handlers in [`crate::handlers`] only parse requests and map errors.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;
use sha2::Digest;
use thiserror::Error;

/// Longest plaintext accepted by [`compute_hash`], in characters.
pub const MAX_PLAINTEXT_LENGTH: usize = 4096;

/// Errors raised by the tool generators.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ToolError {
    #[error("The specified GUID format '{0}' is invalid.")]
    InvalidGuidFormat(String),

    #[error("The specified hash algorithm '{0}' is invalid.")]
    InvalidHashAlgorithm(String),

    #[error("The specified hash format '{0}' is invalid.")]
    InvalidHashFormat(String),

    #[error("The plaintext to hash cannot be more than {0} characters in length.")]
    PlaintextTooLong(usize),

    #[error("The specified decryption algorithm name is invalid.")]
    InvalidDecryptionAlgorithm,

    #[error("The specified validation algorithm name is invalid.")]
    InvalidValidationAlgorithm,

    #[error("Failed to generate random bytes: {0}")]
    Random(String),
}

fn random_bytes(buffer: &mut [u8]) -> Result<(), ToolError> {
    getrandom::getrandom(buffer).map_err(|e| ToolError::Random(e.to_string()))
}

/// String representations of a GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuidFormat {
    /// `00000000000000000000000000000000`
    N,
    /// `00000000-0000-0000-0000-000000000000`
    #[default]
    D,
    /// `{00000000-0000-0000-0000-000000000000}`
    B,
    /// `(00000000-0000-0000-0000-000000000000)`
    P,
    /// `{0x00000000,0x0000,0x0000,{0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00}}`
    X,
}

impl GuidFormat {
    /// Parses a single-letter format specifier. Blank means `D`.
    pub fn parse(value: Option<&str>) -> Result<Self, ToolError> {
        let value = value.map(str::trim).unwrap_or_default();

        match value.to_ascii_uppercase().as_str() {
            "" | "D" => Ok(Self::D),
            "N" => Ok(Self::N),
            "B" => Ok(Self::B),
            "P" => Ok(Self::P),
            "X" => Ok(Self::X),
            _ => Err(ToolError::InvalidGuidFormat(value.to_string())),
        }
    }
}

/// Formats 16 bytes as a GUID in lowercase hexadecimal.
pub fn format_guid(bytes: &[u8; 16], format: GuidFormat) -> String {
    let hex = hex::encode(bytes);
    let (a, rest) = hex.split_at(8);
    let (b, rest) = rest.split_at(4);
    let (c, d) = rest.split_at(4);
    let dashed = format!("{}-{}-{}-{}-{}", a, b, c, &d[..4], &d[4..]);

    match format {
        GuidFormat::N => hex.clone(),
        GuidFormat::D => dashed,
        GuidFormat::B => format!("{{{}}}", dashed),
        GuidFormat::P => format!("({})", dashed),
        GuidFormat::X => {
            let tail = bytes[8..]
                .iter()
                .map(|byte| format!("0x{:02x}", byte))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{0x{},0x{},0x{},{{{}}}}}", a, b, c, tail)
        }
    }
}

/// Generates a random version 4 GUID.
///
/// # Example
///
/// ```rust
/// use costello_site::tools::{generate_guid, GuidFormat};
///
/// let guid = generate_guid(GuidFormat::D, false).unwrap();
/// assert_eq!(guid.len(), 36);
/// assert_eq!(&guid[14..15], "4");
/// ```
pub fn generate_guid(format: GuidFormat, uppercase: bool) -> Result<String, ToolError> {
    let mut bytes = [0u8; 16];
    random_bytes(&mut bytes)?;

    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let guid = format_guid(&bytes, format);
    debug!("Generated a new GUID in format {:?}", format);

    Ok(if uppercase {
        guid.to_uppercase()
    } else {
        guid
    })
}

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Parses an algorithm name such as `SHA256` or `sha-256`. Blank means SHA-256.
    pub fn parse(value: Option<&str>) -> Result<Self, ToolError> {
        let value = value.map(str::trim).unwrap_or_default();
        let normalized = value.replace('-', "").to_ascii_uppercase();

        match normalized.as_str() {
            "" | "SHA256" => Ok(Self::Sha256),
            "MD5" => Ok(Self::Md5),
            "SHA" | "SHA1" => Ok(Self::Sha1),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(ToolError::InvalidHashAlgorithm(value.to_string())),
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => md5::Md5::digest(data).to_vec(),
            Self::Sha1 => sha1::Sha1::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// Output encodings for [`compute_hash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFormat {
    #[default]
    Hexadecimal,
    Base64,
}

impl HashFormat {
    /// Parses `hexadecimal` (or `hex`) and `base64`, ignoring case. Blank means hexadecimal.
    pub fn parse(value: Option<&str>) -> Result<Self, ToolError> {
        let value = value.map(str::trim).unwrap_or_default();

        match value.to_ascii_lowercase().as_str() {
            "" | "hex" | "hexadecimal" => Ok(Self::Hexadecimal),
            "base64" => Ok(Self::Base64),
            _ => Err(ToolError::InvalidHashFormat(value.to_string())),
        }
    }
}

/// Hashes `plaintext` encoded as ASCII, replacing other characters with `?`.
///
/// # Returns
///
/// - `Ok(String)`: The hash as lowercase hexadecimal or standard base64
/// - `Err(ToolError::PlaintextTooLong)`: If `plaintext` exceeds 4096 characters
///
/// # Example
///
/// ```rust
/// use costello_site::tools::{compute_hash, HashAlgorithm, HashFormat};
///
/// let hash = compute_hash("abc", HashAlgorithm::Sha1, HashFormat::Hexadecimal).unwrap();
/// assert_eq!(hash, "a9993e364706816aba3e25717850c26c9cd0d89d");
/// ```
pub fn compute_hash(
    plaintext: &str,
    algorithm: HashAlgorithm,
    format: HashFormat,
) -> Result<String, ToolError> {
    if plaintext.chars().count() > MAX_PLAINTEXT_LENGTH {
        return Err(ToolError::PlaintextTooLong(MAX_PLAINTEXT_LENGTH));
    }

    // One '?' per UTF-16 code unit, so characters outside the BMP become "??"
    let ascii: Vec<u8> = plaintext
        .chars()
        .flat_map(|c| {
            if c.is_ascii() {
                vec![c as u8]
            } else {
                vec![b'?'; c.len_utf16()]
            }
        })
        .collect();

    let hash = algorithm.digest(&ascii);
    debug!("Computed {:?} hash of {} bytes", algorithm, ascii.len());

    Ok(match format {
        HashFormat::Hexadecimal => hex::encode(hash),
        HashFormat::Base64 => BASE64.encode(hash),
    })
}

const DECRYPTION_KEY_SIZES: [(&str, usize); 5] = [
    ("3DES", 24),
    ("AES-128", 16),
    ("AES-192", 24),
    ("AES-256", 32),
    ("DES", 32),
];

const VALIDATION_KEY_SIZES: [(&str, usize); 7] = [
    ("3DES", 24),
    ("AES", 32),
    ("MD5", 16),
    ("HMACSHA256", 32),
    ("HMACSHA384", 48),
    ("HMACSHA512", 64),
    ("SHA1", 64),
];

fn key_size(table: &[(&str, usize)], name: &str) -> Option<usize> {
    table
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, size)| *size)
}

/// Generates an ASP.NET `<machineKey>` element with random keys.
///
/// Key lengths follow the chosen algorithms. The random key buffers are
/// zeroed before returning.
pub fn generate_machine_key(
    decryption_algorithm: &str,
    validation_algorithm: &str,
) -> Result<String, ToolError> {
    let decryption_algorithm = decryption_algorithm.trim();
    let validation_algorithm = validation_algorithm.trim();

    let decryption_length = key_size(&DECRYPTION_KEY_SIZES, decryption_algorithm)
        .ok_or(ToolError::InvalidDecryptionAlgorithm)?;
    let validation_length = key_size(&VALIDATION_KEY_SIZES, validation_algorithm)
        .ok_or(ToolError::InvalidValidationAlgorithm)?;

    let mut decryption_key = vec![0u8; decryption_length];
    let mut validation_key = vec![0u8; validation_length];

    let result = random_bytes(&mut decryption_key)
        .and_then(|_| random_bytes(&mut validation_key))
        .map(|_| {
            let decryption_name = match decryption_algorithm.rfind('-') {
                Some(index) => &decryption_algorithm[..index],
                None => decryption_algorithm,
            };

            format!(
                "<machineKey validationKey=\"{}\"\n            decryptionKey=\"{}\"\n            validation=\"{}\"\n            decryption=\"{}\" />",
                hex::encode_upper(&validation_key),
                hex::encode_upper(&decryption_key),
                validation_algorithm,
                decryption_name
            )
        });

    decryption_key.fill(0);
    validation_key.fill(0);

    result
}
