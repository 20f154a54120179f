//! Lossless serde encoding for record paths.
//!
//! Paths that are valid UTF-8 are written as plain JSON strings. Anything
//! else is written as `{"raw": "<base64>"}` holding the platform's native
//! representation: the OS bytes on unix, little-endian UTF-16 units on
//! Windows. Use with `#[serde(with = "path_codec")]`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PathRepr {
    Utf8(String),
    Raw { raw: String },
}

pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    let repr = match path.to_str() {
        Some(s) => PathRepr::Utf8(s.to_string()),
        None => PathRepr::Raw {
            raw: STANDARD.encode(native_bytes(path)),
        },
    };
    repr.serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
    match PathRepr::deserialize(deserializer)? {
        PathRepr::Utf8(s) => Ok(PathBuf::from(s)),
        PathRepr::Raw { raw } => {
            let bytes = STANDARD.decode(raw).map_err(D::Error::custom)?;
            from_native_bytes(bytes)
                .map(PathBuf::from)
                .ok_or_else(|| D::Error::custom("malformed raw path"))
        }
    }
}

#[cfg(unix)]
fn native_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn from_native_bytes(bytes: Vec<u8>) -> Option<OsString> {
    use std::os::unix::ffi::OsStringExt;
    Some(OsString::from_vec(bytes))
}

#[cfg(windows)]
fn native_bytes(path: &Path) -> Vec<u8> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str()
        .encode_wide()
        .flat_map(u16::to_le_bytes)
        .collect()
}

#[cfg(windows)]
fn from_native_bytes(bytes: Vec<u8>) -> Option<OsString> {
    use std::os::windows::ffi::OsStringExt;
    if bytes.len() % 2 != 0 {
        return None;
    }
    let wide: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Some(OsString::from_wide(&wide))
}

// Every path on other platforms is UTF-8.
#[cfg(not(any(unix, windows)))]
fn native_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(any(unix, windows)))]
fn from_native_bytes(bytes: Vec<u8>) -> Option<OsString> {
    String::from_utf8(bytes).ok().map(OsString::from)
}
