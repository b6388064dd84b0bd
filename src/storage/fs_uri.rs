//! File URI helpers.
//!
//! Converts filesystem paths to `file:` URIs and back, following RFC 8089 with path segments
//! percent-encoded per RFC 3986:
//!  - relative paths become `file:<segments>`,
//!  - absolute paths become `file:///<segments>`,
//!  - Windows drive-letter paths become `file:///C:/<segments>` (colon preserved), and
//!  - UNC paths (`//server/share/...`) become `file://server/share/...`.
//!
//! Backslash separators are normalized to `/`, so a round trip yields the normalized path.

use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

/// Characters percent-encoded within a path segment (RFC 3986 reserved plus unsafe characters).
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A file URI conversion error.
#[derive(Debug, Error)]
pub enum FsUriError {
    /// The path is not valid UTF-8.
    #[error("path {0:?} is not valid UTF-8")]
    InvalidPath(PathBuf),
    /// The URI is not a `file:` URI or is malformed.
    #[error("invalid file URI {0}")]
    InvalidUri(String),
}

fn is_drive_letter(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/' || bytes[2] == b'\\')
}

fn encode_segments(path: &str) -> String {
    path.split(['/', '\\'])
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_segments(path: &str) -> Result<String, FsUriError> {
    path.split('/')
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|s| s.into_owned())
                .map_err(|_| FsUriError::InvalidUri(path.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|segments| segments.join("/"))
}

/// Convert a filesystem path to a `file:` URI.
///
/// # Errors
/// Returns [`FsUriError`] if the path is not valid UTF-8.
pub fn path_to_uri(path: &Path) -> Result<String, FsUriError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| FsUriError::InvalidPath(path.to_path_buf()))?;

    // UNC paths carry an authority
    if let Some(rest) = path_str
        .strip_prefix(r"\\")
        .or_else(|| path_str.strip_prefix("//"))
    {
        let (authority, path) = rest
            .split_once(['/', '\\'])
            .unwrap_or((rest, ""));
        return Ok(format!(
            "file://{}/{}",
            utf8_percent_encode(authority, PATH_SEGMENT),
            encode_segments(path)
        ));
    }

    // Windows drive letter paths keep the colon
    if is_drive_letter(path_str) {
        let drive = &path_str[..2];
        let rest = path_str[2..].trim_start_matches(['/', '\\']);
        return if rest.is_empty() {
            Ok(format!("file:///{drive}/"))
        } else {
            Ok(format!("file:///{drive}/{}", encode_segments(rest)))
        };
    }

    if let Some(rest) = path_str.strip_prefix('/') {
        return Ok(format!("file:///{}", encode_segments(rest)));
    }

    Ok(format!("file:{}", encode_segments(path_str)))
}

/// Convert a `file:` URI to a filesystem path.
///
/// # Errors
/// Returns [`FsUriError`] if the URI is not a valid `file:` URI.
pub fn uri_to_path(uri: &str) -> Result<PathBuf, FsUriError> {
    let rest = uri
        .strip_prefix("file:")
        .ok_or_else(|| FsUriError::InvalidUri(uri.to_string()))?;

    if let Some(rest) = rest.strip_prefix("///") {
        let decoded = decode_segments(rest)?;
        if is_drive_letter(&decoded) || (decoded.len() == 3 && decoded.ends_with(":/")) {
            // drive letter path; trim the trailing slash of a bare drive
            return Ok(PathBuf::from(decoded.trim_end_matches('/').to_string()));
        }
        return Ok(PathBuf::from(format!("/{decoded}")));
    }

    if let Some(rest) = rest.strip_prefix("//") {
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let authority = percent_decode_str(authority)
            .decode_utf8()
            .map_err(|_| FsUriError::InvalidUri(uri.to_string()))?;
        let decoded = decode_segments(path)?;
        return Ok(PathBuf::from(format!("//{authority}/{decoded}")));
    }

    // `file:/abs` is an accepted RFC 8089 minimal form
    if let Some(stripped) = rest.strip_prefix('/') {
        return Ok(PathBuf::from(format!("/{}", decode_segments(stripped)?)));
    }
    Ok(PathBuf::from(decode_segments(rest)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_absolute_round_trip() {
        let path = Path::new("/data/my array.zarr");
        let uri = path_to_uri(path).unwrap();
        assert_eq!(uri, "file:///data/my%20array.zarr");
        assert_eq!(uri_to_path(&uri).unwrap(), path);
    }

    #[test]
    fn uri_relative_round_trip() {
        let path = Path::new("data/array.zarr");
        let uri = path_to_uri(path).unwrap();
        assert_eq!(uri, "file:data/array.zarr");
        assert_eq!(uri_to_path(&uri).unwrap(), path);
    }

    #[test]
    fn uri_utf8_round_trip() {
        let path = Path::new("/data/µs/東京");
        let uri = path_to_uri(path).unwrap();
        assert!(uri.starts_with("file:///data/%C2%B5s/"));
        assert_eq!(uri_to_path(&uri).unwrap(), path);
    }

    #[test]
    fn uri_windows_drive() {
        let uri = path_to_uri(Path::new("C:/data/array.zarr")).unwrap();
        assert_eq!(uri, "file:///C:/data/array.zarr");
        assert_eq!(uri_to_path(&uri).unwrap(), Path::new("C:/data/array.zarr"));

        let uri = path_to_uri(Path::new(r"C:\data\array.zarr")).unwrap();
        assert_eq!(uri, "file:///C:/data/array.zarr");
    }

    #[test]
    fn uri_unc_authority() {
        let uri = path_to_uri(Path::new(r"\\server\share\array.zarr")).unwrap();
        assert_eq!(uri, "file://server/share/array.zarr");
        assert_eq!(
            uri_to_path(&uri).unwrap(),
            Path::new("//server/share/array.zarr")
        );
    }

    #[test]
    fn uri_invalid() {
        assert!(uri_to_path("http://example.com").is_err());
    }
}
