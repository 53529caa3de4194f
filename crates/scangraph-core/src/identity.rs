use sha2::{Digest, Sha256};
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 of the file's bytes as lowercase hex.
pub fn file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn bytes_checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Deterministic 16-hex-char identifier for a natural key within a namespace.
pub fn stable_id(namespace: &str, key: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(namespace.as_bytes());
    hasher.write_u8(0);
    hasher.write(key.as_bytes());
    format!("{:016x}", hasher.finish())
}

pub fn dataset_id(checksum: &str) -> String {
    stable_id("dataset", checksum)
}

pub fn research_object_id(key: &str) -> String {
    stable_id("research-object", key)
}

/// Lowercased extension including the leading dot, or empty.
pub fn normalize_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Parent directory as a string; empty for paths without one.
pub fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

pub fn guess_mime(extension: &str) -> &'static str {
    match extension {
        ".txt" | ".log" => "text/plain",
        ".md" | ".markdown" => "text/markdown",
        ".csv" => "text/csv",
        ".tsv" => "text/tab-separated-values",
        ".json" => "application/json",
        ".xml" => "application/xml",
        ".yaml" | ".yml" => "application/yaml",
        ".toml" => "application/toml",
        ".html" | ".htm" => "text/html",
        ".py" => "text/x-python",
        ".rs" => "text/x-rust",
        ".c" | ".h" => "text/x-c",
        ".pdf" => "application/pdf",
        ".zip" => "application/zip",
        ".gz" => "application/gzip",
        ".tar" => "application/x-tar",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".tif" | ".tiff" => "image/tiff",
        ".svg" => "image/svg+xml",
        ".h5" | ".hdf5" => "application/x-hdf5",
        ".nc" => "application/x-netcdf",
        ".parquet" => "application/vnd.apache.parquet",
        _ => "application/octet-stream",
    }
}

pub fn is_text_mime(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/json" | "application/xml" | "application/yaml" | "application/toml"
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bytes_checksum_known_vector() {
        assert_eq!(
            bytes_checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_checksum_is_lowercase_hex() {
        let checksum = bytes_checksum(b"");
        assert_eq!(
            checksum,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(checksum.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_file_checksum_matches_bytes_checksum() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = vec![0x5Au8; READ_BUFFER_SIZE * 2 + 17];
        file.write_all(&content).unwrap();
        assert_eq!(file_checksum(file.path()).unwrap(), bytes_checksum(&content));
    }

    #[test]
    fn test_stable_id_is_deterministic_and_namespaced() {
        let a = dataset_id("abc");
        assert_eq!(a, dataset_id("abc"));
        assert_eq!(a.len(), 16);
        assert_ne!(a, dataset_id("abd"));
        assert_ne!(a, research_object_id("abc"));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(Path::new("/x/Report.PDF")), ".pdf");
        assert_eq!(normalize_extension(Path::new("/x/Makefile")), "");
        assert_eq!(normalize_extension(Path::new("/x/a.tar.GZ")), ".gz");
    }

    #[test]
    fn test_parent_dir_and_name() {
        assert_eq!(parent_dir("/x/f1.txt"), "/x");
        assert_eq!(parent_dir("f1.txt"), "");
        assert_eq!(file_name("/x/f1.txt"), "f1.txt");
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(".csv"), "text/csv");
        assert_eq!(guess_mime(".weird"), "application/octet-stream");
        assert!(is_text_mime(guess_mime(".md")));
        assert!(!is_text_mime(guess_mime(".png")));
    }
}
