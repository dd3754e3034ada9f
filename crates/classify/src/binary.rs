//! Binary detection (spec component C2, binary half).
//!
//! Reads up to 8 KiB from the head of the file. Binary if that prefix
//! contains a NUL byte or fails UTF-8 decoding. Unreadable files are
//! treated as binary (conservative).

use std::io::Read;
use std::path::Path;

const PREFIX_LEN: usize = 8 * 1024;

pub fn is_binary_file(path: &Path) -> bool {
  let mut file = match std::fs::File::open(path) {
    Ok(f) => f,
    Err(_) => return true,
  };
  let mut buf = vec![0u8; PREFIX_LEN];
  let n = match file.read(&mut buf) {
    Ok(n) => n,
    Err(_) => return true,
  };
  buf.truncate(n);
  is_binary_prefix(&buf)
}

pub fn is_binary_prefix(prefix: &[u8]) -> bool {
  if prefix.contains(&0u8) {
    return true;
  }
  std::str::from_utf8(prefix).is_err()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_content_is_not_binary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "hello world\n").unwrap();
    assert!(!is_binary_file(&path));
  }

  #[test]
  fn nul_byte_marks_binary() {
    assert!(is_binary_prefix(b"abc\0def"));
  }

  #[test]
  fn invalid_utf8_marks_binary() {
    assert!(is_binary_prefix(&[0xff, 0xfe, 0x00, 0x01]));
  }

  #[test]
  fn unreadable_file_is_conservatively_binary() {
    let dir = tempfile::tempdir().unwrap();
    assert!(is_binary_file(&dir.path().join("does-not-exist")));
  }
}
