//! Checksum handling for downloaded files. Repositories publish `.md5` and
//! `.sha1` companions whose content varies wildly: bare hex, `hex  filename`,
//! or `MD5(filename)= hex`, in either case, with stray whitespace.

use sha1::{Digest, Sha1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Md5,
    Sha1,
}

impl DigestKind {
    pub fn file_extension(&self) -> &'static str {
        match self {
            DigestKind::Md5 => "md5",
            DigestKind::Sha1 => "sha1",
        }
    }

    pub fn hex_len(&self) -> usize {
        match self {
            DigestKind::Md5 => 32,
            DigestKind::Sha1 => 40,
        }
    }
}

pub fn compute_hex(data: &[u8], kind: DigestKind) -> String {
    match kind {
        DigestKind::Md5 => hex::encode(md5::compute(data).0),
        DigestKind::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(data);
            hex::encode(hasher.finalize())
        }
    }
}

/// Pull the expected digest out of a checksum file: the first hex run of the
/// right width, whatever decoration surrounds it.
pub fn expected_hex(checksum_text: &str, kind: DigestKind) -> Option<String> {
    let mut run = String::new();
    for c in checksum_text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_hexdigit() {
            run.push(c.to_ascii_lowercase());
        } else {
            if run.len() == kind.hex_len() {
                return Some(run);
            }
            run.clear();
        }
    }
    None
}

/// `None` when the checksum file holds no usable digest.
pub fn matches(data: &[u8], kind: DigestKind, checksum_text: &str) -> Option<bool> {
    expected_hex(checksum_text, kind).map(|expected| compute_hex(data, kind) == expected)
}
