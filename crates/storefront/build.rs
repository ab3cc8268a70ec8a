//! Build script for the storefront.
//!
//! Fingerprints the stylesheet so `base.html` can link a file name that
//! changes whenever the CSS does. The fingerprinted copy lives in
//! `static/css/derived/` and older copies are pruned.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Hex characters of the digest kept in the file name.
const FINGERPRINT_LEN: usize = 8;

fn main() {
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo"));
    fingerprint_stylesheet(&manifest_dir.join("static/css"));
}

/// First `FINGERPRINT_LEN` hex characters of the SHA-256 of `bytes`.
fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest
        .iter()
        .take(FINGERPRINT_LEN / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn fingerprint_stylesheet(css_dir: &Path) {
    let source = css_dir.join("main.css");
    println!("cargo:rerun-if-changed={}", source.display());

    let Ok(content) = fs::read(&source) else {
        println!("cargo:warning=main.css not found, stylesheet link will be unversioned");
        println!("cargo:rustc-env=CSS_HASH=");
        return;
    };

    let hash = fingerprint(&content);
    println!("cargo:rustc-env=CSS_HASH={hash}");

    let derived = css_dir.join("derived");
    fs::create_dir_all(&derived).expect("Failed to create derived CSS directory");

    let target_name = format!("main.{hash}.css");
    if let Ok(entries) = fs::read_dir(&derived) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let stale = name.to_str().is_some_and(|name| {
                name.starts_with("main.") && name.ends_with(".css") && name != target_name
            });
            if stale {
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    fs::copy(&source, derived.join(&target_name)).expect("Failed to copy fingerprinted CSS");
}
