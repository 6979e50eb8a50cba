//! Build script for solo-ap
//!
//! Exports build identification, read with `env!` by the startup log and
//! `/health`:
//! - `GIT_HASH`: short commit hash, suffixed `-dirty` for uncommitted changes,
//!   `unknown` outside a git checkout
//! - `BUILD_TIMESTAMP`: RFC 3339 UTC time of the build
//! - `BUILD_PROFILE`: cargo profile (debug/release)

use std::process::Command;

fn main() {
    let git_hash = match git(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) if git(&["status", "--porcelain"]).is_some() => format!("{}-dirty", hash),
        Some(hash) => hash,
        None => "unknown".to_string(),
    };
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    export("GIT_HASH", &git_hash);
    export("BUILD_TIMESTAMP", &timestamp);
    export("BUILD_PROFILE", &profile);

    // No rerun-if-changed lines: cargo reruns this script on every build
}

/// Trimmed stdout of a successful, non-empty git command
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn export(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}
