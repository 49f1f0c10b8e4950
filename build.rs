//! Stamps the hub binary with its release tag and commit.
//!
//! `TD_VERSION` / `TD_GIT_SHA` win when set (release builds for the Pi are
//! cross-compiled outside the checkout). Otherwise both come from git, and
//! a source tree without git history reports the Cargo version and "unknown".

use std::env;
use std::process::Command;

fn main() {
    let version = env::var("TD_VERSION")
        .ok()
        .or_else(|| git(&["describe", "--tags", "--abbrev=0"]))
        .map(|tag| tag.trim_start_matches('v').to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    let git_sha = env::var("TD_GIT_SHA")
        .ok()
        .or_else(|| git(&["rev-parse", "--short", "HEAD"]))
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=TD_VERSION={}", version);
    println!("cargo:rustc-env=TD_GIT_SHA={}", git_sha);
    println!("cargo:rerun-if-env-changed=TD_VERSION");
    println!("cargo:rerun-if-env-changed=TD_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
