//! Build script for hwdiag
//!
//! Embeds build-time information into the binary:
//! - Git commit hash, branch and dirty state
//! - Build timestamp
//! - Target and host triples, profile
//! - Rust version
//! - Compiled device features

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_hash = run_git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(unknown);
    let git_branch = run_git(&["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_else(unknown);
    let git_dirty = match run_git(&["status", "--porcelain"]) {
        Some(status) if !status.is_empty() => "true",
        Some(_) => "false",
        None => "unknown",
    };

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env::var("TARGET").unwrap_or_else(|_| unknown());
    let profile = env::var("PROFILE").unwrap_or_else(|_| unknown());
    let host = env::var("HOST").unwrap_or_else(|_| unknown());
    let rustc_version = run_command("rustc", &["--version"]).unwrap_or_else(unknown);

    // Cargo exposes enabled features as CARGO_FEATURE_<NAME>
    let features: Vec<&str> = ["gpu", "cuda"]
        .into_iter()
        .filter(|f| env::var(format!("CARGO_FEATURE_{}", f.to_uppercase())).is_ok())
        .collect();
    let features = if features.is_empty() {
        "none".to_string()
    } else {
        features.join(",")
    };

    println!("cargo:rustc-env=HWDIAG_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=HWDIAG_GIT_BRANCH={}", git_branch);
    println!("cargo:rustc-env=HWDIAG_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=HWDIAG_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=HWDIAG_TARGET={}", target);
    println!("cargo:rustc-env=HWDIAG_PROFILE={}", profile);
    println!("cargo:rustc-env=HWDIAG_RUSTC_VERSION={}", rustc_version);
    println!("cargo:rustc-env=HWDIAG_HOST={}", host);
    println!("cargo:rustc-env=HWDIAG_FEATURES={}", features);
}

fn unknown() -> String {
    "unknown".to_string()
}

fn run_git(args: &[&str]) -> Option<String> {
    run_command("git", args)
}

/// Run a command and return its trimmed stdout if it succeeded
fn run_command(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
