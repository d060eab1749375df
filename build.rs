use std::process::Command;
use vergen::EmitBuilder;

fn main() {
    let inside_git_checkout = Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);

    // The CLI `version` command reads VERGEN_BUILD_TIMESTAMP and, when present,
    // VERGEN_GIT_SHA. Source tarballs carry no git metadata.
    let mut builder = EmitBuilder::builder();
    builder.build_timestamp();
    if inside_git_checkout {
        builder.git_sha(true);
    }

    if let Err(e) = builder.emit() {
        println!("cargo:warning=build metadata unavailable: {e}");
    }
}
