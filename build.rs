fn main() {
    // New commits and checkouts must invalidate the stamped version.
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    println!("cargo:rustc-env=GIT_HASH={}", git(&["rev-parse", "--short", "HEAD"]).unwrap_or_default());
    println!(
        "cargo:rustc-env=ON_RELEASE_TAG={}",
        git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some()
    );
}

fn git(args: &[&str]) -> Option<String> {
    let out = std::process::Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
}
