// Regenerates include/beatmachine.h with `cbindgen` when the binary is on
// PATH, otherwise copies the checked-in header. Either way the header ends up
// in $OUT_DIR for downstream build systems.

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/beatmachine.h");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };
    let crate_dir = PathBuf::from(crate_dir);
    let header_repo = crate_dir.join("include").join("beatmachine.h");
    let header_out = PathBuf::from(out_dir).join("beatmachine.h");

    let generated = Command::new("cbindgen")
        .args(["--crate", "beatmachine-ffi", "--lang", "C", "--output"])
        .arg(&header_out)
        .current_dir(&crate_dir)
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if generated {
        println!("cargo:warning=beatmachine-ffi: generated header with cbindgen -> {}", header_out.display());
        return;
    }

    if let Err(e) = fs::copy(&header_repo, &header_out) {
        println!("cargo:warning=beatmachine-ffi: could not copy include/beatmachine.h: {e}");
    }
}
