use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // The Python extension leaves libpython symbols unresolved on macOS; the
    // interpreter provides them at load time.
    let python = env::var_os("CARGO_FEATURE_FFI_PYTHON").is_some();
    let macos = env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("macos");
    if python && macos {
        println!("cargo:rustc-link-arg=-undefined");
        println!("cargo:rustc-link-arg=dynamic_lookup");
    }
}
