use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/error.rs");
    println!("cargo:rerun-if-changed=src/instance.rs");

    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR not set, skipping C header");
        return;
    };
    let output_file = PathBuf::from(&crate_dir).join("../../WindSimFFI.h");

    // Generate C bindings using cbindgen
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("WINDSIM_FFI_H")
        .with_namespace("windsim")
        .with_documentation(true)
        .with_pragma_once(false)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(output_file);
        }
        Err(e) => println!("cargo:warning=Unable to generate C bindings: {e}"),
    }
}
