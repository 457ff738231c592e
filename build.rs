use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CMDBRIDGE_MAGIC_MARKER");
    if let Ok(marker) = env::var("CMDBRIDGE_MAGIC_MARKER") {
        println!("cargo:rustc-env=CMDBRIDGE_MAGIC_MARKER={marker}");
    }
}
