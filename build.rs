// Build script to ensure Cargo rebuilds when embedded templates change.
// rust-embed embeds files at compile time, but Cargo's incremental compilation
// may not detect changes to template files. This tells Cargo to rerun the build
// whenever files in this directory are modified.

fn main() {
    println!("cargo:rerun-if-changed=templates/");
}
