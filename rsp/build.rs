fn main() {
    #[cfg(feature = "mirsdr")]
    {
        println!("cargo:rustc-link-lib=mirsdrapi-rsp");
    }
}
