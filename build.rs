// generate C header when capi feature is enabled

fn main() {
    #[cfg(feature = "capi")]
    {
        generate_c_header();
    }
}

#[cfg(feature = "capi")]
fn generate_c_header() {
    use std::env;
    use std::path::PathBuf;

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let output_file = PathBuf::from(&crate_dir).join("khanda.h");

    println!("cargo:rerun-if-changed=src/ffi.rs");
    println!("cargo:rerun-if-changed=src/core.rs");

    cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("KHANDA_H")
        .with_pragma_once(true)
        .with_documentation(true)
        .with_namespace("khanda")
        .with_parse_deps(true)
        .with_parse_include(&["libc"])
        .rename_item("KhandaErrorCode", "khanda_error_code_t")
        .rename_item("KhandaWriter", "khanda_writer_t")
        .with_header(
            "/**\n\
             * Khanda C API\n\
             * \n\
             * A library for writing byte ranges out of files and buffers.\n\
             * \n\
             * Basic usage:\n\
             * \n\
             *     khanda_writer_t* writer = khanda_writer_from_path(\"data.bin\");\n\
             *     if (!writer) {\n\
             *         fprintf(stderr, \"Error: %s\\n\", khanda_last_error());\n\
             *         return 1;\n\
             *     }\n\
             *     \n\
             *     char buffer[1024];\n\
             *     ssize_t n = khanda_write_range(writer, 4096, buffer, sizeof(buffer));\n\
             *     \n\
             *     khanda_writer_close(writer);\n\
             * \n\
             * All functions are thread-safe for their error reporting (thread-local storage).\n\
             * Writer handles should not be used from multiple threads simultaneously.\n\
             */",
        )
        .with_after_include(
            "#include <stdint.h>\n\
             #include <stddef.h>\n\
             \n\
             #ifdef _WIN32\n\
             typedef intptr_t ssize_t;\n\
             #else\n\
             #include <sys/types.h>\n\
             #endif\n\
             \n\
             #ifdef __cplusplus\n\
             extern \"C\" {\n\
             #endif",
        )
        .with_trailer(
            "#ifdef __cplusplus\n\
             }\n\
             #endif",
        )
        .generate()
        .expect("Unable to generate C bindings")
        .write_to_file(&output_file);

    println!("cargo:warning=Generated C header: {}", output_file.display());
}
