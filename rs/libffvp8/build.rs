use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const LIB_NAME: &str = "ffvp8";

fn main() {
	let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
	let target_dir = target_dir();

	println!("cargo:rerun-if-changed=src");
	println!("cargo:rerun-if-changed={LIB_NAME}.pc.in");

	write_header(&crate_dir, &target_dir.join("include"));
	write_pkg_config(&crate_dir, &target_dir);
}

// target/include/ffvp8.h
fn write_header(crate_dir: &Path, include_dir: &Path) {
	fs::create_dir_all(include_dir).expect("Failed to create include directory");

	cbindgen::Builder::new()
		.with_crate(crate_dir)
		.with_language(cbindgen::Language::C)
		.with_include_guard("FFVP8_H")
		.with_sys_include("stdbool.h")
		.with_sys_include("stdint.h")
		.generate()
		.expect("Unable to generate bindings")
		.write_to_file(include_dir.join(format!("{LIB_NAME}.h")));
}

// target/ffvp8.pc; FFmpeg itself comes in through Requires.private.
fn write_pkg_config(crate_dir: &Path, target_dir: &Path) {
	let Ok(template) = fs::read_to_string(crate_dir.join(format!("{LIB_NAME}.pc.in"))) else {
		return;
	};

	// What the Rust standard library needs when linked statically.
	let libs_private = match env::var("CARGO_CFG_TARGET_OS").unwrap().as_str() {
		"windows" => "-lntdll -luserenv -lws2_32",
		"macos" | "ios" => "",
		_ => "-ldl -lm -lpthread",
	};

	let content = template
		.replace("@VERSION@", &env::var("CARGO_PKG_VERSION").unwrap())
		.replace("@LIBS_PRIVATE@", libs_private);
	fs::write(target_dir.join(format!("{LIB_NAME}.pc")), content).expect("Failed to write pkg-config file");
}

fn target_dir() -> PathBuf {
	// OUT_DIR is target/{debug|release}/build/{crate}-{hash}/out
	PathBuf::from(env::var("OUT_DIR").unwrap())
		.ancestors()
		.nth(4)
		.expect("Failed to get target directory from OUT_DIR")
		.to_path_buf()
}
