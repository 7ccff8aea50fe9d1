//! Embeds the dictionaries under `data/*_CODES.json` as Rust constants.

use serde::Deserialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::{env, fs};

#[derive(Deserialize)]
struct DictionaryFile {
    name: String,
    marker_size: usize,
    max_correction_bits: u8,
    codes: Vec<u64>,
}

fn main() {
    let data_dir = Path::new("data");
    println!("cargo:rerun-if-changed={}", data_dir.display());

    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)
        .expect("read data/")
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_CODES.json"))
        })
        .collect();
    files.sort();

    let mut out = String::new();
    let mut names = Vec::new();

    for path in &files {
        println!("cargo:rerun-if-changed={}", path.display());
        let raw = fs::read_to_string(path).expect("read dictionary json");
        let dict: DictionaryFile = serde_json::from_str(&raw)
            .unwrap_or_else(|e| panic!("{}: {}", path.display(), e));

        let bits = dict.marker_size * dict.marker_size;
        assert!(bits <= 64, "{}: {} bits do not fit u64", dict.name, bits);
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        for (id, code) in dict.codes.iter().enumerate() {
            assert!(code & !mask == 0, "{}: code {} has stray bits", dict.name, id);
        }

        let codes_ident = format!("{}_CODES", dict.name);
        write!(out, "const {}: &[u64] = &[", codes_ident).unwrap();
        for code in &dict.codes {
            write!(out, "0x{:x}, ", code).unwrap();
        }
        out.push_str("];\n\n");

        writeln!(
            out,
            "/// `{}`: {} markers of {}x{} bits.",
            dict.name,
            dict.codes.len(),
            dict.marker_size,
            dict.marker_size
        )
        .unwrap();
        writeln!(out, "pub const {}: Dictionary = Dictionary {{", dict.name).unwrap();
        writeln!(out, "    name: {:?},", dict.name).unwrap();
        writeln!(out, "    marker_size: {},", dict.marker_size).unwrap();
        writeln!(out, "    max_correction_bits: {},", dict.max_correction_bits).unwrap();
        writeln!(out, "    codes: {},", codes_ident).unwrap();
        out.push_str("};\n\n");

        names.push(dict.name);
    }

    out.push_str("/// Names of all embedded dictionaries.\n");
    out.push_str("pub const BUILTIN_DICTIONARY_NAMES: &[&str] = &[");
    for name in &names {
        write!(out, "{:?}, ", name).unwrap();
    }
    out.push_str("];\n\n");

    out.push_str("/// Look up an embedded dictionary by name (e.g. `\"DICT_4X4_50\"`).\n");
    out.push_str("pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {\n");
    out.push_str("    match name {\n");
    for name in &names {
        writeln!(out, "        {:?} => Some({}),", name, name).unwrap();
    }
    out.push_str("        _ => None,\n    }\n}\n");

    let dest = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR")).join("builtins.rs");
    fs::write(dest, out).expect("write builtins.rs");
}
