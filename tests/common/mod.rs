#![allow(dead_code)]

pub mod pack_builder;

use assert_fs::TempDir;
use rstest::fixture;

#[fixture]
pub fn objects_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::create_dir_all(dir.path().join("pack")).expect("Failed to create pack dir");
    dir
}

// Helper function to create hexdump representation
pub fn to_hexdump(data: &[u8]) -> String {
    let mut result = String::new();
    for (i, chunk) in data.chunks(16).enumerate() {
        result.push_str(&format!("{:08x}: ", i * 16));

        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                result.push(' ');
            }
            result.push_str(&format!("{:02x} ", byte));
        }

        for j in chunk.len()..16 {
            if j == 8 {
                result.push(' ');
            }
            result.push_str("   ");
        }

        result.push_str(" |");
        for byte in chunk {
            if byte.is_ascii_graphic() {
                result.push(*byte as char);
            } else {
                result.push('.');
            }
        }
        result.push_str("|\n");
    }
    result
}

// Compare two binary files through their hexdumps so a failure shows a readable diff
#[macro_export]
macro_rules! assert_bytes_eq {
    ($actual:expr, $expected:expr) => {
        if $actual != $expected {
            pretty_assertions::assert_eq!(
                common::to_hexdump($actual),
                common::to_hexdump($expected),
                "\n=== CONTENTS DIFFER ===\nactual ({} bytes) vs expected ({} bytes)",
                $actual.len(),
                $expected.len()
            );
        }
    };
}
