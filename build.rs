//! This build script copies the `memory.x` file from the crate root into a directory where
//! the linker can always find it at build time. It also renders the watchface bitmaps
//! and the build time epoch into the output directory.

use chrono;
use std::{env, fs::File, io::Write, path::PathBuf};

const LCD_W: usize = 240;
const LCD_H: usize = 240;

/// Bluetooth rune shown while the phone is disconnected
const BT_ICON: [&str; 17] = [
    "......##......",
    "......###.....",
    "......####....",
    "......##.##...",
    ".##...##..##..",
    "..##..##..##..",
    "...##.##.##...",
    "....######....",
    ".....####.....",
    "....######....",
    "...##.##.##...",
    "..##..##..##..",
    ".##...##..##..",
    "......##.##...",
    "......####....",
    "......###.....",
    "......##......",
];

fn main() {
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());

    // Put memory layout in the output directory and ensure it's on the linker search path.
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    if env::var_os("CARGO_FEATURE_FIRMWARE").is_some() {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // create rs file with current UTC time
    File::create(out.join("utc.rs"))
        .unwrap()
        .write_fmt(format_args!(
            "const UTC_EPOCH: i64 = {:?};",
            chrono::offset::Utc::now().timestamp()
        ))
        .unwrap();

    // Background: black screen with a white band behind the time label
    let round = env::var_os("CARGO_FEATURE_ROUND").is_some();
    let band_top = if round { 58 } else { 52 };
    let band = band_top..band_top + 50;
    let background = pack(LCD_W, LCD_H, |x, y| band.contains(&y) && (8..LCD_W - 8).contains(&x));
    File::create(out.join("background.raw"))
        .unwrap()
        .write_all(&background)
        .unwrap();

    let width = BT_ICON[0].len();
    let icon = pack(width, BT_ICON.len(), |x, y| BT_ICON[y].as_bytes()[x] == b'#');
    File::create(out.join("bt_icon.raw"))
        .unwrap()
        .write_all(&icon)
        .unwrap();

    // By default, Cargo re-runs the build script whenever any file in the project changes,
    // which keeps the embedded epoch close to the flashing time.
}

/// Pack a 1 bit per pixel image, MSB first, rows padded to whole bytes.
fn pack(width: usize, height: usize, lit: impl Fn(usize, usize) -> bool) -> Vec<u8> {
    let stride = (width + 7) / 8;
    let mut data = vec![0u8; stride * height];
    for y in 0..height {
        for x in 0..width {
            if lit(x, y) {
                data[y * stride + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    data
}
