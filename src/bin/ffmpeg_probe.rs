// src/bin/ffmpeg_probe.rs - Checks the ffmpeg toolchain and probes a video
use cover_drive::video::probe_video;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    println!("Checking video tooling...\n");

    for tool in ["ffprobe", "ffmpeg"] {
        match Command::new(tool).arg("-version").output() {
            Ok(output) => {
                let version = String::from_utf8_lossy(&output.stdout);
                let first_line = version.lines().next().unwrap_or("unknown version");
                println!("✓ {} found: {}", tool, first_line);
            }
            Err(e) => println!("✗ {} not available: {}", tool, e),
        }
    }

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        println!("\nPass a video path to inspect it.");
        return;
    };

    match probe_video(&path) {
        Ok(info) => {
            println!("\n✓ {}", info.path.display());
            println!("  Resolution: {}x{}", info.width, info.height);
            println!("  Frame rate: {:.2} fps", info.fps);
            println!("  Frames:     {}", info.frame_count);
        }
        Err(e) => {
            println!("\n✗ Failed to probe {}: {:#}", path.display(), e);
            println!("\nPossible causes:");
            println!("1. The file is not a video container FFmpeg understands");
            println!("2. The file has no video stream");
            println!("3. FFmpeg is not installed");
        }
    }
}
