//! Generate a short synthetic clip of moving blobs for exercising the
//! tracking pipeline: three colored circles over a flat background, moving
//! right, diagonally, and in a circle.

use anyhow::{Context, Result};
use clap::Parser;
use opencv::{
    core::{Mat, Point, Scalar, Size, CV_8UC3},
    imgproc,
    prelude::*,
    videoio,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "make-test-video", about = "Create a synthetic fish test video")]
struct Args {
    /// Path to write the clip to
    #[arg(long, short = 'o', default_value = "test_video.mp4")]
    output: PathBuf,
    /// Clip duration in seconds
    #[arg(long, default_value_t = 5)]
    duration: u32,
    #[arg(long, default_value_t = 30)]
    fps: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (width, height) = (640, 480);

    let fourcc = videoio::VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let mut writer = videoio::VideoWriter::new(
        args.output.to_string_lossy().as_ref(),
        fourcc,
        args.fps as f64,
        Size::new(width, height),
        true,
    )
    .with_context(|| format!("Failed to open output video: {}", args.output.display()))?;

    let num_frames = args.duration * args.fps;
    let fish1_start = (100, 240);
    let fish2_start = (320, 100);
    let fish3_radius = (150.0, 100.0);

    for frame_num in 0..num_frames {
        // flat blue-ish background (BGR)
        let mut frame = Mat::new_rows_cols_with_default(
            height,
            width,
            CV_8UC3,
            Scalar::new(200.0, 150.0, 100.0, 0.0),
        )?;

        // fish 1 drifts right, fish 2 moves diagonally, fish 3 circles
        let x1 = (fish1_start.0 + frame_num as i32 * 2) % width;
        let y1 = fish1_start.1;
        let x2 = (fish2_start.0 + (frame_num as f64 * 1.5) as i32) % width;
        let y2 = (fish2_start.1 + frame_num as i32) % height;
        let angle = frame_num as f64 * 0.1;
        let x3 = (width as f64 / 2.0 + fish3_radius.0 * angle.cos()) as i32;
        let y3 = (height as f64 / 2.0 + fish3_radius.1 * angle.sin()) as i32;

        let filled = -1;
        imgproc::circle(
            &mut frame,
            Point::new(x1, y1),
            15,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            filled,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::circle(
            &mut frame,
            Point::new(x2, y2),
            20,
            Scalar::new(255.0, 0.0, 0.0, 0.0),
            filled,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::circle(
            &mut frame,
            Point::new(x3, y3),
            18,
            Scalar::new(0.0, 0.0, 255.0, 0.0),
            filled,
            imgproc::LINE_8,
            0,
        )?;

        writer.write(&frame)?;
    }
    writer.release()?;

    println!(
        "Test video created: {} ({}s at {} fps, {} frames)",
        args.output.display(),
        args.duration,
        args.fps,
        num_frames
    );
    Ok(())
}
