#![allow(dead_code)]

use base64::Engine;
use footmeasure::aruco::{builtins, render_marker, MarkerDetection};
use footmeasure::{compute_transform, RectifyParams, Transform};
use image::{imageops, DynamicImage, ImageFormat, Rgb, RgbImage};
use nalgebra::Point2;
use std::io::Cursor;

/// Top-left pixel of markers 0 and 1; each is 60 px square (4 bits + frame, 10 px cells).
pub const MARKER_ORIGINS: [(u32, u32); 2] = [(70, 40), (270, 40)];
const MARKER_SIDE: f32 = 60.0;

/// Foot rectangle in canvas pixels, `[x0, y0, x1, y1]`: 600 x 300 px, 18 x 9 cm.
pub const FOOT_CANVAS: [f64; 4] = [150.0, 350.0, 750.0, 650.0];

/// Canvas transform of [`scene`] from the rendered marker outlines.
///
/// With these marker positions the whole 960 x 720 canvas maps inside the
/// 480 x 360 input.
pub fn reference_transform() -> Transform {
    let markers: Vec<MarkerDetection> = MARKER_ORIGINS
        .iter()
        .enumerate()
        .map(|(id, &(x, y))| {
            // outer edge of the frame, in pixel-center coordinates
            let (x0, y0) = (x as f32 - 0.5, y as f32 - 0.5);
            let (x1, y1) = (x0 + MARKER_SIDE, y0 + MARKER_SIDE);
            MarkerDetection {
                id: id as u32,
                corners: [
                    Point2::new(x0, y0),
                    Point2::new(x1, y0),
                    Point2::new(x1, y1),
                    Point2::new(x0, y1),
                ],
                rotation: 0,
                hamming: 0,
                score: 1.0,
                border_score: 1.0,
                code: 0,
                inverted: false,
            }
        })
        .collect();
    compute_transform(&markers, &RectifyParams::default()).expect("reference transform")
}

/// Corners of [`FOOT_CANVAS`], clockwise from the top-left.
pub fn foot_canvas_corners() -> [Point2<f64>; 4] {
    let [x0, y0, x1, y1] = FOOT_CANVAS;
    [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

/// White sheet with markers 0 and 1 along the top edge and a dark "foot"
/// whose canvas image is exactly [`FOOT_CANVAS`].
pub fn scene() -> RgbImage {
    let mut img = RgbImage::from_pixel(480, 360, Rgb([255, 255, 255]));
    for (id, &(x, y)) in MARKER_ORIGINS.iter().enumerate() {
        let marker =
            render_marker(&builtins::DICT_4X4_50, id as u32, 10, 1, 0).expect("render marker");
        let marker = DynamicImage::ImageLuma8(marker).to_rgb8();
        imageops::replace(&mut img, &marker, x as i64, y as i64);
    }

    let h = reference_transform().homography;
    let [x0, y0, x1, y1] = FOOT_CANVAS;
    for y in 0..img.height() {
        for x in 0..img.width() {
            let p = h.apply_f64(Point2::new(x as f64, y as f64));
            if (x0..x1).contains(&p.x) && (y0..y1).contains(&p.y) {
                img.put_pixel(x, y, Rgb([60, 45, 40]));
            }
        }
    }
    img
}

pub fn blank() -> RgbImage {
    RgbImage::from_pixel(480, 360, Rgb([250, 250, 250]))
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

pub fn png_base64(img: &RgbImage) -> String {
    base64::engine::general_purpose::STANDARD.encode(png_bytes(img))
}
