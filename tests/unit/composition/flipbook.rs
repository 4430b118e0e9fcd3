use std::io::Cursor;

use super::*;

fn rect_svg(w: u32, h: u32, fill: &str) -> Vec<u8> {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><rect width="{w}" height="{h}" fill="{fill}"/></svg>"#
    )
    .into_bytes()
}

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "animreel_flipbook_{tag}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn renders_active_key_for_each_frame() {
    let mut fb = Flipbook::from_svgs(
        4,
        [
            (FrameIndex(0), rect_svg(4, 2, "#ff0000")),
            (FrameIndex(2), rect_svg(4, 2, "#0000ff")),
        ],
    )
    .unwrap();

    assert_eq!(fb.intrinsic_size(), (4.0, 2.0));
    assert_eq!(fb.duration_frames(), 4);

    let f0 = fb.render(FrameIndex(0)).unwrap();
    assert_eq!((f0.width, f0.height), (4, 2));
    assert_eq!(f0.pixel(1, 1), Some([255, 0, 0, 255]));

    let f1 = fb.render(FrameIndex(1)).unwrap();
    assert_eq!(f1, f0);

    let f2 = fb.render(FrameIndex(2)).unwrap();
    assert_eq!(f2.pixel(1, 1), Some([0, 0, 255, 255]));
}

#[test]
fn renders_the_duration_frame_but_not_past_it() {
    let mut fb = Flipbook::from_svgs(3, [(FrameIndex(0), rect_svg(2, 2, "#00ff00"))]).unwrap();
    assert!(fb.render(FrameIndex(3)).is_ok());
    assert!(fb.render(FrameIndex(4)).is_err());
}

#[test]
fn scale_changes_raster_size_and_keeps_aspect() {
    let mut fb = Flipbook::from_svgs(1, [(FrameIndex(0), rect_svg(40, 20, "#00ff00"))]).unwrap();
    fb.set_scale(720.0 / 40.0).unwrap();
    let f = fb.render(FrameIndex(0)).unwrap();
    assert_eq!((f.width, f.height), (720, 360));

    assert!(fb.set_scale(0.0).is_err());
    assert!(fb.set_scale(f64::NAN).is_err());
    assert!(fb.set_scale(1.0e6).is_err());
}

#[test]
fn key_validation() {
    assert!(Flipbook::new(5, Vec::new()).is_err());
    assert!(Flipbook::from_svgs(5, [(FrameIndex(1), rect_svg(2, 2, "red"))]).is_err());
    assert!(
        Flipbook::from_svgs(
            5,
            [
                (FrameIndex(0), rect_svg(2, 2, "red")),
                (FrameIndex(0), rect_svg(2, 2, "blue")),
            ]
        )
        .is_err()
    );
    assert!(
        Flipbook::from_svgs(
            5,
            [
                (FrameIndex(0), rect_svg(2, 2, "red")),
                (FrameIndex(6), rect_svg(2, 2, "blue")),
            ]
        )
        .is_err()
    );
    assert!(Flipbook::from_svgs(5, [(FrameIndex(0), b"<svg".to_vec())]).is_err());
}

#[test]
fn loads_manifest_with_svg_and_png_keys() {
    let dir = temp_dir("manifest");
    std::fs::write(dir.join("a.svg"), rect_svg(8, 8, "#ff0000")).unwrap();

    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 255, 0, 255]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(dir.join("b.png"), png).unwrap();

    let manifest = dir.join("flipbook.json");
    std::fs::write(
        &manifest,
        r#"{ "duration_frames": 10, "keys": [
            { "frame": 0, "src": "a.svg" },
            { "frame": 5, "src": "b.png" }
        ] }"#,
    )
    .unwrap();

    let mut fb = Flipbook::from_path(&manifest).unwrap();
    assert_eq!(fb.duration_frames(), 10);
    assert_eq!(
        fb.render(FrameIndex(4)).unwrap().pixel(0, 0),
        Some([255, 0, 0, 255])
    );
    assert_eq!(
        fb.render(FrameIndex(10)).unwrap().pixel(7, 7),
        Some([0, 255, 0, 255])
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn manifest_errors_are_reported() {
    let dir = temp_dir("bad_manifest");
    assert!(Flipbook::from_json_str("{", &dir).is_err());
    assert!(
        Flipbook::from_json_str(
            r#"{ "duration_frames": 1, "keys": [{ "frame": 0, "src": "missing.svg" }] }"#,
            &dir
        )
        .is_err()
    );
    assert!(Flipbook::from_path(&dir.join("nope.json")).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}
