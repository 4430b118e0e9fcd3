use super::*;

fn solid(width: u32, height: u32, px: [u8; 4]) -> FrameRGBA {
    let mut f = FrameRGBA::new(width, height);
    f.clear(Rgba8Premul {
        r: px[0],
        g: px[1],
        b: px[2],
        a: px[3],
    });
    f
}

#[test]
fn new_raster_is_transparent() {
    let f = FrameRGBA::new(3, 2);
    assert_eq!(f.data.len(), 3 * 2 * 4);
    assert!(f.data.iter().all(|&b| b == 0));
    assert!(f.premultiplied);
}

#[test]
fn from_premul_checks_length() {
    assert!(FrameRGBA::from_premul(2, 2, vec![0; 15]).is_err());
    assert!(FrameRGBA::from_premul(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn from_premul_rejects_empty_rasters() {
    assert!(matches!(
        FrameRGBA::from_premul(0, 2, Vec::new()),
        Err(ReelError::Composition(_))
    ));
    assert_eq!(FrameRGBA::new(3, 2).canvas().rgba8_len(), 24);
}

#[test]
fn clear_replaces_previous_contents() {
    let mut f = solid(2, 2, [255, 0, 0, 255]);
    f.clear(Rgba8Premul::transparent());
    assert_eq!(f.pixel(1, 1), Some([0, 0, 0, 0]));
}

#[test]
fn draw_clips_to_destination_bounds() {
    let mut dst = FrameRGBA::new(4, 4);
    let src = solid(3, 3, [0, 255, 0, 255]);
    dst.draw(&src, 2, 2).unwrap();

    assert_eq!(dst.pixel(1, 1), Some([0, 0, 0, 0]));
    assert_eq!(dst.pixel(2, 2), Some([0, 255, 0, 255]));
    assert_eq!(dst.pixel(3, 3), Some([0, 255, 0, 255]));
}

#[test]
fn draw_with_negative_offset_uses_src_interior() {
    let mut dst = FrameRGBA::new(2, 2);
    let mut src = FrameRGBA::new(3, 3);
    let i = (2 * 3 + 2) * 4;
    src.data[i..i + 4].copy_from_slice(&[9, 9, 9, 255]);

    dst.draw(&src, -1, -1).unwrap();
    assert_eq!(dst.pixel(1, 1), Some([9, 9, 9, 255]));
    assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn draw_rejects_straight_alpha() {
    let mut dst = FrameRGBA::new(1, 1);
    let mut src = FrameRGBA::new(1, 1);
    src.premultiplied = false;
    assert!(dst.draw(&src, 0, 0).is_err());
}

#[test]
fn to_rgba_image_unpremultiplies() {
    let f = FrameRGBA::from_premul(1, 1, vec![64, 0, 0, 128]).unwrap();
    let img = f.to_rgba_image().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [128, 0, 0, 128]);
}
