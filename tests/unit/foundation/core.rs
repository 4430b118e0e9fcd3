use super::*;

#[test]
fn frame_index_next_saturates() {
    assert_eq!(FrameIndex(3).next(), FrameIndex(4));
    assert_eq!(FrameIndex(u64::MAX).next(), FrameIndex(u64::MAX));
}

#[test]
fn canvas_rejects_zero_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    assert_eq!(Canvas::new(4, 2).unwrap().rgba8_len(), 32);
}

#[test]
fn straight_to_premul_rounds() {
    let c = Rgba8Premul::from_straight_rgba(255, 100, 0, 128);
    assert_eq!(c.to_array(), [128, 50, 0, 128]);
    assert_eq!(Rgba8Premul::transparent().to_array(), [0, 0, 0, 0]);
}
