use super::*;

#[test]
fn buffer_flags_combine_and_query() {
    let mut flags = BufferFlags::KEY_FRAME | BufferFlags::END_OF_STREAM;
    assert!(flags.contains(BufferFlags::KEY_FRAME));
    assert!(flags.contains(BufferFlags::END_OF_STREAM));
    assert!(!flags.contains(BufferFlags::CODEC_CONFIG));
    assert!(flags.contains(BufferFlags::NONE));

    flags.insert(BufferFlags::CODEC_CONFIG);
    assert_eq!(flags.bits(), 0b111);
}

#[test]
fn codec_format_mirrors_config() {
    let cfg = EncoderConfig::builder("a.mp4")
        .size(64, 48)
        .fps(24)
        .bit_rate(1_000)
        .key_frame_interval_secs(2)
        .build()
        .unwrap();
    let format = CodecFormat::from_config(&cfg);
    assert_eq!(format.mime, "video/avc");
    assert_eq!((format.width, format.height), (64, 48));
    assert_eq!(format.color_format, ColorFormat::Surface);
    assert_eq!(format.bit_rate, 1_000);
    assert_eq!(format.frame_rate, 24);
    assert_eq!(format.key_frame_interval_secs, 2);
}
