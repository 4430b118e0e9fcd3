use std::io::BufReader;

use super::*;

const SPS: &[u8] = &[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1e, 0xab];
const PPS: &[u8] = &[0, 0, 0, 1, 0x68, 0xce, 0x3c, 0x80];

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "animreel_{name}_{}_{}.mp4",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn avc_format() -> OutputFormat {
    OutputFormat {
        mime: MIME_AVC.to_string(),
        width: 16,
        height: 16,
        frame_rate: 30,
        codec_specific_data: vec![SPS.to_vec(), PPS.to_vec()],
    }
}

fn sample_info(pts: u64, key: bool) -> BufferInfo {
    BufferInfo {
        offset: 0,
        size: 0,
        presentation_time_us: pts,
        flags: if key {
            BufferFlags::KEY_FRAME
        } else {
            BufferFlags::NONE
        },
    }
}

#[test]
fn splits_three_and_four_byte_start_codes() {
    let data = [0, 0, 0, 1, 0x67, 1, 2, 0, 0, 1, 0x68, 3, 0, 0, 0, 1, 0x65, 4, 5, 6];
    let nals = nal_units(&data);
    assert_eq!(nals, vec![&[0x67u8, 1, 2][..], &[0x68, 3], &[0x65, 4, 5, 6]]);

    assert_eq!(nal_units(&[0x41, 9]), vec![&[0x41u8, 9][..]]);
    assert!(nal_units(&[]).is_empty());
}

#[test]
fn avcc_prefixes_each_unit_with_its_length() {
    let data = [0, 0, 1, 0x65, 7, 7, 0, 0, 0, 1, 0x41];
    assert_eq!(
        annex_b_to_avcc(&data),
        vec![0, 0, 0, 3, 0x65, 7, 7, 0, 0, 0, 1, 0x41]
    );
}

#[test]
fn rejects_non_avc_tracks_and_missing_parameter_sets() {
    let path = temp_path("mp4_reject");
    let mut writer = Mp4ContainerWriter::create(&path).unwrap();

    let mut raw = avc_format();
    raw.mime = "video/raw".to_string();
    assert!(matches!(writer.add_track(&raw), Err(ReelError::Container(_))));

    let mut bare = avc_format();
    bare.codec_specific_data.truncate(1);
    assert!(matches!(writer.add_track(&bare), Err(ReelError::Container(_))));

    assert!(matches!(writer.start(), Err(ReelError::Protocol(_))));
    writer.release();
    let _ = std::fs::remove_file(path);
}

#[test]
fn enforces_single_track_and_call_order() {
    let path = temp_path("mp4_order");
    let mut writer = Mp4ContainerWriter::create(&path).unwrap();
    let info = sample_info(0, true);

    assert!(matches!(
        writer.write_sample_data(0, &[0, 0, 1, 0x65], &info),
        Err(ReelError::Protocol(_))
    ));
    assert_eq!(writer.add_track(&avc_format()).unwrap(), 0);
    assert!(matches!(
        writer.add_track(&avc_format()),
        Err(ReelError::Protocol(_))
    ));
    writer.start().unwrap();
    assert!(writer.start().is_err());
    assert!(matches!(
        writer.write_sample_data(1, &[0, 0, 1, 0x65], &info),
        Err(ReelError::Protocol(_))
    ));

    writer.write_sample_data(0, &[0, 0, 1, 0x65, 1], &info).unwrap();
    assert!(matches!(
        writer.write_sample_data(0, &[0, 0, 1, 0x41, 2], &info),
        Err(ReelError::Protocol(_))
    ));
    writer.release();
    let _ = std::fs::remove_file(path);
}

#[test]
fn writes_a_readable_single_track_file() {
    let path = temp_path("mp4_roundtrip");
    let mut writer = Mp4ContainerWriter::create(&path).unwrap();
    writer.add_track(&avc_format()).unwrap();
    writer.start().unwrap();
    writer
        .write_sample_data(0, &[0, 0, 0, 1, 0x65, 1, 2, 3], &sample_info(0, true))
        .unwrap();
    writer
        .write_sample_data(0, &[0, 0, 1, 0x41, 4, 5], &sample_info(33_333, false))
        .unwrap();
    writer
        .write_sample_data(0, &[0, 0, 1, 0x41, 6], &sample_info(66_666, false))
        .unwrap();
    writer.stop().unwrap();
    writer.release();
    assert_eq!(writer.samples_written(), 3);

    let file = File::open(&path).unwrap();
    let size = file.metadata().unwrap().len();
    let mut reader = ::mp4::Mp4Reader::read_header(BufReader::new(file), size).unwrap();
    assert_eq!(reader.tracks().len(), 1);
    let track = reader.tracks().get(&MP4_TRACK_ID).unwrap();
    assert_eq!(track.width(), 16);
    assert_eq!(track.height(), 16);
    assert_eq!(track.duration().as_micros(), 66_666);
    assert_eq!(reader.moov.mvhd.timescale, MOVIE_TIMESCALE);
    assert_eq!(reader.moov.mvhd.duration, 66_666);
    assert_eq!(reader.sample_count(MP4_TRACK_ID).unwrap(), 3);

    let first = reader.read_sample(MP4_TRACK_ID, 1).unwrap().unwrap();
    assert!(first.is_sync);
    assert_eq!(first.start_time, 0);
    assert_eq!(&first.bytes[..], &[0, 0, 0, 4, 0x65, 1, 2, 3]);

    let second = reader.read_sample(MP4_TRACK_ID, 2).unwrap().unwrap();
    assert!(!second.is_sync);
    assert_eq!(second.start_time, 33_333);

    let last = reader.read_sample(MP4_TRACK_ID, 3).unwrap().unwrap();
    assert_eq!(last.start_time, 66_666);
    assert_eq!(last.duration, 0);

    let _ = std::fs::remove_file(path);
}
