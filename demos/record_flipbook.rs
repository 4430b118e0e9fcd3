use std::path::PathBuf;

use animreel::{EncoderConfig, Flipbook, FrameIndex, record_to_mp4};

fn key_svg(fill: &str, cx: u32) -> Vec<u8> {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="360" height="360">
  <rect width="360" height="360" fill="#12141c"/>
  <circle cx="{cx}" cy="180" r="60" fill="{fill}"/>
</svg>"##
    )
    .into_bytes()
}

/// Four keys, two seconds at 30 fps.
fn build_comp() -> anyhow::Result<Flipbook> {
    let keys = [
        (0, "#e04848", 80),
        (15, "#e0a048", 140),
        (30, "#48e07a", 220),
        (45, "#4878e0", 280),
    ];
    Ok(Flipbook::from_svgs(
        60,
        keys.iter()
            .map(|&(frame, fill, cx)| (FrameIndex(frame), key_svg(fill, cx))),
    )?)
}

fn try_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    // Optional first argument: a flipbook manifest to record instead of the built-in one.
    let comp = match std::env::args().nth(1) {
        Some(manifest) => Flipbook::from_path(manifest.as_ref())?,
        None => build_comp()?,
    };

    let out_mp4 = PathBuf::from("assets").join("flipbook_sample.mp4");
    let config = EncoderConfig::builder(&out_mp4).fps(30).build()?;
    let summary = record_to_mp4(comp, config)?;

    eprintln!(
        "wrote {} ({} frames, {} bytes, {:.2}s)",
        summary.out_path.display(),
        summary.frames,
        summary.bytes_written,
        summary.encoded_duration_us as f64 / 1_000_000.0
    );
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
