use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::config("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        ReelError::composition("x")
            .to_string()
            .contains("composition error:")
    );
    assert!(
        ReelError::protocol("x")
            .to_string()
            .contains("protocol violation:")
    );
    assert!(ReelError::state("x").to_string().contains("invalid state:"));
    assert!(ReelError::encoder("x").to_string().contains("encoder error:"));
    assert!(
        ReelError::container("x")
            .to_string()
            .contains("container error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
