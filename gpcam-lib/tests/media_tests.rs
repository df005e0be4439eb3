//! Tests for media listing parsing and burst-group expansion.

use gpcam_lib::GpError;
use gpcam_lib::media::{MediaListing, RawMediaEntry, expand};

fn file(name: &str, size: &str) -> RawMediaEntry {
    RawMediaEntry {
        name: name.to_string(),
        size: size.to_string(),
        group_id: None,
        first_index: None,
        last_index: None,
        deleted_indices: Vec::new(),
        created: Some("1690000000".to_string()),
        modified: Some("1690000001".to_string()),
    }
}

fn group(name: &str, first: u32, last: u32, deleted: &[u32], size: &str) -> RawMediaEntry {
    RawMediaEntry {
        name: name.to_string(),
        size: size.to_string(),
        group_id: Some("1".to_string()),
        first_index: Some(first.to_string()),
        last_index: Some(last.to_string()),
        deleted_indices: deleted.iter().map(|i| i.to_string()).collect(),
        created: Some("1690000000".to_string()),
        modified: Some("1690000001".to_string()),
    }
}

#[test]
fn plain_files_pass_through_unchanged() {
    let files = expand(&[file("GOPR0001.MP4", "1048576")]).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "GOPR0001.MP4");
    assert_eq!(files[0].size, 1048576);
    assert_eq!(files[0].created.as_deref(), Some("1690000000"));
}

#[test]
fn group_expands_to_live_indices_with_uniform_size() {
    let files = expand(&[group("GABC0010.JPG", 10, 14, &[12], "200")]).unwrap();
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        ["GABC0010.JPG", "GABC0011.JPG", "GABC0013.JPG", "GABC0014.JPG"]
    );
    assert!(files.iter().all(|f| f.size == 50));
    assert!(files.iter().all(|f| f.created.as_deref() == Some("1690000000")));
}

#[test]
fn remainder_is_truncated_not_redistributed() {
    let files = expand(&[group("GABC0010.JPG", 10, 14, &[12], "203")]).unwrap();
    assert!(files.iter().all(|f| f.size == 50));
}

#[test]
fn expansion_preserves_input_order() {
    let entries = [
        file("GOPR0001.MP4", "10"),
        group("GABC0010.JPG", 10, 11, &[], "20"),
        file("GOPR0002.MP4", "30"),
    ];
    let names: Vec<_> = expand(&entries)
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(
        names,
        [
            "GOPR0001.MP4",
            "GABC0010.JPG",
            "GABC0011.JPG",
            "GOPR0002.MP4"
        ]
    );
}

#[test]
fn fully_deleted_group_expands_to_nothing() {
    let files = expand(&[group("GABC0010.JPG", 10, 11, &[10, 11], "200")]).unwrap();
    assert!(files.is_empty());
}

#[test]
fn indices_are_zero_padded_to_four_digits() {
    let files = expand(&[group("GABC0008.JPG", 8, 9, &[], "10")]).unwrap();
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["GABC0008.JPG", "GABC0009.JPG"]);
}

#[test]
fn malformed_numbers_are_protocol_errors() {
    let result = expand(&[file("GOPR0001.MP4", "not-a-size")]);
    assert!(matches!(result, Err(GpError::Protocol(_))));

    let mut broken = group("GABC0010.JPG", 10, 14, &[], "200");
    broken.last_index = None;
    assert!(matches!(expand(&[broken]), Err(GpError::Protocol(_))));
}

#[test]
fn inverted_group_bounds_are_protocol_errors() {
    let result = expand(&[group("GABC0010.JPG", 14, 10, &[], "200")]);
    assert!(matches!(result, Err(GpError::Protocol(_))));
}

#[test]
fn listing_json_parses_camera_shapes() {
    let json = r#"{
        "media": [{
            "d": "100GOPRO",
            "fs": [
                {"n": "GOPR0001.MP4", "cre": "1690000000", "mod": "1690000001", "s": "1048576"},
                {"n": "GABC0010.JPG", "g": "1", "b": "10", "l": "14", "m": ["12"], "s": "200"}
            ]
        }]
    }"#;
    let listing: MediaListing = serde_json::from_str(json).unwrap();
    assert_eq!(listing.media.len(), 1);
    assert_eq!(listing.media[0].directory, "100GOPRO");
    assert_eq!(listing.media[0].files.len(), 2);
    assert_eq!(listing.media[0].files[1].group_id.as_deref(), Some("1"));

    let files = expand(&listing.media[0].files).unwrap();
    assert_eq!(files.len(), 5);
}
