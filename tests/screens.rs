mod common;

use common::{
    block, container, dim, lzw_encode, noise, pack_high_first, pack_low_first, rle_encode,
    section,
};
use dynapak::containers::compression::CompressionMethod;
use dynapak::{
    fingerprint, walk, ContainerHandler, DecodeIssue, FormatError, Screen, SectionBody, Tag,
    WalkOptions,
};

const WIDTH: u16 = 64;
const HEIGHT: u16 = 40;

/// Screen whose low plane is LZW and high plane RLE, with the expected indices.
fn sample_screen() -> (Vec<u8>, Vec<u8>) {
    let pixel_count = WIDTH as usize * HEIGHT as usize;
    let low_nibbles = noise(pixel_count, 21, 16);
    let high_nibbles: Vec<u8> = (0..pixel_count).map(|i| ((i / 256) % 16) as u8).collect();

    let low = pack_low_first(&low_nibbles);
    let high = pack_high_first(&high_nibbles);

    let file = container(
        b"SCR:",
        &[
            dim(WIDTH, HEIGHT),
            section(b"BIN:", &block(2, low.len(), &lzw_encode(&low))),
            section(b"VGA:", &block(1, high.len(), &rle_encode(&high))),
        ],
    );
    let expected = low_nibbles
        .iter()
        .zip(&high_nibbles)
        .map(|(&lo, &hi)| lo | (hi << 4))
        .collect();
    (file, expected)
}

#[test]
fn test_screen_with_lzw_and_rle_planes() {
    let (file, expected) = sample_screen();
    let screen = Screen::deserialise(&file).unwrap();

    assert_eq!((screen.width, screen.height), (WIDTH as usize, HEIGHT as usize));
    assert!(screen.has_high_plane);
    assert!(screen.is_complete(), "{:?}", screen.issues);
    assert_eq!(screen.pixels, expected);
    assert_eq!(fingerprint(&screen.pixels), fingerprint(&expected));
}

#[test]
fn test_walker_reports_codecs() {
    let (file, _) = sample_screen();
    let sections = walk(&file, &WalkOptions::default());

    let flat = sections.flatten();
    let tags: Vec<String> = flat.iter().map(|s| s.tag.to_string()).collect();
    assert_eq!(tags, ["SCR:", "DIM:", "BIN:", "VGA:"]);
    assert!(flat[0].is_container);

    let low = sections.find(Tag::BIN).and_then(|s| s.block()).unwrap();
    let high = sections.find(Tag::VGA).and_then(|s| s.block()).unwrap();
    assert_eq!(low.method, CompressionMethod::Lzw);
    assert_eq!(high.method, CompressionMethod::Rle);
    assert_eq!(low.data.len(), (WIDTH as usize * HEIGHT as usize) / 2);
}

#[test]
fn test_walk_is_repeatable() {
    let (file, _) = sample_screen();
    let first = walk(&file, &WalkOptions::default());
    let second = walk(&file, &WalkOptions::default());
    assert_eq!(first, second);
}

#[test]
fn test_structural_walk_keeps_payloads_raw() {
    let (file, _) = sample_screen();
    let sections = walk(&file, &WalkOptions::structural());
    let low = sections.find(Tag::BIN).unwrap();
    assert!(matches!(low.body, SectionBody::Raw { .. }));
    assert_eq!(low.raw(&file).map(|b| b[0]), Some(2));
}

#[test]
fn test_every_truncation_is_handled() {
    let (file, _) = sample_screen();
    for len in 0..file.len() {
        let cut = &file[..len];
        let sections = walk(cut, &WalkOptions::default());
        if len > 0 {
            assert!(sections.issue.is_some(), "cut at {} went unnoticed", len);
        }
        match Screen::deserialise(cut) {
            Ok(screen) => assert!(!screen.is_complete()),
            Err(FormatError::InvalidMagic { .. }) => assert!(len < 4),
            Err(_) => {}
        }
    }
}

#[test]
fn test_unknown_codec_keeps_other_planes() {
    let low = vec![0x21; 8];
    let file = container(
        b"SCR:",
        &[
            dim(4, 4),
            section(b"BIN:", &block(0, low.len(), &low)),
            section(b"VGA:", &block(7, 8, &[0; 8])),
        ],
    );
    let screen = Screen::deserialise(&file).unwrap();
    assert!(!screen.has_high_plane);
    assert_eq!(
        screen.issues,
        vec![(Tag::VGA, DecodeIssue::UnrecognizedCodec { method: 7 })]
    );
    assert_eq!(screen.pixels, [1, 2].repeat(8));
}

#[test]
fn test_section_report_serialises() {
    let (file, _) = sample_screen();
    let sections = walk(&file, &WalkOptions::default());
    let json = serde_json::to_value(&sections).unwrap();

    let root = &json["sections"][0];
    assert_eq!(root["tag"], "SCR:");
    assert_eq!(root["body"]["kind"], "children");
    assert_eq!(root["body"]["children"][1]["body"]["method"], "lzw");
}
