use std::fs::File;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::tempdir;

use mifgz::{DataType, FormatError, ImageDescriptor, ImageFormat, MrtrixGz};

/// Write raw bytes as a gzip stream, the way an external tool would
/// produce a container.
fn write_gz(path: &str, bytes: &[u8]) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap();
}

#[test]
fn test_create_then_read_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("img.mif.gz");
    let path = path.to_str().unwrap();

    let mut desc = ImageDescriptor::new(path, &[4, 4, 2]);
    desc.set_dtype(DataType::UInt16LE);
    desc.axes_mut()[2].spacing = 2.5;
    desc.fields_mut().insert("comments", "round trip");
    desc.fields_mut().insert("command_history", "mrconvert in.nii img.mif.gz");
    desc.fields_mut().insert("command_history", "mrcalc img.mif.gz 1 -add img.mif.gz");

    let created = MrtrixGz.create(&desc).unwrap();
    assert_eq!(created.data_offset() % 4, 0);
    assert_eq!(created.entries.len(), 1);
    assert_eq!(created.entries[0].offset, created.data_offset());

    let payload: Vec<u8> = (0..64).map(|i| i as u8).collect();
    created.commit(&payload).unwrap();

    let mut reread = ImageDescriptor::new(path, &[]);
    let opened = MrtrixGz.read(&mut reread).unwrap().expect("suffix matches");

    assert_eq!(opened.data_offset(), created.data_offset());
    assert_eq!(reread.axes(), desc.axes());
    assert_eq!(reread.dtype(), desc.dtype());
    assert_eq!(reread.fields(), desc.fields());
    // The re-derived header buffer must match the one create produced.
    assert_eq!(opened.header(), created.header());
    assert_eq!(opened.read_payload().unwrap(), payload);
}

#[test]
fn test_created_header_buffer_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layout.mif.gz");
    let path = path.to_str().unwrap();

    let desc = ImageDescriptor::new(path, &[2, 2]);
    let io = MrtrixGz.create(&desc).unwrap();
    let offset = io.data_offset();
    let header = io.header();

    assert_eq!(header.len() as u64, offset);
    assert!(header.starts_with(b"mrtrix image\n"));

    let tail = format!("file: . {offset}\nEND\n");
    let text_end = header
        .windows(tail.len())
        .position(|w| w == tail.as_bytes())
        .expect("directive and terminator present")
        + tail.len();
    assert!(header[text_end..].iter().all(|&b| b == 0));
}

#[test]
fn test_probe_requires_suffix() {
    let desc = ImageDescriptor::new("volume.nii.gz", &[4, 4, 4]);
    assert!(MrtrixGz.probe(&desc, 3).is_none());

    let desc = ImageDescriptor::new("volume.mif.gz", &[4, 4, 4]);
    assert!(MrtrixGz.probe(&desc, 3).is_some());
}

#[test]
fn test_probe_normalizes_degenerate_axes() {
    let desc = ImageDescriptor::new("volume.mif.gz", &[0, 5, 0]);
    let normalized = MrtrixGz.probe(&desc, 3).unwrap();

    let sizes: Vec<usize> = normalized.axes().iter().map(|a| a.size).collect();
    assert_eq!(sizes, vec![1, 5, 1]);
    // The input descriptor is left untouched.
    assert_eq!(desc.size(0), 0);
}

#[test]
fn test_probe_sets_axis_count() {
    let desc = ImageDescriptor::new("volume.mif.gz", &[16, 16]);
    let up = MrtrixGz.probe(&desc, 4).unwrap();
    let sizes: Vec<usize> = up.axes().iter().map(|a| a.size).collect();
    assert_eq!(sizes, vec![16, 16, 1, 1]);

    let down = MrtrixGz.probe(&desc, 1).unwrap();
    assert_eq!(down.ndim(), 1);
}

#[test]
fn test_probe_is_idempotent() {
    let desc = ImageDescriptor::new("volume.mif.gz", &[0, 5, 0]);
    let once = MrtrixGz.probe(&desc, 3).unwrap();
    let twice = MrtrixGz.probe(&once, 3).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_read_returns_none_without_suffix() {
    let mut desc = ImageDescriptor::new("not-this-format.mif", &[]);
    assert!(MrtrixGz.read(&mut desc).unwrap().is_none());
}

#[test]
fn test_read_rejects_wrong_magic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.mif.gz");
    let path = path.to_str().unwrap();
    write_gz(path, b"not an image\nEND\n");

    let mut desc = ImageDescriptor::new(path, &[]);
    match MrtrixGz.read(&mut desc) {
        Err(FormatError::InvalidMagic { line, .. }) => assert_eq!(line, "not an image"),
        other => panic!("expected InvalidMagic, got {other:?}"),
    }
}

#[test]
fn test_read_rejects_external_data_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("split.mif.gz");
    let path = path.to_str().unwrap();
    write_gz(
        path,
        b"mrtrix image\n\
          dim: 2,2\n\
          vox: 1,1\n\
          layout: +0,+1\n\
          datatype: Float32LE\n\
          file: split.dat 64\n\
          END\n",
    );

    let mut desc = ImageDescriptor::new(path, &[]);
    match MrtrixGz.read(&mut desc) {
        Err(FormatError::ExternalDataFile { referenced, .. }) => {
            assert!(referenced.ends_with("split.dat"));
        }
        other => panic!("expected ExternalDataFile, got {other:?}"),
    }
}

#[test]
fn test_read_requires_directive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nodirective.mif.gz");
    let path = path.to_str().unwrap();
    write_gz(path, b"mrtrix image\ndim: 2,2\ndatatype: Float32LE\nEND\n");

    let mut desc = ImageDescriptor::new(path, &[]);
    assert!(matches!(
        MrtrixGz.read(&mut desc),
        Err(FormatError::MissingDirective { .. })
    ));
}

#[test]
fn test_read_rejects_undersized_declared_offset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.mif.gz");
    let path = path.to_str().unwrap();
    write_gz(
        path,
        b"mrtrix image\ndim: 2,2\ndatatype: Float32LE\nfile: . 8\nEND\n",
    );

    let mut desc = ImageDescriptor::new(path, &[]);
    assert!(matches!(
        MrtrixGz.read(&mut desc),
        Err(FormatError::HeaderOverflow { offset: 8, .. })
    ));
}

#[test]
fn test_read_rejects_malformed_field_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbled.mif.gz");
    let path = path.to_str().unwrap();
    write_gz(path, b"mrtrix image\nno colon on this line\nEND\n");

    let mut desc = ImageDescriptor::new(path, &[]);
    assert!(matches!(
        MrtrixGz.read(&mut desc),
        Err(FormatError::Header { .. })
    ));
}

#[test]
fn test_read_trusts_declared_offset() {
    // A container written with a larger offset than the arithmetic here
    // would compute (e.g. by a tool using a wider directive reserve) must
    // open at the declared position, not a recomputed one.
    let dir = tempdir().unwrap();
    let path = dir.path().join("wide.mif.gz");
    let path = path.to_str().unwrap();

    let text = "mrtrix image\n\
                dim: 2,2,2\n\
                vox: 1,1,1\n\
                layout: +0,+1,+2\n\
                datatype: Float32LE\n";
    let declared: u64 = 128;
    let mut container = Vec::from(text.as_bytes());
    container.extend_from_slice(format!("file: . {declared}\nEND\n").as_bytes());
    container.resize(declared as usize, 0);
    container.extend_from_slice(b"PAYLOAD");
    write_gz(path, &container);

    let mut desc = ImageDescriptor::new(path, &[]);
    let opened = MrtrixGz.read(&mut desc).unwrap().unwrap();

    assert_eq!(opened.data_offset(), declared);
    // The rebuilt buffer reproduces the container's header bytes.
    assert_eq!(opened.header(), &container[..declared as usize]);
    assert_eq!(opened.read_payload().unwrap(), b"PAYLOAD");
}

#[test]
fn test_create_propagates_io_errors() {
    let desc = ImageDescriptor::new("/no/such/directory/img.mif.gz", &[2, 2]);
    assert!(matches!(
        MrtrixGz.create(&desc),
        Err(FormatError::Io { .. })
    ));
}

#[test]
fn test_empty_payload_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.mif.gz");
    let path = path.to_str().unwrap();

    let desc = ImageDescriptor::new(path, &[1]);
    let created = MrtrixGz.create(&desc).unwrap();
    created.commit(&[]).unwrap();

    let mut reread = ImageDescriptor::new(path, &[]);
    let opened = MrtrixGz.read(&mut reread).unwrap().unwrap();
    assert_eq!(opened.read_payload().unwrap(), Vec::<u8>::new());
}
