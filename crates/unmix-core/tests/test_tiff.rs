use std::fs::File;
use std::path::Path;

use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};

use unmix_core::io::{ImageSource, TiffSource};
use unmix_core::pipeline::demux;
use unmix_core::region::CropRect;

/// Write a multi-page Gray16 TIFF, one page per channel.
fn write_channel_tiff(path: &Path, width: usize, height: usize, channels: &[Vec<u16>]) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    for plane in channels {
        assert_eq!(plane.len(), width * height);
        encoder
            .write_image::<colortype::Gray16>(width as u32, height as u32, plane)
            .unwrap();
    }
}

/// Row-major gradient plane with a per-channel offset.
fn gradient_plane(width: usize, height: usize, offset: u16) -> Vec<u16> {
    (0..width * height).map(|i| i as u16 + offset).collect()
}

#[test]
fn test_shape_from_channel_pages() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.ome.tif");
    write_channel_tiff(
        &path,
        6,
        4,
        &[gradient_plane(6, 4, 0), gradient_plane(6, 4, 100)],
    );

    let source = TiffSource::open(&path).unwrap();
    assert_eq!(source.shape(), (4, 6, 2));
}

#[test]
fn test_full_read_matches_written_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.ome.tif");
    write_channel_tiff(
        &path,
        5,
        3,
        &[gradient_plane(5, 3, 0), gradient_plane(5, 3, 1000)],
    );

    let mut source = TiffSource::open(&path).unwrap();
    let image = source.read_region(None).unwrap();
    assert_eq!(image.dim(), (3, 5, 2));

    // image[r, c, ch] == r*5 + c + ch_offset
    assert_eq!(image[[0, 0, 0]], 0.0);
    assert_eq!(image[[2, 4, 0]], 14.0);
    assert_eq!(image[[1, 2, 1]], 1007.0);
}

#[test]
fn test_region_read_matches_crop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.ome.tif");
    write_channel_tiff(&path, 8, 8, &[gradient_plane(8, 8, 0)]);

    let mut source = TiffSource::open(&path).unwrap();
    let crop = CropRect {
        x: 2,
        y: 3,
        width: 4,
        height: 2,
    };
    let region = source.read_region(Some(&crop)).unwrap();
    assert_eq!(region.dim(), (2, 4, 1));
    // region[0,0] == source pixel (row 3, col 2) == 3*8 + 2
    assert_eq!(region[[0, 0, 0]], 26.0);
    assert_eq!(region[[1, 3, 0]], 37.0);
}

/// Write a single-page TIFF with interleaved RGB16 samples.
fn write_interleaved_tiff(path: &Path, width: usize, height: usize, pixels: &[u16]) {
    assert_eq!(pixels.len(), width * height * 3);
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    encoder
        .write_image::<colortype::RGB16>(width as u32, height as u32, pixels)
        .unwrap();
}

/// Interleaved pixel (r*1000 + c*10 + sample) so every sample is distinct.
fn interleaved_gradient(width: usize, height: usize) -> Vec<u16> {
    let mut pixels = Vec::with_capacity(width * height * 3);
    for r in 0..height {
        for c in 0..width {
            for s in 0..3 {
                pixels.push((r * 1000 + c * 10 + s) as u16);
            }
        }
    }
    pixels
}

#[test]
fn test_interleaved_page_samples_become_channels() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rgb.tif");
    write_interleaved_tiff(&path, 4, 3, &interleaved_gradient(4, 3));

    let mut source = TiffSource::open(&path).unwrap();
    assert_eq!(source.shape(), (3, 4, 3));

    let image = source.read_region(None).unwrap();
    assert_eq!(image.dim(), (3, 4, 3));
    // image[r, c, s] == r*1000 + c*10 + s
    assert_eq!(image[[0, 0, 0]], 0.0);
    assert_eq!(image[[0, 0, 2]], 2.0);
    assert_eq!(image[[2, 3, 1]], 2031.0);
}

#[test]
fn test_interleaved_region_read_matches_crop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rgb.tif");
    write_interleaved_tiff(&path, 6, 5, &interleaved_gradient(6, 5));

    let mut source = TiffSource::open(&path).unwrap();
    let crop = CropRect {
        x: 2,
        y: 1,
        width: 3,
        height: 2,
    };
    let region = source.read_region(Some(&crop)).unwrap();
    assert_eq!(region.dim(), (2, 3, 3));
    // region[0,0,s] == source pixel (row 1, col 2) sample s
    assert_eq!(region[[0, 0, 0]], 1020.0);
    assert_eq!(region[[0, 0, 2]], 1022.0);
    assert_eq!(region[[1, 2, 1]], 2041.0);
}

#[test]
fn test_out_of_bounds_region_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.ome.tif");
    write_channel_tiff(&path, 4, 4, &[gradient_plane(4, 4, 0)]);

    let mut source = TiffSource::open(&path).unwrap();
    let crop = CropRect {
        x: 2,
        y: 0,
        width: 4,
        height: 4,
    };
    assert!(source.read_region(Some(&crop)).is_err());
}

#[test]
fn test_demux_derives_default_sidecar_path() {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("foo.ome.tif");
    write_channel_tiff(
        &image_path,
        4,
        4,
        &[gradient_plane(4, 4, 0), gradient_plane(4, 4, 50)],
    );

    let output = demux(&image_path, None).unwrap();

    let expected = dir.path().join("foo.ome.tif.umxjson");
    assert_eq!(output.sidecar_path, expected);
    assert!(expected.exists());

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&expected).unwrap()).unwrap();
    assert_eq!(value["p_matrix"].as_array().unwrap().len(), 2);
    assert_eq!(value["output_channel_ranges"].as_array().unwrap().len(), 2);
    assert!(!value.as_object().unwrap().contains_key("crop"));
}

#[test]
fn test_demux_honors_explicit_sidecar_path() {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("bar.ome.tif");
    let sidecar_path = dir.path().join("elsewhere.json");
    write_channel_tiff(&image_path, 4, 4, &[gradient_plane(4, 4, 0)]);

    let output = demux(&image_path, Some(&sidecar_path)).unwrap();
    assert_eq!(output.sidecar_path, sidecar_path);
    assert!(sidecar_path.exists());
    assert!(!dir.path().join("bar.ome.tif.umxjson").exists());
}
