use std::fs;
use std::path::Path;
use std::time::Duration;

use lithium_core::config::ScanSettings;
use lithium_core::{
    DecodeConfig, DecodeWorker, PageConfig, PixelFormat, ScanEvent, ScanWorker, SortMode, ThumbnailStore,
    TitleSource,
};
use tempfile::TempDir;

const SIDECAR: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<game>
    <title>Halo: Combat Evolved</title>
    <developer>Bungie</developer>
    <publisher>Microsoft Game Studios</publisher>
    <rating>M</rating>
</game>"#;

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 128]));
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

fn games_page(root: &Path) -> PageConfig {
    PageConfig {
        name: "Games".to_string(),
        paths: vec![root.to_path_buf()],
        sort: SortMode::Name,
        recent: false,
    }
}

fn decode_config(pool_size: usize, store: Option<ThumbnailStore>) -> DecodeConfig {
    DecodeConfig {
        format: PixelFormat::Rgb565,
        max_dimension: 64,
        pool_size,
        store,
    }
}

#[test]
fn scan_then_decode_title_with_sidecar() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("games");

    let halo = root.join("halo");
    fs::create_dir_all(halo.join("_resources")).unwrap();
    fs::write(halo.join("default.xbe"), b"XBEH").unwrap();
    fs::write(halo.join("_resources").join("default.xml"), SIDECAR).unwrap();
    write_jpeg(&halo.join("default.tbn"), 256, 128);

    let saves = root.join("saves");
    fs::create_dir_all(&saves).unwrap();
    fs::write(saves.join("profile.dat"), b"data").unwrap();

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut scanner = ScanWorker::new(vec![games_page(&root)], ScanSettings::default(), tx);
    scanner.run_pass();

    let cursor = scanner.cursor(0).unwrap();
    assert_eq!(cursor.remaining(), 0);
    assert!(!cursor.has_path_buffers());

    let records: Vec<_> = rx
        .try_iter()
        .filter_map(|e| match e {
            ScanEvent::TitleFound { record, .. } => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.title, "Halo: Combat Evolved");
    assert_eq!(record.source, TitleSource::Sidecar);
    assert_eq!(record.metadata.developer.as_deref(), Some("Bungie"));
    assert_eq!(record.metadata.publisher.as_deref(), Some("Microsoft Game Studios"));
    assert_eq!(record.metadata.rating.as_deref(), Some("M"));

    let thumbnail = record.thumbnail.clone().unwrap();
    let mut worker = DecodeWorker::init(decode_config(4, None)).unwrap();
    let handle = worker.submit(&thumbnail, record.id).unwrap();

    let completion = worker
        .completions()
        .recv_timeout(Duration::from_secs(10))
        .unwrap();
    assert_eq!(completion.handle, handle);
    assert_eq!(completion.tag, record.id);

    let image = completion.result.unwrap();
    assert_eq!((image.width, image.height), (64, 32));
    assert_eq!(image.format, PixelFormat::Rgb565);
    assert_eq!(image.byte_size(), 64 * 32 * 2);
    worker.deinit();
}

#[test]
fn title_without_sidecar_falls_back_to_folder_name() {
    let temp = TempDir::new().unwrap();
    let title = temp.path().join("Crimson Skies");
    fs::create_dir_all(&title).unwrap();
    fs::write(title.join("default.xbe"), b"garbage").unwrap();

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut scanner = ScanWorker::new(vec![games_page(temp.path())], ScanSettings::default(), tx);
    scanner.run_pass();

    let record = rx
        .try_iter()
        .find_map(|e| match e {
            ScanEvent::TitleFound { record, .. } => Some(record),
            _ => None,
        })
        .unwrap();
    assert_eq!(record.title, "Crimson Skies");
    assert_eq!(record.source, TitleSource::FolderName);
    assert_eq!(record.thumbnail, None);
}

#[test]
fn missing_thumbnails_return_slots_to_the_pool() {
    let temp = TempDir::new().unwrap();
    let pool_size = 3;
    let worker = DecodeWorker::init(decode_config(pool_size, None)).unwrap();

    for i in 0..=pool_size {
        let path = temp.path().join(format!("missing-{}.tbn", i));
        worker.submit(&path, i).unwrap();
        let completion = worker
            .completions()
            .recv_timeout(Duration::from_secs(10))
            .unwrap();
        assert_eq!(completion.tag, i);
        assert!(completion.result.is_err());
    }
    assert_eq!(worker.in_flight(), 0);
}

#[test]
fn disk_store_serves_second_decode() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("default.tbn");
    write_jpeg(&source, 128, 128);
    let store = ThumbnailStore::new(temp.path().join("store"));

    let first = {
        let worker = DecodeWorker::init(decode_config(2, Some(store.clone()))).unwrap();
        worker.submit(&source, ()).unwrap();
        worker
            .completions()
            .recv_timeout(Duration::from_secs(10))
            .unwrap()
            .result
            .unwrap()
    };

    assert_eq!(store.load(&source, PixelFormat::Rgb565, 64), Some(first.clone()));

    let worker = DecodeWorker::init(decode_config(2, Some(store))).unwrap();
    worker.submit(&source, ()).unwrap();
    let second = worker
        .completions()
        .recv_timeout(Duration::from_secs(10))
        .unwrap()
        .result
        .unwrap();
    assert_eq!(second, first);
}
