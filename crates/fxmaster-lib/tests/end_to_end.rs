//! Load, validate, resample and replay one weekly file through the facade.

use chrono::{TimeDelta, TimeZone, Timelike, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use fxmaster_lib::prelude::*;
use fxmaster_lib::{ResampleMode, RunStatus, StoreBackend};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const ROWS: usize = 500;

fn write_week(root: &Path) {
    let dir = root.join("AUDCAD").join("2015");
    std::fs::create_dir_all(&dir).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    writeln!(encoder, "DateTime,Bid,Ask").unwrap();
    for i in 0..ROWS {
        let minute = i / 60;
        let second = i % 60;
        let bid = 0.9 + (i % 100) as f64 * 0.0001;
        writeln!(
            encoder,
            "01/04/2015 22:{minute:02}:{second:02}.250,{bid:.5},{:.5}",
            bid + 0.0003
        )
        .unwrap();
    }
    let bytes = encoder.finish().unwrap();
    std::fs::write(dir.join("AUDCAD_2015_1.csv.gz"), bytes).unwrap();
}

fn settings(temp_dir: &TempDir) -> Settings {
    let text = format!(
        "[store]\nbackend = \"memory\"\n\n[journal]\npath = {:?}\n",
        temp_dir.path().join("journal")
    );
    Settings::from_toml(&text, Path::new("fxmaster.toml")).unwrap()
}

#[tokio::test]
async fn test_pipeline_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let source_dir = temp_dir.path().join("ticks");
    write_week(&source_dir);

    let settings = settings(&temp_dir);
    assert_eq!(settings.store.backend, StoreBackend::Memory);
    let store: Arc<dyn TickStore> = Arc::new(MemoryStore::new());
    let journal = settings.journal.open().unwrap();

    // Load
    let loader = BulkLoader::new(store.clone(), journal, settings.ingest.load_options());
    let report = loader.load(&source_dir).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.loaded, vec!["AUDCAD_2015_1".to_string()]);

    let tags = TagSet::new()
        .with(Tag::Symbol, "AUDCAD")
        .with(Tag::Provider, "fxcm")
        .with(Tag::Filename, "AUDCAD_2015_1");
    let stored = store
        .count(&settings.ingest.tick_table, &Predicate::exact(&tags))
        .await
        .unwrap();
    assert_eq!(stored, ROWS as u64);

    // Validate
    let file = Catalog::new(&source_dir).files().unwrap().remove(0);
    let validator = Validator::new(store.clone(), &settings.ingest.tick_table, 10);
    let outcome = validator.validate(&file, "fxcm").await.unwrap().unwrap();
    assert_eq!(outcome.status, ValidationStatus::Exact);
    assert_eq!(outcome.csv_row_count, ROWS as u64);

    // A second load skips the bucket.
    let again = BulkLoader::new(
        store.clone(),
        settings.journal.open().unwrap(),
        settings.ingest.load_options(),
    );
    let report = again.load(&source_dir).await.unwrap();
    assert_eq!(report.skipped, vec!["AUDCAD_2015_1".to_string()]);

    // Resample
    let resampler = Resampler::new(store.clone());
    let reports = resampler
        .resample_all(
            &settings.resample.input_table,
            &settings.resample.output_prefix,
            Frequency::Minute1,
        )
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].mode, ResampleMode::Full);

    let series = SeriesKey::new("AUDCAD", "fxcm");
    let bars = store
        .select_bars("fx_1min", &series.predicate(), None)
        .await
        .unwrap();
    let minutes: BTreeSet<u32> = (0..ROWS).map(|i| (i / 60) as u32).collect();
    assert_eq!(bars.len(), minutes.len());
    assert_eq!(reports[0].bars_written, bars.len());
    assert_eq!(bars.iter().map(|b| b.tick_count as usize).sum::<usize>(), ROWS);
    assert!(bars.iter().all(|b| b.period_start.second() == 0));

    // Replay
    let start = Utc.with_ymd_and_hms(2015, 1, 4, 22, 0, 0).unwrap();
    let window = TimeWindow::new(start, start + TimeDelta::hours(1)).unwrap();
    let mut playback = HistoricPlayback::new(store.clone(), &settings.playback.table);
    playback.open(["AUDCAD"], "fxcm", window).await.unwrap();
    let (mut feed, mut rx) = TickFeed::new(playback);
    assert_eq!(feed.run().await.unwrap(), ROWS as u64);
    assert!(!feed.continue_backtest());

    let mut previous = None;
    let mut received = 0;
    while let Some(MarketEvent::Tick(event)) = rx.try_recv() {
        if let Some(previous) = previous {
            assert!(event.timestamp >= previous);
        }
        previous = Some(event.timestamp);
        received += 1;
    }
    assert_eq!(received, ROWS);
}
