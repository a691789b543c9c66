use anyhow::Context;

use super::*;
use crate::access::TileDirectory;
use crate::diagnostics::CollectingSink;
use crate::histogram::{equalize, HistogramConfig};
use crate::processor::TileError;
use crate::raster::{RasterSize, SampleDepth};
use crate::testing::{gradient_raster, low_contrast_raster, Fault, FaultyAccess, RecordingAccess};
use crate::tile_grid::TileGridConfig;
use crate::transform::Identity;
use common::FileFormat;

fn config(tile: usize, overlap: usize, policy: ErrorPolicy) -> PipelineConfig {
    PipelineConfig {
        tile_size: (tile, tile),
        min_overlap: overlap,
        on_tile_error: policy,
        ..Default::default()
    }
}

#[test]
fn test_disjoint_tiles_are_equalized_independently() {
    let raster = low_contrast_raster(64, 64);
    let pipeline = Pipeline::new(config(16, 0, ErrorPolicy::Abort)).unwrap();

    let output = pipeline.equalize_raster(&raster).unwrap();

    assert!(output.is_complete());
    assert_eq!(output.tile_count, 16);
    assert_eq!(output.raster.size(), raster.size());

    for ty in 0..4 {
        for tx in 0..4 {
            let (x, y) = (tx * 16, ty * 16);
            let expected = equalize(
                &raster.crop(x, y, 16, 16).unwrap(),
                &HistogramConfig::default(),
            )
            .unwrap();
            assert_eq!(output.raster.crop(x, y, 16, 16).unwrap(), expected);
        }
    }
}

#[test]
fn test_memory_run_writes_back_every_tile() {
    let raster = low_contrast_raster(100, 80);
    let access = MemoryAccess::new(&raster);
    let pipeline = Pipeline::new(config(32, 8, ErrorPolicy::Abort)).unwrap();

    let output = pipeline.run(&access).unwrap();

    assert!(output.is_complete());
    assert_eq!(access.write_count(), output.tile_count);
}

#[test]
fn test_output_geometry_matches_input() {
    let raster = gradient_raster(131, 77, 3);
    let pipeline = Pipeline::new(config(40, 7, ErrorPolicy::Abort)).unwrap();

    let output = pipeline.equalize_raster(&raster).unwrap();

    assert_eq!(output.raster.size(), raster.size());
    assert_eq!(output.raster.channels(), 3);
}

#[test]
fn test_invalid_grid_fails_before_processing() {
    let raster = low_contrast_raster(32, 32);
    let access = MemoryAccess::new(&raster);
    let pipeline = Pipeline::new(config(64, 0, ErrorPolicy::SkipAndReport)).unwrap();

    let err = pipeline.run(&access).unwrap_err();

    assert!(matches!(err, PipelineError::Grid(TileGridError::InvalidConfig(_))));
    assert!(err.is_config_error());
    assert_eq!(access.write_count(), 0);
}

#[test]
fn test_invalid_pipeline_configs() {
    let bad_histogram = PipelineConfig {
        histogram: HistogramConfig {
            bin_count: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        Pipeline::new(bad_histogram),
        Err(PipelineError::Histogram(EqualizeError::InvalidConfig(_)))
    ));

    let zero_workers = PipelineConfig {
        max_concurrent_tiles: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        Pipeline::new(zero_workers),
        Err(PipelineError::InvalidConfig(_))
    ));
}

#[test]
fn test_output_depth_wider_than_raster_fails_fast() {
    let raster = low_contrast_raster(32, 32);
    let pipeline = Pipeline::new(PipelineConfig {
        tile_size: (16, 16),
        histogram: HistogramConfig {
            output_depth: SampleDepth::U16,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();

    let err = pipeline.equalize_raster(&raster).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Histogram(EqualizeError::DepthMismatch { .. })
    ));
}

#[test]
fn test_abort_returns_failing_tile() {
    let raster = low_contrast_raster(64, 64);
    let access = FaultyAccess::new(MemoryAccess::new(&raster)).with_fault(5, Fault::ReadError);
    let pipeline = Pipeline::new(config(16, 0, ErrorPolicy::Abort)).unwrap();

    let err = pipeline.run(&access).unwrap_err();

    match err {
        PipelineError::Tile(e) => {
            assert_eq!(e.index, 5);
            assert!(matches!(e.kind, TileError::Read(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_abort_stops_scheduling_later_chunks() {
    let raster = low_contrast_raster(64, 64);
    let access = FaultyAccess::new(MemoryAccess::new(&raster)).with_fault(0, Fault::WriteError);
    let pipeline = Pipeline::new(PipelineConfig {
        max_concurrent_tiles: Some(1),
        ..config(16, 0, ErrorPolicy::Abort)
    })
    .unwrap();

    assert!(pipeline.run(&access).is_err());
    assert_eq!(access.inner.write_count(), 0);
}

#[test]
fn test_skip_and_report_keeps_successful_tiles() {
    let raster = low_contrast_raster(500, 500);
    let access = FaultyAccess::new(RecordingAccess::<_, u8>::new(MemoryAccess::new(&raster)))
        .with_fault(1, Fault::ReadError);
    let pipeline = Pipeline::new(config(256, 15, ErrorPolicy::SkipAndReport)).unwrap();

    let output = pipeline.run(&access).unwrap();

    assert_eq!(output.tile_count, 4);
    assert_eq!(output.failed_indices(), vec![1]);
    assert!(output.errors[0].is_read_error());

    let grid = TileGrid::compute(&TileGridConfig::new(
        raster.size(),
        RasterSize::new(256, 256),
        15,
    ))
    .unwrap();
    let written: Vec<_> = [0usize, 2, 3]
        .iter()
        .map(|&i| (grid.tiles()[i], access.inner.written_tile(i).unwrap()))
        .collect();

    for y in 0..500 {
        for x in 0..500 {
            // Highest-index successful tile covering the pixel wins.
            let expected = written
                .iter()
                .rev()
                .find(|(spec, _)| spec.contains(x, y))
                .map(|(spec, tile)| tile.pixel(x - spec.origin_x, y - spec.origin_y)[0])
                .unwrap_or(0);
            assert_eq!(output.raster.pixel(x, y)[0], expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_skip_and_report_collects_all_errors_in_order() {
    let raster = low_contrast_raster(64, 64);
    let access = FaultyAccess::new(MemoryAccess::new(&raster))
        .with_fault(9, Fault::NoData)
        .with_fault(2, Fault::WriteError)
        .with_fault(14, Fault::WrongShape);
    let pipeline = Pipeline::new(PipelineConfig {
        max_concurrent_tiles: Some(3),
        ..config(16, 0, ErrorPolicy::SkipAndReport)
    })
    .unwrap();

    let output = pipeline.run(&access).unwrap();

    assert_eq!(output.failed_indices(), vec![2, 9, 14]);
    assert!(output.errors[0].is_write_error());
    assert!(!output.is_complete());
}

#[test]
fn test_result_independent_of_concurrency() {
    let raster = gradient_raster(150, 110, 1);
    let run = |workers| {
        let pipeline = Pipeline::new(PipelineConfig {
            max_concurrent_tiles: Some(workers),
            ..config(48, 10, ErrorPolicy::Abort)
        })
        .unwrap();
        pipeline.equalize_raster(&raster).unwrap().raster
    };

    let sequential = run(1);
    assert_eq!(run(4), sequential);
    assert_eq!(run(64), sequential);
}

#[test]
fn test_identity_roundtrip_of_zero_raster() {
    let raster: Raster<u8> = Raster::new(500, 500, 1).unwrap();
    let pipeline = Pipeline::new(config(256, 15, ErrorPolicy::Abort)).unwrap();

    let output = pipeline
        .run_with(&MemoryAccess::new(&raster), Identity)
        .unwrap();

    assert_eq!(output.raster, raster);
}

#[test]
fn test_identity_roundtrip_of_gradient_raster() {
    let raster = gradient_raster(97, 53, 4);
    let pipeline = Pipeline::new(config(20, 3, ErrorPolicy::Abort)).unwrap();

    let output = pipeline
        .run_with(&MemoryAccess::new(&raster), Identity)
        .unwrap();

    assert_eq!(output.raster, raster);
}

#[test]
fn test_sink_gets_one_record_per_tile() {
    let raster = low_contrast_raster(64, 48);
    let sink = CollectingSink::new();
    let pipeline = Pipeline::new(config(16, 4, ErrorPolicy::Abort))
        .unwrap()
        .with_sink(&sink);

    let output = pipeline.equalize_raster(&raster).unwrap();

    let records = sink.take();
    assert_eq!(records.len(), output.tile_count);
    assert!(records.iter().all(|r| r.histogram.total() == 256));
}

#[test]
fn test_tile_directory_end_to_end() -> anyhow::Result<()> {
    let dir = common::test_utils::test_output_dir("pipeline_tile_directory");
    let raster = low_contrast_raster(90, 70);
    let cfg = config(32, 6, ErrorPolicy::Abort);
    let grid = TileGrid::compute(&cfg.grid_config(raster.size()))?;
    let tiles = TileDirectory::slice(&raster, &grid, &dir)?;
    let pipeline = Pipeline::new(cfg)?;

    let from_disk = pipeline.run(&tiles)?;
    let in_memory = pipeline.equalize_raster(&raster)?;

    assert_eq!(from_disk.raster, in_memory.raster);

    // Tiles were rewritten with equalized pixels.
    let spec = grid.tiles()[0];
    let stored = tiles.read(&spec)?.context("tile 0 missing after run")?;
    let source = raster.crop(spec.origin_x, spec.origin_y, spec.width, spec.height)?;
    assert_eq!(stored, equalize(&source, &HistogramConfig::default())?);
    Ok(())
}

#[test]
fn test_config_from_yaml() {
    let text = r#"
tile_size: [128, 64]
min_overlap: 15
scale: 0.5
histogram:
  bin_count: 64
on_tile_error: skip-and-report
"#;
    let cfg: PipelineConfig = common::deserialize(text, FileFormat::Yaml).unwrap();

    assert_eq!(cfg.tile_size, (128, 64));
    assert_eq!(cfg.min_overlap, 15);
    assert_eq!(cfg.scale, 0.5);
    assert_eq!(cfg.histogram.bin_count, 64);
    assert_eq!(cfg.histogram.range_max, 256);
    assert_eq!(cfg.histogram.output_depth, SampleDepth::U8);
    assert_eq!(cfg.on_tile_error, ErrorPolicy::SkipAndReport);
    assert_eq!(cfg.max_concurrent_tiles, None);
}

#[test]
fn test_config_file_roundtrip() -> anyhow::Result<()> {
    let dir = common::test_utils::test_output_dir("pipeline_config_file");
    let cfg = PipelineConfig {
        tile_size: (300, 200),
        min_overlap: 8,
        histogram: HistogramConfig {
            bin_count: 1024,
            range_max: 65_536,
            output_depth: SampleDepth::U16,
            ..Default::default()
        },
        on_tile_error: ErrorPolicy::SkipAndReport,
        max_concurrent_tiles: Some(6),
        ..Default::default()
    };

    for name in ["pipeline.json", "pipeline.yaml"] {
        let path = dir.join(name);
        cfg.save(&path)?;
        assert_eq!(PipelineConfig::load(&path)?, cfg);
    }

    let err = PipelineConfig::load(&dir.join("pipeline.toml")).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigFile(_)));
    assert!(err.is_config_error());
    Ok(())
}
