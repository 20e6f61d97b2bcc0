//! Integration tests for dataset creation and selection-based transfer.

use std::path::Path;
use std::sync::Arc;

use h5veneer::container::{AccessFlag, CreationFlag, Dataset, DatasetOptions, Datatype, File};
use h5veneer::dataspace::{Dataspace, Selection};
use h5veneer::engine::{mem::MemEngine, Engine};
use h5veneer::util::{Bool, H5Type};
use h5veneer::Error;

use half::f16;
use tempfile::tempdir;

fn engine() -> Arc<dyn Engine> {
    Arc::new(MemEngine::new())
}

fn create_dataset<T: H5Type>(file: &File, name: &str, dims: &[usize]) -> Dataset {
    let engine = file.handle().engine().unwrap();
    let dtype = Datatype::native::<T>(engine).unwrap();
    let space = Dataspace::simple(engine, dims).unwrap();
    Dataset::create(file, name, &dtype, &space).unwrap()
}

fn new_file(engine: &Arc<dyn Engine>, path: &Path) -> File {
    File::create(engine, path, CreationFlag::New).unwrap()
}

#[test]
fn test_roundtrip_2d() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("field.h5v");
    let values: Vec<f32> = (0..100 * 50).map(|i| i as f32 * 0.5).collect();

    {
        let engine = engine();
        let file = new_file(&engine, &path);
        let ds = create_dataset::<f32>(&file, "field", &[100, 50]);
        ds.write(&values).unwrap();
    }

    let engine = engine();
    let file = File::open(&engine, &path, AccessFlag::Read).unwrap();
    let ds = Dataset::open(&file, "field").unwrap();
    assert_eq!(ds.shape().unwrap().sizes(), &[100, 50]);
    assert_eq!(ds.dataspace().unwrap().rank().unwrap(), 2);

    let mut back = vec![0.0f32; 100 * 50];
    ds.read(&mut back).unwrap();
    assert_eq!(back, values);
}

#[test]
fn test_roundtrip_constant_1d() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fifty.h5v");
    {
        let engine = engine();
        let file = new_file(&engine, &path);
        create_dataset::<i32>(&file, "fifty", &[100]).write(&[50i32; 100]).unwrap();
    }

    let engine = engine();
    let file = File::open(&engine, &path, AccessFlag::Read).unwrap();
    let mut back = vec![0i32; 100];
    Dataset::open(&file, "fifty").unwrap().read(&mut back).unwrap();
    assert_eq!(back, vec![50; 100]);
}

#[test]
fn test_partial_read_into_larger_buffer() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let file = new_file(&engine, &dir.path().join("partial.h5v"));
    let ds = create_dataset::<i32>(&file, "five", &[5]);
    ds.write(&[50i32; 5]).unwrap();

    let mem_space = Dataspace::simple(&engine, &[100]).unwrap();
    let mem = Selection::hyperslab(&mem_space, &[0], &[5]).unwrap();
    let mut buf = vec![1i32; 100];
    ds.read_selection(&mut buf, &mem).unwrap();

    assert!(buf[..5].iter().all(|&v| v == 50));
    assert!(buf[5..].iter().all(|&v| v == 1));
}

#[test]
fn test_halo_region() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let file = new_file(&engine, &dir.path().join("halo.h5v"));

    let global = [10, 10];
    let local = [9, 9];
    let barrier = [2, 2];
    let interior = [5, 5];
    let start = [0, 5];

    let ds = create_dataset::<f64>(&file, "grid", &global);
    let local_space = Dataspace::simple(&engine, &local).unwrap();
    let mem = Selection::hyperslab(&local_space, &barrier, &interior).unwrap();
    let file_sel = Selection::hyperslab(&ds.dataspace().unwrap(), &start, &interior).unwrap();

    let src: Vec<f64> = (0..81).map(|i| i as f64).collect();
    ds.write_region(&src, &mem, &file_sel).unwrap();

    let mut all = vec![-1.0f64; 100];
    ds.read(&mut all).unwrap();
    for r in 0..10 {
        for c in 0..10 {
            let expected = if r < 5 && c >= 5 {
                src[(r + 2) * 9 + (c - 5 + 2)]
            } else {
                0.0
            };
            assert_eq!(all[r * 10 + c], expected, "global ({r}, {c})");
        }
    }

    // Read back into a fresh local buffer; the barrier cells stay untouched
    let mut dst = vec![-1.0f64; 81];
    ds.read_region(&mut dst, &mem, &file_sel).unwrap();
    for r in 0..9 {
        for c in 0..9 {
            let inside = (2..7).contains(&r) && (2..7).contains(&c);
            let expected = if inside { src[r * 9 + c] } else { -1.0 };
            assert_eq!(dst[r * 9 + c], expected, "local ({r}, {c})");
        }
    }
}

#[test]
fn test_empty_elements_transfer_nothing() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let file = new_file(&engine, &dir.path().join("empty.h5v"));
    let ds = create_dataset::<u16>(&file, "data", &[5]);
    ds.write(&[3u16; 5]).unwrap();

    let mem_space = Dataspace::simple(&engine, &[5]).unwrap();
    let mem = Selection::elements(&mem_space, &[]).unwrap();
    let file_sel = Selection::elements(&ds.dataspace().unwrap(), &[]).unwrap();

    ds.write_region(&[9u16; 5], &mem, &file_sel).unwrap();
    let mut buf = [0u16; 5];
    ds.read_region(&mut buf, &mem, &file_sel).unwrap();
    assert_eq!(buf, [0; 5]);

    ds.read(&mut buf).unwrap();
    assert_eq!(buf, [3; 5]);
}

#[test]
fn test_point_selection() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let file = new_file(&engine, &dir.path().join("points.h5v"));
    let ds = create_dataset::<i64>(&file, "m", &[3, 3]);

    let file_sel = Selection::elements(&ds.dataspace().unwrap(), &[0, 0, 1, 1, 2, 2]).unwrap();
    let mem_space = Dataspace::simple(&engine, &[3]).unwrap();
    ds.write_region(&[1i64, 2, 3], &Selection::from(mem_space), &file_sel).unwrap();

    let mut all = [0i64; 9];
    ds.read(&mut all).unwrap();
    assert_eq!(all, [1, 0, 0, 0, 2, 0, 0, 0, 3]);
}

#[test]
fn test_element_size_guard() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let file = new_file(&engine, &dir.path().join("guard.h5v"));
    let ds = create_dataset::<f32>(&file, "f", &[4]);

    match ds.write(&[1u8; 4]).unwrap_err() {
        Error::Transfer { source, .. } => assert!(source.is_none()),
        other => panic!("unexpected error: {other}"),
    }
    let mut wide = [0.0f64; 4];
    assert!(matches!(ds.read(&mut wide), Err(Error::Transfer { source: None, .. })));

    // Same size, different type: the engine refuses the conversion
    match ds.write(&[1i32; 4]).unwrap_err() {
        Error::Transfer { source, .. } => assert!(source.is_some()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_count_mismatch_and_short_buffer() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let file = new_file(&engine, &dir.path().join("mismatch.h5v"));
    let ds = create_dataset::<u32>(&file, "d", &[5]);

    let mem_space = Dataspace::simple(&engine, &[5]).unwrap();
    let mem = Selection::hyperslab(&mem_space, &[0], &[3]).unwrap();
    assert!(matches!(
        ds.write_selection(&[1u32; 5], &mem),
        Err(Error::Transfer { source: Some(_), .. })
    ));
    assert!(matches!(
        ds.write(&[1u32; 2]),
        Err(Error::Transfer { source: Some(_), .. })
    ));
}

#[test]
fn test_read_only_rejects_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ro.h5v");
    {
        let engine = engine();
        let file = new_file(&engine, &path);
        create_dataset::<u8>(&file, "bytes", &[4]).write(&[1u8, 2, 3, 4]).unwrap();
    }

    let engine = engine();
    let file = File::open(&engine, &path, AccessFlag::Read).unwrap();
    assert!(file.read_only().unwrap());
    let ds = Dataset::open(&file, "bytes").unwrap();
    assert!(matches!(ds.write(&[0u8; 4]), Err(Error::Transfer { .. })));

    let mut buf = [0u8; 4];
    ds.read(&mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3, 4]);
}

#[test]
fn test_bool_and_half_datasets() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("small.h5v");
    let flags = [Bool::TRUE, Bool::FALSE, Bool::from(true)];
    let halves = [f16::from_f32(0.5), f16::from_f32(-2.0)];
    {
        let engine = engine();
        let file = new_file(&engine, &path);
        create_dataset::<Bool>(&file, "flags", &[3]).write(&flags).unwrap();
        create_dataset::<f16>(&file, "halves", &[2]).write(&halves).unwrap();
    }

    let engine = engine();
    let file = File::open(&engine, &path, AccessFlag::Read).unwrap();
    let mut f = [Bool::default(); 3];
    Dataset::open(&file, "flags").unwrap().read(&mut f).unwrap();
    assert_eq!(f, flags);

    let mut h = [f16::ZERO; 2];
    Dataset::open(&file, "halves").unwrap().read(&mut h).unwrap();
    assert_eq!(h, halves);
}

#[test]
fn test_deflate_shrinks_file() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("raw.h5v");
    let packed_path = dir.path().join("packed.h5v");
    let values = vec![42u32; 10_000];

    let engine = engine();
    {
        let file = new_file(&engine, &raw_path);
        create_dataset::<u32>(&file, "v", &[10_000]).write(&values).unwrap();
    }
    {
        let file = new_file(&engine, &packed_path);
        let dtype = Datatype::native::<u32>(&engine).unwrap();
        let space = Dataspace::simple(&engine, &[10_000]).unwrap();
        let opts = DatasetOptions::deflate(&engine, 6).unwrap();
        let ds = Dataset::create_with(&file, "v", &dtype, &space, opts).unwrap();
        ds.write(&values).unwrap();
    }

    let raw = std::fs::metadata(&raw_path).unwrap().len();
    let packed = std::fs::metadata(&packed_path).unwrap().len();
    assert!(packed < raw / 10, "{packed} vs {raw}");

    let file = File::open(&engine, &packed_path, AccessFlag::Read).unwrap();
    let mut back = vec![0u32; 10_000];
    Dataset::open(&file, "v").unwrap().read(&mut back).unwrap();
    assert_eq!(back, values);
}

#[test]
fn test_datatype_of_dataset() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let file = new_file(&engine, &dir.path().join("types.h5v"));
    let ds = create_dataset::<i16>(&file, "t", &[1]);

    let dtype = ds.datatype().unwrap();
    assert_eq!(dtype.size().unwrap(), 2);
    assert_eq!(dtype.precision().unwrap(), 16);
    assert!(!dtype.is_committed().unwrap());
}
