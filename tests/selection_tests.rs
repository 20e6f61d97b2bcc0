//! Integration tests for hyperslab and element selections.

use std::sync::Arc;

use h5veneer::dataspace::{Dataspace, Elements, Hyperslab, Selection};
use h5veneer::engine::{mem::MemEngine, Engine};
use h5veneer::Error;

fn engine() -> Arc<dyn Engine> {
    Arc::new(MemEngine::new())
}

#[test]
fn test_hyperslab_bounds() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[10, 10, 10]).unwrap();

    let slab = Hyperslab::select(&space, &[1, 1, 1], &[5, 5, 5]).unwrap();
    assert_eq!(slab.start().unwrap(), vec![1, 1, 1]);
    assert_eq!(slab.end().unwrap(), vec![6, 6, 6]);
    assert_eq!(slab.selected_count().unwrap(), 125);

    // Parent keeps its full selection
    assert_eq!(space.selected_count().unwrap(), 1000);
}

#[test]
fn test_hyperslab_out_of_bounds() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[10, 10, 10]).unwrap();

    let err = Hyperslab::select(&space, &[5, 0, 0], &[6, 1, 1]).unwrap_err();
    match err {
        Error::InvalidSelection { reason, source } => {
            assert!(reason.contains("dimension 0"), "{}", reason);
            assert!(reason.contains("11 > 10"), "{}", reason);
            assert!(source.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        Hyperslab::select(&space, &[0, 0, 0], &[11, 11, 11]),
        Err(Error::InvalidSelection { .. })
    ));

    // Touching the upper edge is fine
    assert!(Hyperslab::select(&space, &[5, 0, 9], &[5, 10, 1]).is_ok());
}

#[test]
fn test_oversized_extent() {
    let engine = engine();
    assert!(matches!(
        Dataspace::simple(&engine, &[usize::MAX, 2]),
        Err(Error::Acquisition { .. })
    ));
}

#[test]
fn test_hyperslab_rank_mismatch() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[10, 10]).unwrap();

    assert!(matches!(
        Hyperslab::select(&space, &[0], &[1, 1]),
        Err(Error::InvalidSelection { .. })
    ));
    assert!(matches!(
        Hyperslab::select_strided(&space, &[0, 0], &[1, 1], &[1], &[]),
        Err(Error::InvalidSelection { .. })
    ));
}

#[test]
fn test_strided_overflow_rejected_by_engine() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[10]).unwrap();

    // start + count fits, but 4 blocks every 3 elements from 1 reach index 10
    let err = Hyperslab::select_strided(&space, &[1], &[4], &[3], &[1]).unwrap_err();
    match err {
        Error::InvalidSelection { source, .. } => assert!(source.is_some()),
        other => panic!("unexpected error: {other}"),
    }

    assert!(Hyperslab::select_strided(&space, &[0], &[4], &[3], &[1]).is_ok());
    assert!(Hyperslab::select_strided(&space, &[0], &[2], &[0], &[1]).is_err());
    let slab = Hyperslab::select_strided(&space, &[1], &[3], &[3], &[2]).unwrap();
    assert_eq!(slab.selected_count().unwrap(), 6);
    assert_eq!(slab.start().unwrap(), vec![1]);
    assert_eq!(slab.end().unwrap(), vec![9]);
}

#[test]
fn test_elements_selection() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[4, 4]).unwrap();

    let points = Elements::select(&space, &[0, 0, 1, 2, 3, 3]).unwrap();
    assert_eq!(points.count(), 3);
    assert!(!points.is_none());
    assert_eq!(points.dataspace().selected_count().unwrap(), 3);

    let none = Elements::select(&space, &[]).unwrap();
    assert!(none.is_none());
    assert_eq!(none.dataspace().selected_count().unwrap(), 0);

    // Ragged coordinate list
    assert!(matches!(
        Elements::select(&space, &[1, 2, 3]),
        Err(Error::InvalidSelection { .. })
    ));
    // Coordinate out of range
    assert!(matches!(
        Elements::select(&space, &[4, 0]),
        Err(Error::InvalidSelection { source: Some(_), .. })
    ));
}

#[test]
fn test_selection_variants() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[8]).unwrap();

    let full = Selection::full();
    assert!(full.is_full());
    assert!(full.space_id().is_none());

    let scalar = Selection::scalar(&engine).unwrap();
    assert_eq!(scalar.dataspace().unwrap().rank().unwrap(), 0);

    let slab = Selection::hyperslab(&space, &[2], &[3]).unwrap();
    assert_ne!(slab.space_id(), space.id());

    let copy = space.copy_space().unwrap();
    let extent = Selection::from(copy);
    assert_eq!(extent.dataspace().unwrap().selected_count().unwrap(), 8);
}

#[test]
fn test_select_all_restores_copy() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[6, 2]).unwrap();
    let slab = Hyperslab::select(&space, &[0, 0], &[2, 2]).unwrap();
    assert_eq!(slab.selected_count().unwrap(), 4);

    let restored = slab.into_dataspace();
    restored.select_all().unwrap();
    assert_eq!(restored.selected_count().unwrap(), 12);
}
