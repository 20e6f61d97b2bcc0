//! Integration tests for handle ownership across the typed wrappers.

use std::sync::Arc;

use h5veneer::container::{CreationFlag, Dataset, Datatype, File, Group, Location};
use h5veneer::dataspace::Dataspace;
use h5veneer::engine::{mem::MemEngine, Engine};
use h5veneer::handle::{Handle, ObjectKind};
use h5veneer::Error;

use tempfile::tempdir;

fn engine() -> Arc<dyn Engine> {
    Arc::new(MemEngine::new())
}

#[test]
fn test_unset_wrappers_are_safe() {
    let mut space = Dataspace::default();
    assert!(!space.is_valid().unwrap());
    assert!(matches!(space.rank(), Err(Error::NotSet(_))));
    assert!(space.close().is_ok());

    let ds = Dataset::default();
    assert!(matches!(ds.dataspace(), Err(Error::NotSet(_))));
    assert!(matches!(ds.write(&[1.0f32]), Err(Error::NotSet(_))));

    let copy = ds.try_clone().unwrap();
    assert!(!copy.handle().is_set());
}

#[test]
fn test_clone_aliases_one_identifier() {
    let engine = engine();
    let a = Dataspace::simple(&engine, &[4, 4]).unwrap();
    let b = a.try_clone().unwrap();

    assert_eq!(a.id(), b.id());
    assert_eq!(a.handle().ref_count().unwrap(), 2);
    drop(b);
    assert_eq!(a.handle().ref_count().unwrap(), 1);
    assert!(a.is_valid().unwrap());
}

#[test]
fn test_take_empties_source() {
    let engine = engine();
    let space = Dataspace::simple(&engine, &[3]).unwrap();
    let mut handle = space.into_handle();
    let id = handle.id().unwrap();

    let moved = handle.take();
    assert!(!handle.is_set());
    assert_eq!(moved.id(), Some(id));
    assert_eq!(moved.ref_count().unwrap(), 1);

    drop(moved);
    assert!(!engine.is_valid(id).unwrap());
}

#[test]
fn test_assign_releases_previous() {
    let engine = engine();
    let mut a = Dataspace::simple(&engine, &[2]).unwrap().into_handle();
    let b = Dataspace::simple(&engine, &[5]).unwrap().into_handle();
    let old = a.id().unwrap();

    a.assign(&b).unwrap();
    assert!(!engine.is_valid(old).unwrap());
    assert_eq!(a, b);
    assert_eq!(b.ref_count().unwrap(), 2);

    // Self-assignment through an alias keeps the identifier alive
    let alias = a.try_clone().unwrap();
    a.assign(&alias).unwrap();
    assert!(a.is_valid().unwrap());
    assert_eq!(b.ref_count().unwrap(), 3);

    let c = Dataspace::scalar(&engine).unwrap().into_handle();
    a.assign_from(c).unwrap();
    assert_eq!(a.kind(), ObjectKind::Dataspace);
    assert_eq!(b.ref_count().unwrap(), 2);
}

#[test]
fn test_close_twice() {
    let engine = engine();
    let mut space = Dataspace::simple(&engine, &[8]).unwrap();
    let id = space.id().unwrap();

    space.close().unwrap();
    assert!(!engine.is_valid(id).unwrap());
    assert!(space.close().is_ok());
    assert!(space.id().is_none());
}

#[test]
fn test_objects_keep_file_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("alive.h5v");
    let engine = engine();

    let mut file = File::create(&engine, &path, CreationFlag::New).unwrap();
    let group = Group::create(&file, "g").unwrap();
    let dtype = Datatype::native::<i32>(&engine).unwrap();
    let space = Dataspace::simple(&engine, &[3]).unwrap();
    let ds = Dataset::create(&group, "values", &dtype, &space).unwrap();

    // file, group, dataset
    assert_eq!(file.object_count().unwrap(), 3);

    file.close().unwrap();
    assert!(!file.is_valid().unwrap());

    ds.write(&[7i32, 8, 9]).unwrap();
    let mut back = [0i32; 3];
    ds.read(&mut back).unwrap();
    assert_eq!(back, [7, 8, 9]);
    assert_eq!(group.link_names().unwrap(), vec!["values".to_string()]);
}

#[test]
fn test_open_object_reports_kind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kinds.h5v");
    let engine = engine();

    let file = File::create(&engine, &path, CreationFlag::New).unwrap();
    Group::create(&file, "grp").unwrap();
    let dtype = Datatype::native::<f64>(&engine).unwrap();
    let space = Dataspace::simple(&engine, &[2]).unwrap();
    Dataset::create(&file, "data", &dtype, &space).unwrap();

    let obj = file.open_object("grp").unwrap();
    assert_eq!(obj.kind(), ObjectKind::Group);
    assert!(Group::from_handle(obj).is_ok());

    let obj = file.open_object("data").unwrap();
    assert_eq!(obj.query_kind().unwrap(), ObjectKind::Dataset);
    assert!(matches!(
        Group::from_handle(obj),
        Err(Error::KindMismatch { .. })
    ));

    assert!(matches!(
        file.open_object("missing"),
        Err(Error::Acquisition { .. })
    ));
}

#[test]
fn test_raw_handle_adopts_engine_reference() {
    let engine = engine();
    let id = engine.create_simple_space(&[6]).unwrap();
    let handle = Handle::from_raw(&engine, id).unwrap();
    assert_eq!(handle.kind(), ObjectKind::Dataspace);
    assert_eq!(handle.ref_count().unwrap(), 1);

    let space = Dataspace::from_handle(handle).unwrap();
    assert_eq!(space.extents().unwrap(), vec![6]);
}
