//! Time sampling registry and time based sample lookup through properties.

mod common;

use alembic_core::prelude::*;
use common::{init_tracing, memory_roundtrip};

const FPS24: f64 = 1.0 / 24.0;
const START: f64 = 0.25;
const NUM_FRAMES: usize = 100;

fn frame_time(i: usize) -> f64 {
    START + i as f64 * FPS24
}

fn animated_archive() -> IArchive {
    let (_store, archive) = memory_roundtrip("anim", |archive| {
        let ts = archive.add_time_sampling(TimeSampling::uniform(FPS24, START)?)?;
        let props = archive.top()?.create_child("anim")?.properties();
        let frame = props.create_scalar("frame", DataType::UINT32, ts)?;
        for i in 0..NUM_FRAMES as u32 {
            frame.set_value(i)?;
        }
        Ok(())
    });
    archive
}

fn frame_property(archive: &IArchive) -> IScalarProperty {
    archive.find_object("/anim").unwrap().properties().unwrap().scalar("frame").unwrap()
}

#[test]
fn test_identity_sampling_is_always_present() {
    init_tracing();
    let (_store, archive) = memory_roundtrip("identity", |archive| {
        assert_eq!(archive.num_time_samplings(), 1);
        assert!(archive.time_sampling(0)?.is_identity());
        assert_eq!(archive.add_time_sampling(TimeSampling::identity())?, 0);
        Ok(())
    });
    assert_eq!(archive.num_time_samplings().unwrap(), 1);
    assert_eq!(archive.time_sampling(0).unwrap(), &TimeSampling::identity());
}

#[test]
fn test_equal_samplings_share_an_id() {
    init_tracing();
    let (_store, archive) = memory_roundtrip("sharing", |archive| {
        let a = archive.add_time_sampling(TimeSampling::uniform(FPS24, 0.0)?)?;
        let b = archive.add_time_sampling(TimeSampling::uniform(FPS24, 0.0)?)?;
        let c = archive.add_time_sampling(TimeSampling::uniform(FPS24, 1.0)?)?;
        let d = archive.add_time_sampling(TimeSampling::acyclic(vec![0.0, 0.5, 2.0])?)?;
        let e = archive.add_time_sampling(TimeSampling::cyclic(1.0, vec![0.0, 0.25])?)?;
        assert_eq!(a, b);
        assert_eq!((a, c, d, e), (1, 2, 3, 4));

        let props = archive.top()?.create_child("o")?.properties();
        props.create_scalar("x", DataType::FLOAT32, a)?.set_value(1.0f32)?;
        props.create_scalar("y", DataType::FLOAT32, b)?.set_value(2.0f32)?;
        Ok(())
    });

    assert_eq!(archive.num_time_samplings().unwrap(), 5);
    let props = archive.find_object("/o").unwrap().properties().unwrap();
    let x = props.scalar("x").unwrap();
    let y = props.scalar("y").unwrap();
    assert_eq!(x.time_sampling_index(), y.time_sampling_index());
    assert_eq!(x.time_sampling(), y.time_sampling());
    assert_eq!(archive.time_sampling(3).unwrap(), &TimeSampling::acyclic(vec![0.0, 0.5, 2.0]).unwrap());
}

#[test]
fn test_interp_boundaries() {
    init_tracing();
    let archive = animated_archive();
    let frame = frame_property(&archive);
    assert_eq!(frame.num_samples(), NUM_FRAMES);

    // Before the first sample: clamp, no extrapolation.
    for t in [-10.0, 0.0, START - 1e-3] {
        let interp = frame.interp(t).unwrap();
        assert_eq!((interp.floor_index, interp.ceil_index, interp.alpha), (0, 0, 0.0), "t = {}", t);
    }

    // After the last sample.
    let last = frame_time(NUM_FRAMES - 1);
    for t in [last, last + 1e-3, 1000.0] {
        let interp = frame.interp(t).unwrap();
        assert_eq!((interp.floor_index, interp.ceil_index, interp.alpha), (99, 99, 0.0), "t = {}", t);
    }

    // Exactly on a sample.
    for i in [0, 1, 23, 50, 98] {
        let interp = frame.interp(frame_time(i)).unwrap();
        assert!(interp.is_exact());
        assert_eq!(interp.floor_index, i);
        assert_eq!(interp.alpha, 0.0);
    }

    // Halfway between two samples.
    let interp = frame.interp(frame_time(50) + FPS24 / 2.0).unwrap();
    assert_eq!((interp.floor_index, interp.ceil_index), (50, 51));
    assert!((interp.alpha - 0.5).abs() < 1e-9);

    let interp = frame.interp(frame_time(10) + FPS24 * 0.25).unwrap();
    assert_eq!((interp.floor_index, interp.ceil_index), (10, 11));
    assert!((interp.alpha - 0.25).abs() < 1e-9);
}

#[test]
fn test_time_selectors() {
    init_tracing();
    let archive = animated_archive();
    let frame = frame_property(&archive);

    let t = frame_time(20) + FPS24 * 0.4;
    assert_eq!(frame.sample_index(SampleSelector::time_floor(t)).unwrap(), 20);
    assert_eq!(frame.sample_index(SampleSelector::time_ceil(t)).unwrap(), 21);
    assert_eq!(frame.sample_index(SampleSelector::time_near(t)).unwrap(), 20);
    assert_eq!(frame.sample_index(frame_time(20) + FPS24 * 0.6).unwrap(), 21);

    assert_eq!(frame.get_value::<u32>(SampleSelector::time_floor(t)).unwrap(), 20);
    assert_eq!(frame.get_value::<u32>(SampleSelector::time_ceil(t)).unwrap(), 21);
    assert_eq!(frame.get_value::<u32>(SampleSelector::time_floor(-5.0)).unwrap(), 0);
    assert_eq!(frame.get_value::<u32>(SampleSelector::time_ceil(500.0)).unwrap(), 99);

    assert!((frame.sample_time(42).unwrap() - frame_time(42)).abs() < 1e-12);
}

#[test]
fn test_max_samples_recorded() {
    init_tracing();
    let (_store, archive) = memory_roundtrip("max", |archive| {
        let ts = archive.add_time_sampling(TimeSampling::uniform(FPS24, 0.0)?)?;
        let unused = archive.add_time_sampling(TimeSampling::uniform(0.5, 0.0)?)?;
        let props = archive.top()?.create_child("o")?.properties();
        let a = props.create_array("a", DataType::INT32, ts)?;
        let b = props.create_scalar("b", DataType::INT32, ts)?;
        for i in 0..7i32 {
            a.set_values(&[i])?;
        }
        for i in 0..12i32 {
            b.set_value(i)?;
        }
        assert_eq!(archive.max_num_samples_for_time_sampling(ts), Some(12));
        assert_eq!(archive.max_num_samples_for_time_sampling(unused), Some(0));
        assert_eq!(archive.max_num_samples_for_time_sampling(99), None);
        Ok(())
    });

    assert_eq!(archive.max_num_samples_for_time_sampling(1).unwrap(), Some(12));
    assert_eq!(archive.max_num_samples_for_time_sampling(2).unwrap(), Some(0));
    assert_eq!(archive.max_num_samples_for_time_sampling(0).unwrap(), Some(0));
}

#[test]
fn test_acyclic_and_cyclic_lookup() {
    init_tracing();
    let (_store, archive) = memory_roundtrip("irregular", |archive| {
        let acyclic = archive.add_time_sampling(TimeSampling::acyclic(vec![0.0, 0.1, 1.0, 5.0])?)?;
        let cyclic = archive.add_time_sampling(TimeSampling::cyclic(1.0, vec![0.0, 0.25])?)?;
        let props = archive.top()?.create_child("o")?.properties();
        let a = props.create_scalar("a", DataType::FLOAT64, acyclic)?;
        let c = props.create_scalar("c", DataType::FLOAT64, cyclic)?;
        // One sample more than the acyclic sampling has times for.
        for i in 0..5 {
            a.set_value(i as f64)?;
        }
        for i in 0..6 {
            c.set_value(i as f64)?;
        }
        Ok(())
    });

    let props = archive.find_object("/o").unwrap().properties().unwrap();
    let a = props.scalar("a").unwrap();
    assert_eq!(a.sample_time(3).unwrap(), 5.0);
    assert_eq!(a.sample_time(4).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(a.sample_time(5).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
    assert_eq!(a.sample_index(SampleSelector::time_ceil(100.0)).unwrap(), 3);
    let interp = a.interp(3.0).unwrap();
    assert_eq!((interp.floor_index, interp.ceil_index), (2, 3));
    assert!((interp.alpha - 0.5).abs() < 1e-9);

    let c = props.scalar("c").unwrap();
    // Cycles: 0.0, 0.25, 1.0, 1.25, 2.0, 2.25
    assert_eq!(c.sample_time(5).unwrap(), 2.25);
    assert_eq!(c.sample_index(SampleSelector::time_floor(1.9)).unwrap(), 3);
    assert_eq!(c.get_value::<f64>(SampleSelector::time_ceil(1.9)).unwrap(), 4.0);
    let interp = c.interp(10.0).unwrap();
    assert_eq!((interp.floor_index, interp.ceil_index, interp.alpha), (5, 5, 0.0));
}

#[test]
fn test_invalid_descriptors() {
    init_tracing();
    for bad in [
        TimeSampling::uniform(0.0, 0.0),
        TimeSampling::uniform(-1.0, 0.0),
        TimeSampling::uniform(f64::NAN, 0.0),
        TimeSampling::acyclic(vec![]),
        TimeSampling::acyclic(vec![1.0, 0.5]),
        TimeSampling::cyclic(1.0, vec![0.0, 2.0]),
    ] {
        assert_eq!(bad.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
