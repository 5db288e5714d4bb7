//! Round-trip tests: every pod written to a bundle file or a memory store
//! reads back with the same data type, shape and bytes.

mod common;

use std::path::Path;

use alembic_core::backend::MemoryStore;
use alembic_core::prelude::*;
use common::{init_tracing, memory_roundtrip, pattern_bytes};

const EXTENTS: [u8; 2] = [1, 3];
const ARRAY_LENGTHS: [usize; 3] = [4, 1, 7];

fn fixed_pods() -> impl Iterator<Item = PlainOldDataType> {
    PlainOldDataType::ALL.into_iter().filter(|p| !p.is_string())
}

fn prop_name(prefix: &str, data_type: DataType) -> String {
    format!("{}_{}_{}", prefix, data_type.pod.name(), data_type.extent)
}

fn string_values(data_type: DataType, num_points: usize, seed: usize) -> Vec<String> {
    (0..num_points * data_type.extent as usize)
        .map(|i| match (i + seed) % 4 {
            0 => String::new(),
            1 => format!("value {}", i + seed),
            2 => "Grüße".to_string(),
            _ => "\u{1F600} wide".to_string(),
        })
        .collect()
}

/// Writes one scalar and one array property per pod and extent.
fn write_all_pods(archive: &OArchive) -> Result<()> {
    let ts = archive.add_time_sampling(TimeSampling::uniform(1.0 / 24.0, 0.0)?)?;
    let obj = archive.top()?.create_child("pods")?;
    let props = obj.properties();

    for pod in PlainOldDataType::ALL {
        for extent in EXTENTS {
            let data_type = DataType::new(pod, extent);

            let scalar = props.create_scalar(&prop_name("scalar", data_type), data_type, ts)?;
            for seed in 0..2u8 {
                let sample = if pod.is_string() {
                    ArraySample::from_strings(data_type, Dimensions::scalar(), string_values(data_type, 1, seed as usize))?
                } else {
                    ArraySample::from_bytes(data_type, Dimensions::scalar(), pattern_bytes(data_type, 1, seed))?
                };
                scalar.set_sample(&sample)?;
            }

            let array = props.create_array(&prop_name("array", data_type), data_type, ts)?;
            for (seed, len) in ARRAY_LENGTHS.into_iter().enumerate() {
                let sample = if pod.is_string() {
                    ArraySample::from_strings(data_type, Dimensions::d1(len), string_values(data_type, len, seed))?
                } else {
                    ArraySample::from_bytes(data_type, Dimensions::d1(len), pattern_bytes(data_type, len, seed as u8))?
                };
                array.set_sample(&sample)?;
            }
        }
    }
    Ok(())
}

fn check_all_pods(archive: &IArchive) {
    let props = archive
        .find_object("/pods")
        .expect("pods object")
        .properties()
        .expect("pods properties");
    assert_eq!(props.num_properties(), PlainOldDataType::COUNT * EXTENTS.len() * 2);

    for pod in PlainOldDataType::ALL {
        for extent in EXTENTS {
            let data_type = DataType::new(pod, extent);

            let scalar = props.scalar(&prop_name("scalar", data_type)).expect("scalar property");
            assert_eq!(scalar.data_type(), data_type);
            assert_eq!(scalar.num_samples(), 2);
            for seed in 0..2usize {
                let sample = scalar.get_sample(seed).expect("scalar sample");
                assert_eq!(sample.data_type(), data_type);
                assert_eq!(sample.dims(), &Dimensions::scalar(), "{}", data_type);
                if pod.is_string() {
                    assert_eq!(sample.strings().expect("strings"), string_values(data_type, 1, seed).as_slice());
                } else {
                    assert_eq!(
                        sample.as_bytes().expect("bytes"),
                        pattern_bytes(data_type, 1, seed as u8).as_slice(),
                        "{}",
                        data_type
                    );
                }
            }

            let array = props.array(&prop_name("array", data_type)).expect("array property");
            assert_eq!(array.num_samples(), ARRAY_LENGTHS.len());
            assert!(!array.is_scalar_like());
            assert!(!array.is_constant());
            for (seed, len) in ARRAY_LENGTHS.into_iter().enumerate() {
                let sample = array.get_sample(seed).expect("array sample");
                assert_eq!(sample.dims(), &Dimensions::d1(len));
                assert_eq!(array.get_dimensions(seed).expect("dims"), Dimensions::d1(len));
                if pod.is_string() {
                    assert_eq!(sample.strings().expect("strings"), string_values(data_type, len, seed).as_slice());
                } else {
                    assert_eq!(
                        sample.as_bytes().expect("bytes"),
                        pattern_bytes(data_type, len, seed as u8).as_slice(),
                        "{}",
                        data_type
                    );
                }
            }
        }
    }
}

fn write_bundle(path: &Path, options: WriteOptions) {
    let archive = OArchive::create_with(path, options).expect("create bundle");
    write_all_pods(&archive).expect("write pods");
    archive.close().expect("close bundle");
}

#[test]
fn test_roundtrip_all_pods_memory() {
    init_tracing();
    let (_store, archive) = memory_roundtrip("pods", write_all_pods);
    check_all_pods(&archive);
}

#[test]
fn test_roundtrip_all_pods_bundle_raw() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pods_raw.abcb");
    write_bundle(&path, WriteOptions::default());

    for use_mmap in [true, false] {
        let archive = IArchive::open_with(&path, ReadOptions::new().use_mmap(use_mmap)).expect("open bundle");
        assert_eq!(archive.format().kind, "bundle");
        check_all_pods(&archive);
    }
}

#[test]
fn test_roundtrip_all_pods_bundle_compressed() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pods_zlib.abcb");
    write_bundle(&path, WriteOptions::new().compression(6));

    let archive = IArchive::open_with(&path, ReadOptions::new().verify_digests(true)).expect("open bundle");
    check_all_pods(&archive);
}

#[test]
fn test_roundtrip_typed_values() {
    init_tracing();
    let (_store, archive) = memory_roundtrip("typed", |archive| {
        let props = archive.top()?.create_child("mesh")?.properties();
        props
            .create_array("P", DataType::VEC3F, 0)?
            .set_values(&[Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.5, 0.0)])?;
        props.create_array("flags", DataType::BOOL, 0)?.set_values(&[Bool::TRUE, Bool::FALSE])?;
        props.create_scalar("mass", DataType::FLOAT64, 0)?.set_value(2.5f64)?;
        props.create_scalar("label", DataType::STRING, 0)?.set_string("left arm")?;
        props
            .create_array("names", DataType::WSTRING, 0)?
            .set_strings(&["épaule", "", "main"])?;
        props
            .create_array("pairs", DataType::new(PlainOldDataType::String, 2), 0)?
            .set_strings(&["a", "b", "c", "d"])?;
        Ok(())
    });

    let props = archive.find_object("/mesh").unwrap().properties().unwrap();
    let p: Vec<Vec3> = props.array("P").unwrap().get_values(0).unwrap();
    assert_eq!(p, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.5, 0.0)]);

    let flags: Vec<Bool> = props.array("flags").unwrap().get_values(0).unwrap();
    assert_eq!(flags, vec![Bool::TRUE, Bool::FALSE]);

    assert_eq!(props.scalar("mass").unwrap().get_value::<f64>(0).unwrap(), 2.5);
    assert_eq!(props.scalar("label").unwrap().get_string(0).unwrap(), "left arm");
    assert_eq!(props.array("names").unwrap().get_strings(0).unwrap(), vec!["épaule", "", "main"]);

    let pairs = props.array("pairs").unwrap();
    assert_eq!(pairs.get_dimensions(0).unwrap(), Dimensions::d1(2));
    assert_eq!(pairs.get_strings(0).unwrap(), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_roundtrip_multidimensional_shape() {
    init_tracing();
    let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
    let (_store, archive) = memory_roundtrip("grid", |archive| {
        let grid = archive.top()?.create_child("grid")?.properties().create_array("heights", DataType::FLOAT32, 0)?;
        grid.set_sample(&ArraySample::from_slice_with_dims(&values, Dimensions::d2(3, 4))?)
    });

    let heights = archive.find_object("/grid").unwrap().properties().unwrap().array("heights").unwrap();
    let sample = heights.get_sample(0).unwrap();
    assert_eq!(sample.dims().sizes(), &[3, 4]);
    assert_eq!(sample.values::<f32>().unwrap(), values);
}

#[test]
fn test_read_pod_conversion() {
    init_tracing();
    let (_store, archive) = memory_roundtrip("convert", |archive| {
        let props = archive.top()?.create_child("c")?.properties();
        props.create_array("small", DataType::INT8, 0)?.set_values(&[-3i8, 0, 100])?;
        props.create_array("half", DataType::FLOAT16, 0)?.set_values(&[half::f16::from_f32(1.5)])?;
        Ok(())
    });

    let props = archive.find_object("/c").unwrap().properties().unwrap();
    let small = props.array("small").unwrap();
    let widened = small.get_sample_as(0, PlainOldDataType::Int32).unwrap();
    assert_eq!(widened.data_type(), DataType::INT32);
    assert_eq!(widened.values::<i32>().unwrap(), vec![-3, 0, 100]);

    let key = small.get_key_as(0, PlainOldDataType::Int32).unwrap();
    assert_eq!(key.read_pod, PlainOldDataType::Int32);
    assert_eq!(key.orig_pod, PlainOldDataType::Int8);
    assert_eq!(key, small.get_key(0).unwrap());

    let as_f64 = props.array("half").unwrap().get_sample_as(0, PlainOldDataType::Float64).unwrap();
    assert_eq!(as_f64.values::<f64>().unwrap(), vec![1.5]);
}

#[test]
fn test_read_all_samples_in_parallel() {
    init_tracing();
    let store = MemoryStore::new("frames");
    {
        let archive = OArchive::in_memory(&store, WriteOptions::default()).unwrap();
        let ts = archive.add_time_sampling(TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap()).unwrap();
        let prop = archive
            .top()
            .unwrap()
            .create_child("anim")
            .unwrap()
            .properties()
            .create_array("frame", DataType::UINT32, ts)
            .unwrap();
        for frame in 0..48u32 {
            prop.set_values(&vec![frame; frame as usize + 1]).unwrap();
        }
        archive.close().unwrap();
    }

    let archive = IArchive::open_memory(&store, ReadOptions::default()).unwrap();
    let prop = archive.find_object("/anim").unwrap().properties().unwrap().array("frame").unwrap();
    let samples = prop.read_all_samples().unwrap();
    assert_eq!(samples.len(), 48);
    for (frame, sample) in samples.iter().enumerate() {
        assert_eq!(sample.num_points(), frame + 1);
        assert!(sample.values::<u32>().unwrap().iter().all(|&v| v as usize == frame));
    }
    assert!(archive.cache_size() > 0);
}

#[test]
fn test_archive_metadata_roundtrip() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("meta.abcb");
    {
        let md = MetaData::new().with("studio", "north");
        let options = WriteOptions::new().app_name("roundtrip").description("metadata check").meta_data(md);
        let archive = OArchive::create_with(&path, options).unwrap();
        let obj = archive
            .top()
            .unwrap()
            .create_child_with("xform", MetaData::new().with(MetaData::SCHEMA_KEY, "AbcGeom_Xform_v3"))
            .unwrap();
        obj.properties()
            .create_scalar_with("visible", DataType::INT8, 0, MetaData::new().with(MetaData::INTERPRETATION_KEY, "flag"))
            .unwrap()
            .set_value(1i8)
            .unwrap();
        archive.close().unwrap();
    }

    let archive = IArchive::open(&path).unwrap();
    assert_eq!(archive.app_name().unwrap(), Some("roundtrip"));
    assert_eq!(archive.description().unwrap(), Some("metadata check"));
    assert_eq!(archive.archive_metadata().unwrap().get("studio"), Some("north"));
    assert_eq!(archive.alembic_version().unwrap(), Some(alembic_core::library_version().as_str()));

    let xform = archive.find_object("/xform").unwrap();
    assert_eq!(xform.full_name(), "/xform");
    assert!(xform.matches_schema("AbcGeom_Xform_v3"));
    let visible = xform.properties().unwrap().property_header_by_name("visible").unwrap();
    assert_eq!(visible.interpretation(), Some("flag"));
}
