//! End-to-end dump/restore scenarios through the public API, using the
//! on-disk stream factory.

use std::sync::Arc;
use tempfile::tempdir;
use voxmem::{
    BufferManager, BufferManagerConfig, BufferObject, DumpPolicyConfig, FileStreamFactory,
    FixedProbe, LoadingMode, MemoryProbe, Residency, StorageKey, StreamFactory,
};

fn fill_pattern(buffer: &BufferObject, seed: u8) {
    let lock = buffer.lock().unwrap();
    let mut bytes = lock.bytes_mut();
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = seed.wrapping_add((i % 251) as u8);
    }
}

fn check_pattern(buffer: &BufferObject, seed: u8) {
    let lock = buffer.lock().unwrap();
    let bytes = lock.bytes();
    for (i, byte) in bytes.iter().enumerate() {
        assert_eq!(*byte, seed.wrapping_add((i % 251) as u8), "at offset {i}");
    }
}

#[test]
fn file_backed_dump_survives_restore() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(FileStreamFactory::new(dir.path()).unwrap());
    let manager = BufferManager::with_defaults();

    let buffer = BufferObject::new(&manager);
    buffer.allocate(64 * 1024).unwrap();
    fill_pattern(&buffer, 11);
    buffer
        .set_stream_factory(factory.clone(), StorageKey::from("volume-0"), 0)
        .unwrap();

    assert!(manager.dump(buffer.id()).unwrap());
    assert!(factory.path(&StorageKey::from("volume-0")).is_file());
    assert_eq!(manager.total_allocated(), 0);

    check_pattern(&buffer, 11);
    assert_eq!(buffer.residency(), Residency::Resident);
}

#[test]
fn large_buffer_round_trip() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(FileStreamFactory::new(dir.path()).unwrap());
    let manager = BufferManager::with_defaults();

    let buffer = BufferObject::new(&manager);
    buffer.allocate(4 * 1024 * 1024).unwrap();
    fill_pattern(&buffer, 42);
    buffer
        .set_stream_factory(factory, StorageKey::from("big"), 0)
        .unwrap();

    assert!(manager.dump(buffer.id()).unwrap());
    assert!(manager.restore(buffer.id()).unwrap());
    check_pattern(&buffer, 42);
}

#[test]
fn lazy_file_content_loads_on_first_lock() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(FileStreamFactory::new(dir.path()).unwrap());
    let key = StorageKey::from("preexisting");
    {
        use std::io::Write;
        let mut writer = factory.writer(&key).unwrap();
        writer.write_all(&[9u8; 128]).unwrap();
        writer.flush().unwrap();
    }

    let manager = BufferManager::with_defaults();
    let buffer = BufferObject::new(&manager);
    buffer.set_stream_factory(factory, key, 128).unwrap();
    assert_eq!(buffer.residency(), Residency::Dumped);

    let lock = buffer.lock().unwrap();
    assert_eq!(&lock.bytes()[..], &[9u8; 128][..]);
}

#[test]
fn direct_mode_loads_without_a_lock() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(FileStreamFactory::new(dir.path()).unwrap());
    let key = StorageKey::from("eager");
    {
        use std::io::Write;
        let mut writer = factory.writer(&key).unwrap();
        writer.write_all(&[1u8; 32]).unwrap();
        writer.flush().unwrap();
    }

    let manager = BufferManager::new(BufferManagerConfig {
        loading_mode: LoadingMode::Direct,
        ..BufferManagerConfig::default()
    });
    let buffer = BufferObject::new(&manager);
    buffer.set_stream_factory(factory, key, 32).unwrap();
    assert_eq!(buffer.residency(), Residency::Resident);
    assert_eq!(manager.total_allocated(), 32);
}

#[test]
fn valve_pressure_spills_to_disk_and_recovers() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(FileStreamFactory::new(dir.path()).unwrap());
    let probe = Arc::new(FixedProbe::new(1 << 30));
    let manager = BufferManager::new(BufferManagerConfig {
        probe: Arc::clone(&probe) as Arc<dyn MemoryProbe>,
        ..BufferManagerConfig::default()
    });
    manager
        .configure_dump_policy(&DumpPolicyConfig {
            policy: "valve".to_string(),
            params: [
                ("min_free_mem".to_string(), "1M".to_string()),
                ("hysteresis_offset".to_string(), "0".to_string()),
            ]
            .into(),
        })
        .unwrap();

    let buffers: Vec<_> = (0..4)
        .map(|i| {
            let buffer = BufferObject::new(&manager);
            buffer.allocate(256 * 1024).unwrap();
            fill_pattern(&buffer, i);
            buffer
                .set_stream_factory(
                    factory.clone(),
                    StorageKey::from(format!("spill-{i}")),
                    0,
                )
                .unwrap();
            buffer
        })
        .collect();
    assert!(buffers.iter().all(|b| b.residency() == Residency::Resident));

    // Pressure arrives: the next consultation needs 512 KiB back, which
    // costs the two least recently touched buffers.
    probe.set_free(512 * 1024);
    let lock = buffers[3].lock().unwrap();
    probe.set_free(1 << 30); // pressure relieved
    lock.unlock();

    assert_eq!(buffers[0].residency(), Residency::Dumped);
    assert_eq!(buffers[1].residency(), Residency::Dumped);
    assert_eq!(buffers[2].residency(), Residency::Resident);
    assert_eq!(buffers[3].residency(), Residency::Resident);

    // Everything reads back intact regardless of where it sat.
    for (i, buffer) in buffers.iter().enumerate() {
        check_pattern(buffer, i as u8);
    }
}
