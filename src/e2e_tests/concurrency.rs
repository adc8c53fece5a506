//! Tests for handles sharing one session across threads

use super::recording::Call;
use super::test_context::TestContext;
use crate::engine::OpenFlags;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(index: usize) -> Vec<u8> {
        (0..4096).map(|i| ((i * 7 + index * 31) % 251) as u8).collect()
    }

    #[test]
    fn test_concurrent_reads_do_not_interleave() {
        const THREADS: usize = 6;
        let ctx = TestContext::new();
        for index in 0..THREADS {
            ctx.write_fixture(&format!("file{}.bin", index), &fixture(index));
        }
        ctx.probe.slow_reads(Duration::from_millis(2));

        let barrier = Arc::new(Barrier::new(THREADS));
        let workers: Vec<_> = (0..THREADS)
            .map(|index| {
                let session = Arc::clone(&ctx.session);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut file = session
                        .open_file(&format!("file{}.bin", index), OpenFlags::READ_ONLY)
                        .unwrap();
                    barrier.wait();

                    let mut contents = Vec::new();
                    let mut buf = [0u8; 333];
                    loop {
                        let n = file.read(&mut buf).unwrap();
                        if n == 0 {
                            break;
                        }
                        contents.extend_from_slice(&buf[..n]);
                    }
                    (index, contents)
                })
            })
            .collect();

        for worker in workers {
            let (index, contents) = worker.join().unwrap();
            assert_eq!(contents, fixture(index), "file{} corrupted", index);
        }
        assert_eq!(ctx.probe.max_in_flight(), 1);
    }

    #[test]
    fn test_mixed_operations_are_serialized() {
        const THREADS: usize = 4;
        let ctx = TestContext::new();
        for index in 0..THREADS {
            ctx.write_fixture(&format!("dir{}/file.bin", index), &fixture(index));
        }
        ctx.probe.slow_reads(Duration::from_millis(1));

        let barrier = Arc::new(Barrier::new(THREADS));
        let workers: Vec<_> = (0..THREADS)
            .map(|index| {
                let session = Arc::clone(&ctx.session);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..10 {
                        let path = format!("dir{}/file.bin", index);
                        let mut file = session.open_file(&path, OpenFlags::READ_ONLY).unwrap();
                        file.seek(std::io::SeekFrom::End(-16)).unwrap();
                        let mut buf = [0u8; 16];
                        assert_eq!(file.read(&mut buf).unwrap(), 16);
                        file.close().unwrap();

                        let mut dir = session
                            .open_file(&format!("dir{}", index), OpenFlags::READ_ONLY)
                            .unwrap();
                        assert_eq!(dir.readdir(0).unwrap().len(), 1);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        ctx.session.disconnect();

        assert!(ctx.probe.count(&Call::Fstat) >= THREADS * 10);
        assert_eq!(ctx.probe.max_in_flight(), 1);
    }

    #[test]
    fn test_disconnect_while_handles_in_use() {
        let ctx = TestContext::new();
        ctx.write_fixture("big.bin", &fixture(0));
        ctx.probe.slow_reads(Duration::from_millis(1));

        let mut file = ctx
            .session
            .open_file("big.bin", OpenFlags::READ_ONLY)
            .unwrap();
        let reader = thread::spawn(move || {
            let mut total = 0;
            let mut buf = [0u8; 64];
            loop {
                match file.read(&mut buf).unwrap() {
                    0 => break,
                    n => total += n,
                }
            }
            total
        });

        thread::sleep(Duration::from_millis(5));
        ctx.session.disconnect();

        // Either the read finished first or it stopped cleanly at end of stream.
        let total = reader.join().unwrap();
        assert!(total <= 4096);
        assert_eq!(ctx.probe.max_in_flight(), 1);
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        fn assert_send<T: Send>() {}
        assert_send_sync::<crate::session::Session>();
        assert_send::<crate::file::SmbFile>();
    }
}
