//! Queue and control plane integration tests
//! Exercises the public API the way the command-line tools use it.

use std::{sync::Arc, thread};

use typedq::{
    control::{ControlCode, ControlRequest, ControlResponse},
    message_types, ByteSink, MessageQueue, QueueConfig, QueueDevice, QueueError, SliceSink,
    HEADER_SIZE,
};

#[cfg(test)]
mod queue_tests {
    use super::*;

    #[test]
    fn test_fill_then_read_preserves_lines() {
        let queue = MessageQueue::with_capacity(64).unwrap();
        let lines = ["alpha\n", "beta\n", "gamma\n"];

        for line in &lines {
            queue.push(message_types::LOG, line.as_bytes()).unwrap();
        }
        let expected_used: usize = lines.iter().map(|l| HEADER_SIZE + l.len()).sum();
        assert_eq!(queue.used(), expected_used);

        for line in &lines {
            let message = queue.pop(256).unwrap();
            assert_eq!(message.msg_type, message_types::LOG);
            assert_eq!(message.payload_str(), *line);
        }
        assert_eq!(queue.used(), 0);
    }

    #[test]
    fn test_frames_wrap_around_the_ring() {
        // 40-byte ring, 18-byte frames: the third frame straddles the end
        let queue = MessageQueue::with_capacity(40).unwrap();

        for round in 0..10u8 {
            let payload = [round; 10];
            queue.push(i32::from(round), &payload).unwrap();
            queue.push(-1, &payload).unwrap();

            let first = queue.pop(10).unwrap();
            assert_eq!(first.msg_type, i32::from(round));
            assert_eq!(first.payload, payload);

            let second = queue.pop(10).unwrap();
            assert_eq!(second.msg_type, -1);
            assert_eq!(second.payload, payload);
        }
    }

    #[test]
    fn test_pop_into_slice_sink() {
        let queue = MessageQueue::with_capacity(64).unwrap();
        queue.push(message_types::JOB, b"7:uptime\n").unwrap();

        let mut buf = [0u8; 256];
        let mut sink = SliceSink::new(&mut buf);
        assert_eq!(sink.capacity(), 256);

        let header = queue.pop_into(&mut sink, None).unwrap();
        assert_eq!(header.msg_type, message_types::JOB);
        assert_eq!(header.length, 9);
        assert_eq!(&buf[..9], b"7:uptime\n");
    }

    #[test]
    fn test_resize_discards_and_reports_capacity() {
        let queue = MessageQueue::new(QueueConfig::new("configurator").with_initial_capacity(32)).unwrap();
        queue.push(message_types::LOG, b"lost").unwrap();

        queue.resize(64).unwrap();
        let stats = queue.stats();
        assert_eq!(stats.capacity_bytes, 64);
        assert_eq!(stats.used_bytes, 0);
        assert!(matches!(queue.try_pop(256), Err(QueueError::WouldBlock { .. })));

        queue.resize(0).unwrap();
        assert!(matches!(
            queue.try_push(message_types::LOG, b""),
            Err(QueueError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_stats_rendering() {
        let queue = MessageQueue::with_capacity(64).unwrap();
        queue.push(message_types::LOG, b"abc").unwrap();

        let rendered = queue.stats().to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "queue_size_bytes: 64");
        assert_eq!(lines[1], "used_bytes: 11");
        assert!(rendered.contains("total_pushes: 1"));
        assert!(rendered.contains("blocked_writers: 0"));
    }

    #[test]
    fn test_device_dispatch_by_raw_code() {
        let device = QueueDevice::new(Arc::new(MessageQueue::with_capacity(0).unwrap()));

        device
            .dispatch_raw(ControlCode::SetCapacity.raw(), ControlRequest::SetCapacity { capacity: 64 })
            .unwrap();
        device
            .dispatch_raw(
                ControlCode::Push.raw(),
                ControlRequest::Push {
                    msg_type: message_types::LOG,
                    payload: b"via code\n".to_vec(),
                },
            )
            .unwrap();

        let response = device
            .dispatch_raw(ControlCode::Pop.raw(), ControlRequest::Pop { max_len: 256 })
            .unwrap();
        match response {
            ControlResponse::Message(message) => assert_eq!(message.payload, b"via code\n"),
            other => panic!("unexpected response {:?}", other),
        }

        let err = device
            .dispatch_raw(0x4242, ControlRequest::Stats)
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidOperation { code: 0x4242 }));
        assert_eq!(err.errno(), libc::EINVAL);
    }

    #[test]
    fn test_blocked_writer_resumes_after_pop() {
        let queue = Arc::new(MessageQueue::with_capacity(24).unwrap());
        queue.push(1, &[0u8; 16]).unwrap();

        let writer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(2, &[1u8; 8]))
        };

        while queue.stats().blocked_writers == 0 {
            thread::yield_now();
        }

        assert_eq!(queue.pop(16).unwrap().msg_type, 1);
        writer.join().unwrap().unwrap();

        let message = queue.pop(16).unwrap();
        assert_eq!(message.msg_type, 2);
        assert_eq!(message.payload, [1u8; 8]);
        assert_eq!(queue.stats().blocked_writers, 1);
    }
}
