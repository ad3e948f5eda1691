//! Queue device: dispatches control requests onto one queue

use std::sync::Arc;

use log::{debug, info};

use crate::{
    error::{QueueError, Result},
    queue::MessageQueue,
    sync::{CancelToken, Registration},
};

use super::{
    codes::ControlCode,
    request::{ControlRequest, ControlResponse},
};

/// Cancellation scope of one caller, such as one socket connection.
///
/// Cancelled by [`Session::cancel`] or by device shutdown, whichever comes first.
pub struct Session {
    token: CancelToken,
    _link: Registration,
}

impl Session {
    /// Token parked requests of this session wait with
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Interrupt the session's parked request and refuse further ones
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Addressable endpoint of a single queue.
///
/// Blocking requests park with the device-wide shutdown token, so shutting the
/// device down interrupts every caller still waiting on it. Requests made
/// through a [`Session`] can additionally be interrupted per caller.
#[derive(Debug)]
pub struct QueueDevice {
    queue: Arc<MessageQueue>,
    shutdown: CancelToken,
}

impl QueueDevice {
    pub fn new(queue: Arc<MessageQueue>) -> Self {
        Self {
            queue,
            shutdown: CancelToken::new(),
        }
    }

    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// Open a cancellation scope for one caller
    pub fn session(&self) -> Session {
        let (token, link) = self.shutdown.child();
        Session { token, _link: link }
    }

    /// Execute one request
    pub fn dispatch(&self, request: ControlRequest) -> Result<ControlResponse> {
        self.execute(request, &self.shutdown)
    }

    /// Execute one request on behalf of `session`.
    ///
    /// A cancelled session gets `Interrupted` without touching the queue, even
    /// when the request could complete immediately.
    pub fn dispatch_in(&self, session: &Session, request: ControlRequest) -> Result<ControlResponse> {
        self.execute(request, session.token())
    }

    fn execute(&self, request: ControlRequest, cancel: &CancelToken) -> Result<ControlResponse> {
        if self.is_shut_down() {
            return Err(QueueError::interrupted("device shutdown"));
        }
        if cancel.is_cancelled() {
            return Err(QueueError::interrupted("caller cancelled"));
        }

        let code = request.code();
        debug!("dispatching {}", code.name());

        match request {
            ControlRequest::SetCapacity { capacity } => {
                self.queue.resize(capacity)?;
                Ok(ControlResponse::Done)
            }
            ControlRequest::Push { msg_type, payload } => {
                self.queue.push_cancellable(msg_type, &payload, cancel)?;
                Ok(ControlResponse::Done)
            }
            ControlRequest::Pop { max_len } => {
                let message = self.queue.pop_cancellable(max_len, cancel)?;
                Ok(ControlResponse::Message(message))
            }
            ControlRequest::Stats => Ok(ControlResponse::Stats(self.queue.stats())),
        }
    }

    /// Execute a request after checking it against a raw control code
    pub fn dispatch_raw(&self, raw_code: u64, request: ControlRequest) -> Result<ControlResponse> {
        let code = ControlCode::from_raw(raw_code)?;
        if code != request.code() {
            return Err(QueueError::invalid_parameter(
                "request",
                format!("{} does not match {}", code.name(), request.code().name()),
            ));
        }
        self.dispatch(request)
    }

    /// Interrupt every parked caller and refuse further requests
    pub fn shutdown(&self) {
        if !self.is_shut_down() {
            info!("shutting down queue '{}'", self.queue.config().name);
        }
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    fn device(capacity: u32) -> Arc<QueueDevice> {
        Arc::new(QueueDevice::new(Arc::new(
            MessageQueue::with_capacity(capacity).unwrap(),
        )))
    }

    #[test]
    fn test_dispatch_round_trip() {
        let device = device(0);
        device
            .dispatch(ControlRequest::SetCapacity { capacity: 64 })
            .unwrap();
        device
            .dispatch(ControlRequest::Push {
                msg_type: 100,
                payload: b"line\n".to_vec(),
            })
            .unwrap();

        match device.dispatch(ControlRequest::Stats).unwrap() {
            ControlResponse::Stats(stats) => {
                assert_eq!(stats.capacity_bytes, 64);
                assert_eq!(stats.used_bytes, 13);
            }
            other => panic!("unexpected response {:?}", other),
        }

        match device.dispatch(ControlRequest::Pop { max_len: 256 }).unwrap() {
            ControlResponse::Message(message) => {
                assert_eq!(message.msg_type, 100);
                assert_eq!(message.payload, b"line\n");
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_raw_rejects_unknown_code() {
        let device = device(64);
        let err = device
            .dispatch_raw(0xffff, ControlRequest::Stats)
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidOperation { .. }));

        let err = device
            .dispatch_raw(ControlCode::Pop.raw(), ControlRequest::Stats)
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidParameter { .. }));
    }

    #[test]
    fn test_cancelled_session_leaves_queue_untouched() {
        let device = device(64);
        let session = Arc::new(device.session());

        let reader = {
            let device = device.clone();
            let session = session.clone();
            thread::spawn(move || device.dispatch_in(&session, ControlRequest::Pop { max_len: 256 }))
        };
        while device.queue().stats().blocked_readers == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        session.cancel();
        let result = reader.join().unwrap();
        assert!(matches!(result, Err(QueueError::Interrupted { .. })));

        // A cancelled session never consumes, even when data is ready
        device
            .dispatch(ControlRequest::Push {
                msg_type: 100,
                payload: b"kept\n".to_vec(),
            })
            .unwrap();
        let result = device.dispatch_in(&session, ControlRequest::Pop { max_len: 256 });
        assert!(matches!(result, Err(QueueError::Interrupted { .. })));

        let stats = device.queue().stats();
        assert_eq!(stats.used_bytes, 13);
        assert_eq!(stats.total_pops, 0);
        assert!(!device.is_shut_down());
    }

    #[test]
    fn test_shutdown_cancels_sessions() {
        let device = device(64);
        let session = device.session();
        device.shutdown();
        assert!(session.is_cancelled());
        assert!(device.session().is_cancelled());
    }

    #[test]
    fn test_shutdown_interrupts_parked_pop() {
        let device = device(64);

        let reader = {
            let device = device.clone();
            thread::spawn(move || device.dispatch(ControlRequest::Pop { max_len: 256 }))
        };

        while device.queue().stats().blocked_readers == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        device.shutdown();

        let result = reader.join().unwrap();
        assert!(matches!(result, Err(QueueError::Interrupted { .. })));
        assert!(matches!(
            device.dispatch(ControlRequest::Stats),
            Err(QueueError::Interrupted { .. })
        ));
    }
}
