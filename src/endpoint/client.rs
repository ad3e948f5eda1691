//! Client side of the queue endpoint

use std::{
    io::BufReader,
    os::unix::net::UnixStream,
    path::Path,
};

use crate::{
    config::MAX_FRAME_SIZE,
    control::{read_frame, write_frame, ControlRequest, ControlResponse},
    error::{QueueError, Result},
    framing::Message,
    queue::StatsSnapshot,
};

/// Connection to a [`QueueServer`](super::QueueServer).
///
/// Calls block exactly as the queue operations they forward do.
pub struct QueueClient {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl QueueClient {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .map_err(|e| QueueError::from_io(e, &format!("connecting to {}", path.display())))?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        })
    }

    /// Send one request and wait for its response
    pub fn request(&mut self, request: &ControlRequest) -> Result<ControlResponse> {
        write_frame(&mut self.writer, request)?;
        match read_frame::<_, ControlResponse>(&mut self.reader, MAX_FRAME_SIZE)? {
            Some(response) => response.into_result(),
            None => Err(QueueError::protocol("endpoint closed the connection")),
        }
    }

    pub fn set_capacity(&mut self, capacity: u32) -> Result<()> {
        match self.request(&ControlRequest::SetCapacity { capacity })? {
            ControlResponse::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn push(&mut self, msg_type: i32, payload: &[u8]) -> Result<()> {
        let request = ControlRequest::Push {
            msg_type,
            payload: payload.to_vec(),
        };
        match self.request(&request)? {
            ControlResponse::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn pop(&mut self, max_len: u32) -> Result<Message> {
        match self.request(&ControlRequest::Pop { max_len })? {
            ControlResponse::Message(message) => Ok(message),
            other => Err(unexpected(&other)),
        }
    }

    pub fn stats(&mut self) -> Result<StatsSnapshot> {
        match self.request(&ControlRequest::Stats)? {
            ControlResponse::Stats(stats) => Ok(stats),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &ControlResponse) -> QueueError {
    QueueError::protocol(format!("unexpected response {:?}", response))
}
