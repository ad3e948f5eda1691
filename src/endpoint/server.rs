//! Unix socket server exposing one queue device
//!
//! A mio poll loop accepts connections; each connection is served on its own
//! thread because queue requests block until their condition holds.
//!
//! The poll loop also watches every connection for hang-up. A request still
//! parked when its client disconnects is interrupted through the connection's
//! [`Session`], so it never consumes or inserts a message on behalf of a peer
//! that is gone.

use std::{
    collections::HashMap,
    fs,
    io::{self, BufReader},
    net::Shutdown,
    os::{
        fd::AsRawFd,
        unix::{
            fs::FileTypeExt,
            net::{UnixListener, UnixStream},
        },
    },
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
};

use log::{debug, error, info, warn};
use mio::{unix::SourceFd, Events, Interest, Poll, Registry, Token, Waker};

use crate::{
    config::MAX_FRAME_SIZE,
    control::{read_frame, write_frame, ControlRequest, ControlResponse, QueueDevice, Session},
    error::{QueueError, Result},
};

const LISTENER_TOKEN: Token = Token(0);
const WAKE_TOKEN: Token = Token(1);
/// Connection `id` polls under `Token(FIRST_CONNECTION_TOKEN + id)`
const FIRST_CONNECTION_TOKEN: usize = 2;

struct Connection {
    stream: UnixStream,
    session: Arc<Session>,
    handle: Option<JoinHandle<()>>,
}

struct Shared {
    device: Arc<QueueDevice>,
    registry: Registry,
    running: AtomicBool,
    next_id: AtomicU64,
    connections: Mutex<HashMap<u64, Connection>>,
}

impl Shared {
    fn connections(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Connection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Interrupt whatever the connection behind `token` has parked
    fn peer_hung_up(&self, token: Token) {
        let Some(id) = token.0.checked_sub(FIRST_CONNECTION_TOKEN) else {
            return;
        };
        if let Some(connection) = self.connections().get(&(id as u64)) {
            debug!("connection {} hung up", id);
            connection.session.cancel();
        }
    }
}

/// Serves a [`QueueDevice`] on a Unix domain socket
pub struct QueueServer {
    path: PathBuf,
    shared: Arc<Shared>,
    waker: Waker,
    accept_thread: Option<JoinHandle<()>>,
}

impl QueueServer {
    /// Bind `path` and start accepting connections.
    ///
    /// A stale socket file left at `path` is replaced; any other file is an error.
    pub fn bind(path: impl AsRef<Path>, device: Arc<QueueDevice>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        remove_stale_socket(&path)?;

        let listener = UnixListener::bind(&path)
            .map_err(|e| QueueError::from_io(e, "binding endpoint socket"))?;
        listener.set_nonblocking(true)?;

        let poll = Poll::new()?;
        let fd = listener.as_raw_fd();
        poll.registry()
            .register(&mut SourceFd(&fd), LISTENER_TOKEN, Interest::READABLE)?;
        let waker = Waker::new(poll.registry(), WAKE_TOKEN)?;

        let shared = Arc::new(Shared {
            device,
            registry: poll.registry().try_clone()?,
            running: AtomicBool::new(true),
            next_id: AtomicU64::new(0),
            connections: Mutex::new(HashMap::new()),
        });

        let accept_thread = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("typedq-accept".into())
                .spawn(move || accept_loop(poll, listener, shared))?
        };

        info!("serving queue '{}' on {}", shared.device.queue().config().name, path.display());

        Ok(Self {
            path,
            shared,
            waker,
            accept_thread: Some(accept_thread),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn device(&self) -> &Arc<QueueDevice> {
        &self.shared.device
    }

    /// Number of connections currently being served
    pub fn connection_count(&self) -> usize {
        self.shared.connections().len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Block until the accept loop exits
    pub fn wait(&mut self) {
        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                error!("accept thread panicked");
            }
        }
    }

    /// Stop accepting, interrupt parked requests, close every connection and
    /// remove the socket file
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.shared.device.shutdown();
        if let Err(e) = self.waker.wake() {
            warn!("failed to wake accept loop: {}", e);
        }
        self.wait();

        let connections: Vec<Connection> = self.shared.connections().drain().map(|(_, c)| c).collect();
        for connection in &connections {
            // NotConnected once the peer is gone
            let _ = connection.stream.shutdown(Shutdown::Both);
        }
        for mut connection in connections {
            if let Some(handle) = connection.handle.take() {
                if handle.join().is_err() {
                    error!("connection thread panicked");
                }
            }
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(QueueError::from_io(e, "removing endpoint socket")),
        }
        info!("endpoint {} closed", self.path.display());
        Ok(())
    }
}

impl Drop for QueueServer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("endpoint shutdown failed: {}", e);
        }
    }
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!("removing stale socket {}", path.display());
            fs::remove_file(path).map_err(|e| QueueError::from_io(e, "removing stale socket"))
        }
        Ok(_) => Err(QueueError::invalid_parameter(
            "path",
            format!("{} exists and is not a socket", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(QueueError::from_io(e, "inspecting endpoint path")),
    }
}

fn accept_loop(mut poll: Poll, listener: UnixListener, shared: Arc<Shared>) {
    let mut events = Events::with_capacity(16);

    while shared.running.load(Ordering::SeqCst) {
        if let Err(e) = poll.poll(&mut events, None) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            error!("endpoint poll failed: {}", e);
            break;
        }

        for event in events.iter() {
            match event.token() {
                WAKE_TOKEN => return,
                LISTENER_TOKEN => accept_pending(&listener, &shared),
                token if event.is_read_closed() || event.is_error() => shared.peer_hung_up(token),
                _ => {}
            }
        }
    }
}

fn accept_pending(listener: &UnixListener, shared: &Arc<Shared>) {
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = spawn_connection(stream, shared) {
                    warn!("dropping connection: {}", e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("accept failed: {}", e);
                return;
            }
        }
    }
}

fn spawn_connection(stream: UnixStream, shared: &Arc<Shared>) -> Result<()> {
    stream.set_nonblocking(false)?;
    let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
    let control = stream.try_clone()?;
    let session = Arc::new(shared.device.session());

    // Hang-up watch; a peer that already closed is reported on the next poll
    let fd = stream.as_raw_fd();
    shared.registry.register(
        &mut SourceFd(&fd),
        Token(FIRST_CONNECTION_TOKEN + id as usize),
        Interest::READABLE,
    )?;

    // Spawn under the lock so the handler cannot remove its entry before the insert
    let mut connections = shared.connections();
    let handle = {
        let shared = shared.clone();
        let session = session.clone();
        thread::Builder::new()
            .name(format!("typedq-conn-{}", id))
            .spawn(move || {
                debug!("connection {} opened", id);
                if let Err(e) = serve_connection(&shared.device, &session, &stream) {
                    debug!("connection {} ended: {}", id, e);
                }
                if let Err(e) = shared.registry.deregister(&mut SourceFd(&fd)) {
                    debug!("connection {} deregister failed: {}", id, e);
                }
                shared.connections().remove(&id);
                debug!("connection {} closed", id);
            })?
    };
    connections.insert(
        id,
        Connection {
            stream: control,
            session,
            handle: Some(handle),
        },
    );
    Ok(())
}

fn serve_connection(device: &QueueDevice, session: &Session, stream: &UnixStream) -> Result<()> {
    let mut reader = BufReader::new(stream);
    let mut writer = stream;

    while let Some(request) = read_frame::<_, ControlRequest>(&mut reader, MAX_FRAME_SIZE)? {
        let response = ControlResponse::from_result(device.dispatch_in(session, request));
        write_frame(&mut writer, &response)?;
    }
    Ok(())
}
