//! View transport: line-delimited JSON over a Unix domain socket.
//!
//! One request per connection. `subscribe` keeps the connection open and
//! streams one broadcast per line until the view hangs up.

#[cfg(unix)]
pub use unix::start;

/// Unix domain sockets are the only transport; other hosts can still use
/// the privileged console.
#[cfg(not(unix))]
pub fn start(
    _socket_path: &std::path::Path,
    _handle: launcher_core::RuntimeHandle,
) -> Result<std::thread::JoinHandle<()>, String> {
    Err(launcher_core::LauncherError::PlatformUnsupported(std::env::consts::OS.to_string()).into())
}

#[cfg(unix)]
mod unix {
    use fs_err as fs;
    use launcher_core::{Origin, RuntimeHandle};
    use lazy_launcher_protocol::{
        CommandName, ErrorInfo, Request, Response, MAX_REQUEST_BYTES,
    };
    use serde::Serialize;
    use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::Path;
    use std::sync::mpsc::RecvTimeoutError;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tracing::{info, warn};

    const READ_TIMEOUT_SECS: u64 = 2;
    /// How often an idle subscription checks whether its view is still there.
    const HANGUP_CHECK_INTERVAL: Duration = Duration::from_millis(250);

    /// Binds the socket and serves it on a background thread.
    pub fn start(socket_path: &Path, handle: RuntimeHandle) -> Result<JoinHandle<()>, String> {
        let listener = bind(socket_path)?;
        thread::Builder::new()
            .name("view-transport".to_string())
            .spawn(move || serve(listener, handle))
            .map_err(|err| format!("Failed to start view transport: {}", err))
    }

    /// Binds `socket_path`, replacing a stale socket left by a previous run.
    fn bind(socket_path: &Path) -> Result<UnixListener, String> {
        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| format!("Failed to create socket directory: {}", err))?;
        }
        if socket_path.exists() {
            fs::remove_file(socket_path)
                .map_err(|err| format!("Failed to remove existing socket: {}", err))?;
        }

        let listener = UnixListener::bind(socket_path)
            .map_err(|err| format!("Failed to bind {}: {}", socket_path.display(), err))?;
        info!(path = %socket_path.display(), "View transport listening");
        Ok(listener)
    }

    /// Accept loop. Each connection gets its own thread.
    fn serve(listener: UnixListener, handle: RuntimeHandle) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let handle = handle.clone();
                    thread::spawn(move || handle_connection(stream, handle));
                }
                Err(err) => {
                    warn!(error = %err, "Failed to accept view connection");
                }
            }
        }
    }

    fn handle_connection(mut stream: UnixStream, handle: RuntimeHandle) {
        let request = match read_request(&mut stream) {
            Ok(request) => request,
            Err(err) => {
                warn!(code = %err.code, message = %err.message, "Failed to read request");
                let _ = write_line(&mut stream, &Response::failure(None, &err.code, err.message));
                return;
            }
        };

        tracing::debug!(command = %request.command, id = ?request.id, "View request received");
        if request.command == CommandName::Subscribe.as_str() {
            stream_broadcasts(stream, handle, request.id);
            return;
        }

        let response = handle.dispatch(Origin::View, request);
        let _ = write_line(&mut stream, &response);
    }

    fn stream_broadcasts(mut stream: UnixStream, handle: RuntimeHandle, id: Option<String>) {
        let (response, broadcasts) = match handle.subscribe(id.clone()) {
            Ok(subscription) => subscription,
            Err(err) => {
                let _ = write_line(&mut stream, &Response::failure(id, err.code(), err.to_string()));
                return;
            }
        };
        if write_line(&mut stream, &response).is_err() {
            return;
        }

        // Returning drops the subscription, which unregisters the view.
        loop {
            match broadcasts.recv_timeout(HANGUP_CHECK_INTERVAL) {
                Ok(event) => {
                    if let Err(err) = write_line(&mut stream, &event) {
                        tracing::debug!(error = %err, "View disconnected; ending subscription");
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if view_hung_up(&mut stream) {
                        tracing::debug!("View hung up; ending subscription");
                        return;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    /// Views send nothing after `subscribe`, so a readable EOF means they left.
    /// Stray input is discarded.
    fn view_hung_up(stream: &mut UnixStream) -> bool {
        if stream.set_nonblocking(true).is_err() {
            return true;
        }
        let mut scratch = [0u8; 64];
        let gone = match stream.read(&mut scratch) {
            Ok(0) => true,
            Ok(_) => false,
            Err(err) => err.kind() != ErrorKind::WouldBlock,
        };
        gone || stream.set_nonblocking(false).is_err()
    }

    /// Reads the first line of the connection as a request.
    fn read_request(stream: &mut UnixStream) -> Result<Request, ErrorInfo> {
        let _ = stream.set_read_timeout(Some(Duration::from_secs(READ_TIMEOUT_SECS)));

        let limit = MAX_REQUEST_BYTES as u64 + 1;
        let mut reader = BufReader::new(std::io::Read::by_ref(stream).take(limit));
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).map_err(|err| match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                ErrorInfo::new("read_timeout", "request timed out")
            }
            _ => ErrorInfo::new("read_error", format!("failed to read request: {}", err)),
        })?;

        let body = line.strip_suffix(b"\n").unwrap_or(&line[..]);
        if body.len() > MAX_REQUEST_BYTES {
            return Err(ErrorInfo::new(
                "request_too_large",
                "request exceeded maximum size",
            ));
        }
        if reader.buffer().iter().any(|b| !b.is_ascii_whitespace()) {
            warn!("Ignoring data after the request line");
        }
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ErrorInfo::new("empty_request", "request body was empty"));
        }

        serde_json::from_slice(body).map_err(|err| {
            ErrorInfo::new(
                "invalid_json",
                format!("request was not valid JSON: {}", err),
            )
        })
    }

    fn write_line<T: Serialize>(stream: &mut UnixStream, value: &T) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        stream.write_all(&line)?;
        stream.flush()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use launcher_core::platform::UnsupportedLauncher;
        use launcher_core::{runtime, ConfigStore, FixedAppearance, HeadlessChrome, StateSyncBroker};
        use lazy_launcher_protocol::{Broadcast, Theme};
        use serde_json::json;
        use std::sync::{mpsc, Arc};
        use tempfile::TempDir;

        struct Fixture {
            _temp: TempDir,
            socket: std::path::PathBuf,
            handle: RuntimeHandle,
        }

        fn fixture() -> Fixture {
            let temp = TempDir::new().unwrap();
            let socket = temp.path().join("t.sock");
            let broker = StateSyncBroker::load(
                ConfigStore::with_root(temp.path().join("config")),
                Box::new(FixedAppearance(false)),
                Box::new(HeadlessChrome),
            );
            let (handle, _thread) =
                runtime::spawn(Arc::new(UnsupportedLauncher::new("test-os")), broker).unwrap();
            start(&socket, handle.clone()).unwrap();
            Fixture {
                _temp: temp,
                socket,
                handle,
            }
        }

        fn roundtrip(socket: &Path, raw: &[u8]) -> Response {
            let mut stream = UnixStream::connect(socket).unwrap();
            stream.write_all(raw).unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).unwrap();
            serde_json::from_str(&line).unwrap()
        }

        #[test]
        fn dispatches_view_commands() {
            let f = fixture();
            let response = roundtrip(
                &f.socket,
                b"{\"command\":\"stop-project\",\"id\":\"1\",\"payload\":{\"projectId\":\"missing\"}}\n",
            );
            assert!(response.success);
            assert_eq!(response.id.as_deref(), Some("1"));
            assert_eq!(response.message.as_deref(), Some("not running"));
        }

        #[test]
        fn view_connections_cannot_set_theme() {
            let f = fixture();
            let response = roundtrip(
                &f.socket,
                b"{\"command\":\"set-theme\",\"payload\":{\"theme\":\"dark\"}}\n",
            );
            assert_eq!(response.error.as_deref(), Some("UnknownCommand"));
        }

        #[test]
        fn malformed_requests_get_transport_errors() {
            let f = fixture();
            assert_eq!(
                roundtrip(&f.socket, b"not json\n").error.as_deref(),
                Some("invalid_json")
            );
            assert_eq!(
                roundtrip(&f.socket, b"   \n").error.as_deref(),
                Some("empty_request")
            );
        }

        #[test]
        fn trailing_bytes_are_ignored() {
            let f = fixture();
            let response = roundtrip(
                &f.socket,
                b"{\"command\":\"get-ui-state\"}\n{\"command\":\"app-info\"}",
            );
            assert_eq!(response.data, Some(json!({ "theme": "system", "locale": "en" })));
        }

        #[test]
        fn subscribe_streams_broadcasts() {
            let f = fixture();
            let mut stream = UnixStream::connect(&f.socket).unwrap();
            stream
                .write_all(b"{\"command\":\"subscribe\",\"id\":\"s\"}\n")
                .unwrap();
            let mut reader = BufReader::new(stream);

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let initial: Response = serde_json::from_str(&line).unwrap();
            assert_eq!(initial.id.as_deref(), Some("s"));
            assert_eq!(initial.data, Some(json!({ "theme": "system", "locale": "en" })));

            f.handle.dispatch(
                Origin::Privileged,
                Request::new(CommandName::SetTheme, Some(json!({ "theme": "light" }))),
            );

            line.clear();
            reader.read_line(&mut line).unwrap();
            let event: Broadcast = serde_json::from_str(&line).unwrap();
            assert_eq!(event, Broadcast::ThemeChanged { theme: Theme::Light });
        }

        #[test]
        fn subscription_ends_when_view_hangs_up() {
            let f = fixture();
            let (view, server_side) = UnixStream::pair().unwrap();
            let (done_tx, done) = mpsc::channel();
            let handle = f.handle.clone();
            thread::spawn(move || {
                stream_broadcasts(server_side, handle, None);
                let _ = done_tx.send(());
            });

            let mut reader = BufReader::new(view);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let initial: Response = serde_json::from_str(&line).unwrap();
            assert!(initial.success);

            drop(reader);
            done.recv_timeout(Duration::from_secs(3))
                .expect("subscription kept running after the view left");
        }

        #[test]
        fn oversized_request_is_rejected() {
            let (mut view, mut server_side) = UnixStream::pair().unwrap();
            let writer = thread::spawn(move || {
                let payload = vec![b'a'; MAX_REQUEST_BYTES + 16];
                let _ = view.write_all(&payload);
            });

            let err = read_request(&mut server_side).unwrap_err();
            assert_eq!(err.code, "request_too_large");
            drop(server_side);
            writer.join().unwrap();
        }
    }
}
