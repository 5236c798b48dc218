//! View-side client for the launcher socket, used by `send` and `watch`.

#[cfg(unix)]
pub use unix::{send, watch};

#[cfg(not(unix))]
pub fn send(
    _socket: &std::path::Path,
    _request: &lazy_launcher_protocol::Request,
) -> Result<lazy_launcher_protocol::Response, String> {
    Err(unsupported())
}

#[cfg(not(unix))]
pub fn watch(
    _socket: &std::path::Path,
    _on_event: impl FnMut(&lazy_launcher_protocol::Broadcast),
) -> Result<lazy_launcher_protocol::Response, String> {
    Err(unsupported())
}

#[cfg(not(unix))]
fn unsupported() -> String {
    launcher_core::LauncherError::PlatformUnsupported(std::env::consts::OS.to_string()).into()
}

#[cfg(unix)]
mod unix {
    use lazy_launcher_protocol::{Broadcast, CommandName, Request, Response};
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixStream;
    use std::path::Path;
    use std::time::Duration;

    const READ_TIMEOUT_MS: u64 = 5000;
    const WRITE_TIMEOUT_MS: u64 = 600;

    /// Sends one request and waits for its response.
    pub fn send(socket: &Path, request: &Request) -> Result<Response, String> {
        let stream = connect(socket)?;
        stream
            .set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)))
            .map_err(|err| format!("Failed to set read timeout: {}", err))?;
        let mut reader = write_request(stream, request)?;
        read_line::<Response>(&mut reader)?
            .ok_or_else(|| "Launcher closed the connection without a response".to_string())
    }

    /// Subscribes and calls `on_event` for every broadcast until the
    /// launcher closes the stream. Returns the initial-state response.
    pub fn watch(socket: &Path, mut on_event: impl FnMut(&Broadcast)) -> Result<Response, String> {
        let request = Request::new(CommandName::Subscribe, None);
        let mut reader = write_request(connect(socket)?, &request)?;

        let initial = read_line::<Response>(&mut reader)?
            .ok_or_else(|| "Launcher closed the connection without a response".to_string())?;
        if !initial.success {
            return Ok(initial);
        }

        while let Some(event) = read_line::<Broadcast>(&mut reader)? {
            on_event(&event);
        }
        Ok(initial)
    }

    fn connect(socket: &Path) -> Result<UnixStream, String> {
        UnixStream::connect(socket)
            .map_err(|err| format!("Failed to connect to {}: {}", socket.display(), err))
    }

    fn write_request(mut stream: UnixStream, request: &Request) -> Result<BufReader<UnixStream>, String> {
        stream
            .set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)))
            .map_err(|err| format!("Failed to set write timeout: {}", err))?;
        let mut line = serde_json::to_vec(request)
            .map_err(|err| format!("Failed to serialize request: {}", err))?;
        line.push(b'\n');
        stream
            .write_all(&line)
            .and_then(|_| stream.flush())
            .map_err(|err| format!("Failed to write request: {}", err))?;
        Ok(BufReader::new(stream))
    }

    fn read_line<T: serde::de::DeserializeOwned>(
        reader: &mut BufReader<UnixStream>,
    ) -> Result<Option<T>, String> {
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .map_err(|err| format!("Failed to read from launcher: {}", err))?;
        if n == 0 {
            return Ok(None);
        }
        serde_json::from_str(line.trim_end())
            .map(Some)
            .map_err(|err| format!("Launcher sent invalid JSON: {}", err))
    }
}
