#![cfg(unix)]

use lazy_launcher_protocol::{Broadcast, CommandName, Request, Response, Theme};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct LauncherGuard {
    child: Child,
}

impl Drop for LauncherGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_launcher(home: &Path, socket: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_lazy-launcher"))
        .arg("serve")
        .arg("--socket")
        .arg(socket)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn lazy-launcher")
}

fn config_root(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join("lazy-project-launcher")
    } else {
        home.join(".config").join("lazy-project-launcher")
    }
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        sleep(Duration::from_millis(25));
    }
    panic!("Timed out waiting for launcher socket at {}", path.display());
}

fn write_request(stream: &mut UnixStream, request: &Request) {
    serde_json::to_writer(&mut *stream, request).expect("Failed to serialize request");
    stream.write_all(b"\n").expect("Failed to write request");
    stream.flush().ok();
}

fn read_json<T: serde::de::DeserializeOwned>(reader: &mut BufReader<UnixStream>) -> T {
    let mut line = String::new();
    reader.read_line(&mut line).expect("Failed to read line");
    serde_json::from_str(&line).expect("Failed to parse JSON line")
}

fn send_request(socket: &Path, request: Request) -> Response {
    let mut stream = UnixStream::connect(socket).expect("Failed to connect to launcher socket");
    write_request(&mut stream, &request);
    read_json(&mut BufReader::new(stream))
}

fn console(stdin: &mut ChildStdin, line: &str) {
    writeln!(stdin, "{line}").expect("Failed to write console line");
    stdin.flush().ok();
}

#[test]
fn launcher_ipc_smoke() {
    let home = TempDir::new().expect("Failed to create temp HOME");
    let socket = home.path().join("l.sock");
    let mut child = spawn_launcher(home.path(), &socket);
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut guard = LauncherGuard { child };

    wait_for_socket(&socket, Duration::from_secs(5));

    let info = send_request(
        &socket,
        Request::new(CommandName::AppInfo, None).with_id("info"),
    );
    assert!(info.success, "app-info failed: {:?}", info.message);
    assert_eq!(info.id.as_deref(), Some("info"));
    let name = info
        .data
        .as_ref()
        .and_then(|data| data.get("name"))
        .and_then(|value| value.as_str())
        .unwrap_or("missing");
    assert_eq!(name, "Lazy Project Launcher");

    let stop = send_request(
        &socket,
        Request::new(
            CommandName::StopProject,
            Some(json!({ "projectId": "missing" })),
        ),
    );
    assert!(stop.success);
    assert_eq!(stop.message.as_deref(), Some("not running"));

    let project_dir = home.path().join("demo");
    std::fs::create_dir_all(&project_dir).expect("create project dir");
    let start = send_request(
        &socket,
        Request::new(
            CommandName::StartProject,
            Some(json!({
                "path": project_dir.display().to_string(),
                "commands": "echo ready",
                "projectId": "p1",
            })),
        ),
    );
    assert!(start.success, "start-project failed: {:?}", start.message);
    assert!(start.process_id.is_some());

    let view_theme = send_request(
        &socket,
        Request::new(CommandName::SetTheme, Some(json!({ "theme": "dark" }))),
    );
    assert!(!view_theme.success);
    assert_eq!(view_theme.error.as_deref(), Some("UnknownCommand"));

    let mut subscription =
        UnixStream::connect(&socket).expect("Failed to connect subscription");
    write_request(
        &mut subscription,
        &Request::new(CommandName::Subscribe, None),
    );
    let mut reader = BufReader::new(subscription);
    let initial: Response = read_json(&mut reader);
    assert!(initial.success);
    assert_eq!(initial.data, Some(json!({ "theme": "system", "locale": "en" })));

    console(&mut stdin, "theme dark");
    let event: Broadcast = read_json(&mut reader);
    assert_eq!(event, Broadcast::ThemeChanged { theme: Theme::Dark });

    let persisted = std::fs::read_to_string(config_root(home.path()).join("theme.json"))
        .expect("theme.json written");
    let persisted: serde_json::Value = serde_json::from_str(&persisted).expect("theme.json parses");
    assert_eq!(persisted, json!({ "theme": "dark" }));

    console(&mut stdin, "quit");
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(status) = guard.child.try_wait().expect("try_wait") {
            assert!(status.success());
            break;
        }
        assert!(Instant::now() < deadline, "launcher did not exit on quit");
        sleep(Duration::from_millis(25));
    }
    assert!(!socket.exists());
}
