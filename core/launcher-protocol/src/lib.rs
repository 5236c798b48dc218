//! Command and broadcast types for the project launcher.
//!
//! This crate is shared by the privileged launcher process and its view
//! surfaces so both sides agree on the wire format. The launcher remains the
//! authority on validation; views reuse the types to build requests and to
//! decode broadcasts.
//!
//! Requests and responses are single JSON lines:
//!
//! ```json
//! {"command":"start-project","id":"7","payload":{"path":"/tmp/demo","commands":"npm run dev","projectId":"p1"}}
//! {"success":true,"id":"7","processId":4242}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB

// ═══════════════════════════════════════════════════════════════════════════════
// Authoritative UI State Values
// ═══════════════════════════════════════════════════════════════════════════════

/// Visual theme selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::System, Theme::Light, Theme::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Menu label for the theme radio group.
    pub fn label(self) -> &'static str {
        match self {
            Theme::System => "System Default",
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = UnsupportedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == value)
            .ok_or_else(|| UnsupportedValue::new("theme", value))
    }
}

/// Display locale. The first entry of [`Locale::SUPPORTED`] is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "zh-cn")]
    ZhCn,
    #[serde(rename = "zh-tw")]
    ZhTw,
}

impl Locale {
    pub const SUPPORTED: [Locale; 3] = [Locale::En, Locale::ZhCn, Locale::ZhTw];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::ZhCn => "zh-cn",
            Locale::ZhTw => "zh-tw",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::ZhCn => "简体中文",
            Locale::ZhTw => "繁體中文",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = UnsupportedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Locale::SUPPORTED
            .into_iter()
            .find(|locale| locale.as_str() == value)
            .ok_or_else(|| UnsupportedValue::new("locale", value))
    }
}

/// A theme or locale string outside the enumerated set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedValue {
    pub axis: &'static str,
    pub value: String,
}

impl UnsupportedValue {
    fn new(axis: &'static str, value: &str) -> Self {
        Self {
            axis,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnsupportedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {} value: {:?}", self.axis, self.value)
    }
}

impl std::error::Error for UnsupportedValue {}

/// Snapshot of the authoritative theme/locale pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiState {
    pub theme: Theme,
    pub locale: Locale,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    OpenTerminal,
    StartProject,
    StopProject,
    ProjectStatus,
    ListSessions,
    GetUiState,
    AppInfo,
    Subscribe,
    SetTheme,
    SetLocale,
}

impl CommandName {
    pub const ALL: [CommandName; 10] = [
        CommandName::OpenTerminal,
        CommandName::StartProject,
        CommandName::StopProject,
        CommandName::ProjectStatus,
        CommandName::ListSessions,
        CommandName::GetUiState,
        CommandName::AppInfo,
        CommandName::Subscribe,
        CommandName::SetTheme,
        CommandName::SetLocale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::OpenTerminal => "open-terminal",
            CommandName::StartProject => "start-project",
            CommandName::StopProject => "stop-project",
            CommandName::ProjectStatus => "project-status",
            CommandName::ListSessions => "list-sessions",
            CommandName::GetUiState => "get-ui-state",
            CommandName::AppInfo => "app-info",
            CommandName::Subscribe => "subscribe",
            CommandName::SetTheme => "set-theme",
            CommandName::SetLocale => "set-locale",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.as_str() == name)
    }

    /// Commands only the privileged side may issue.
    pub fn is_privileged(self) -> bool {
        matches!(self, CommandName::SetTheme | CommandName::SetLocale)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Request {
    pub fn new(command: CommandName, payload: Option<Value>) -> Self {
        Self {
            command: command.as_str().to_string(),
            id: None,
            payload,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenTerminalParams {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartProjectParams {
    pub path: String,
    pub commands: String,
    #[serde(rename = "projectId")]
    pub project_id: String,
}

/// Payload shared by `stop-project` and `project-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIdParams {
    #[serde(rename = "projectId")]
    pub project_id: String,
}

/// Theme requests carry the raw string so that unsupported values reach the
/// broker (which logs and drops them) instead of failing payload parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetThemeParams {
    pub theme: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLocaleParams {
    pub locale: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Decodes a command payload. A missing payload is treated as `{}` so that
/// commands whose fields are all optional accept an empty request.
pub fn parse_payload<T: DeserializeOwned>(
    command: CommandName,
    payload: Option<Value>,
) -> Result<T, ErrorInfo> {
    let value = payload.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|err| {
        ErrorInfo::new(
            "invalid_payload",
            format!("{} payload is invalid: {}", command, err),
        )
    })
}

pub fn parse_start_project(payload: Option<Value>) -> Result<StartProjectParams, ErrorInfo> {
    let params: StartProjectParams = parse_payload(CommandName::StartProject, payload)?;
    require_string(&params.project_id, "projectId")?;
    require_string(&params.path, "path")?;
    Ok(params)
}

pub fn parse_project_id(
    command: CommandName,
    payload: Option<Value>,
) -> Result<ProjectIdParams, ErrorInfo> {
    let params: ProjectIdParams = parse_payload(command, payload)?;
    require_string(&params.project_id, "projectId")?;
    Ok(params)
}

fn require_string(value: &str, field: &str) -> Result<(), ErrorInfo> {
    if value.trim().is_empty() {
        return Err(ErrorInfo::new(
            "missing_field",
            format!("{} is required", field),
        ));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════════════════════════

/// Uniform `{success, error?}` result returned for every command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn ok(id: Option<String>) -> Self {
        Self {
            success: true,
            id,
            ..Self::default()
        }
    }

    pub fn failure(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            id,
            error: Some(code.to_string()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Broadcasts (privileged → view, fire-and-forget)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Broadcast {
    ThemeChanged { theme: Theme },
    LocaleChanged { locale: Locale },
}

impl Broadcast {
    pub fn name(&self) -> &'static str {
        match self {
            Broadcast::ThemeChanged { .. } => "theme-changed",
            Broadcast::LocaleChanged { .. } => "locale-changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn theme_parses_only_enumerated_values() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!("system".parse::<Theme>(), Ok(Theme::System));
        let err = "sepia".parse::<Theme>().unwrap_err();
        assert_eq!(err.axis, "theme");
        assert_eq!(err.value, "sepia");
    }

    #[test]
    fn locale_default_is_first_supported() {
        assert_eq!(Locale::default(), Locale::SUPPORTED[0]);
        assert_eq!("zh-tw".parse::<Locale>(), Ok(Locale::ZhTw));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn locale_serializes_as_code() {
        let value = serde_json::to_value(UiState {
            theme: Theme::Light,
            locale: Locale::ZhCn,
        })
        .unwrap();
        assert_eq!(value, json!({"theme": "light", "locale": "zh-cn"}));
    }

    #[test]
    fn command_names_round_trip_through_parse() {
        for command in CommandName::ALL {
            assert_eq!(CommandName::parse(command.as_str()), Some(command));
        }
        assert_eq!(CommandName::parse("import-project"), None);
    }

    #[test]
    fn only_state_setters_are_privileged() {
        let privileged: Vec<_> = CommandName::ALL
            .into_iter()
            .filter(|command| command.is_privileged())
            .collect();
        assert_eq!(privileged, vec![CommandName::SetTheme, CommandName::SetLocale]);
    }

    #[test]
    fn start_project_requires_project_id() {
        let err = parse_start_project(Some(json!({
            "path": "/tmp/demo",
            "commands": "npm run dev",
            "projectId": "  "
        })))
        .unwrap_err();
        assert_eq!(err.code, "missing_field");
    }

    #[test]
    fn start_project_keeps_empty_command_sequence() {
        let params = parse_start_project(Some(json!({
            "path": "/tmp/demo",
            "commands": "",
            "projectId": "p1"
        })))
        .unwrap();
        assert_eq!(params.commands, "");
        assert_eq!(params.project_id, "p1");
    }

    #[test]
    fn open_terminal_accepts_missing_payload() {
        let params: OpenTerminalParams = parse_payload(CommandName::OpenTerminal, None).unwrap();
        assert!(params.path.is_none());
    }

    #[test]
    fn stop_project_rejects_wrong_shape() {
        let err = parse_project_id(CommandName::StopProject, Some(json!({"id": 3}))).unwrap_err();
        assert_eq!(err.code, "invalid_payload");
        assert!(err.message.contains("stop-project"));
    }

    #[test]
    fn response_omits_empty_fields() {
        let value = serde_json::to_value(Response::ok(None).with_process_id(42)).unwrap();
        assert_eq!(value, json!({"success": true, "processId": 42}));

        let value = serde_json::to_value(Response::failure(
            Some("1".to_string()),
            "PlatformUnsupported",
            "no launcher for this OS",
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "id": "1",
                "error": "PlatformUnsupported",
                "message": "no launcher for this OS"
            })
        );
    }

    #[test]
    fn broadcast_wire_shape() {
        let value = serde_json::to_value(Broadcast::ThemeChanged { theme: Theme::Dark }).unwrap();
        assert_eq!(
            value,
            json!({"event": "theme-changed", "payload": {"theme": "dark"}})
        );

        let decoded: Broadcast = serde_json::from_value(
            json!({"event": "locale-changed", "payload": {"locale": "zh-tw"}}),
        )
        .unwrap();
        assert_eq!(decoded, Broadcast::LocaleChanged { locale: Locale::ZhTw });
        assert_eq!(decoded.name(), "locale-changed");
    }

    #[test]
    fn request_rejects_unknown_fields() {
        let result = serde_json::from_value::<Request>(json!({
            "command": "app-info",
            "method": "x"
        }));
        assert!(result.is_err());
    }
}
