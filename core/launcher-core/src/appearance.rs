//! OS dark/light preference, used to resolve the `system` theme.

use std::process::{Command, Stdio};

/// Source of the OS-reported appearance preference.
pub trait AppearanceProbe: Send {
    fn prefers_dark(&self) -> bool;
}

/// Asks the running OS. Anything that cannot be determined counts as light.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAppearance;

impl AppearanceProbe for SystemAppearance {
    fn prefers_dark(&self) -> bool {
        let Some(probe) = probe_for_current_os() else {
            return false;
        };
        let program = probe.program;

        let output = Command::new(program)
            .args(probe.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                (probe.interpret)(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::debug!(program, status = %output.status, "Appearance probe reported no preference");
                false
            }
            Err(err) => {
                tracing::debug!(program, error = %err, "Appearance probe unavailable");
                false
            }
        }
    }
}

/// A fixed answer, for hosts without a desktop and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAppearance(pub bool);

impl AppearanceProbe for FixedAppearance {
    fn prefers_dark(&self) -> bool {
        self.0
    }
}

struct Probe {
    program: &'static str,
    args: &'static [&'static str],
    interpret: fn(&str) -> bool,
}

static MACOS_PROBE: Probe = Probe {
    program: "defaults",
    args: &["read", "-g", "AppleInterfaceStyle"],
    interpret: macos_is_dark,
};

static GNOME_PROBE: Probe = Probe {
    program: "gsettings",
    args: &["get", "org.gnome.desktop.interface", "color-scheme"],
    interpret: gsettings_is_dark,
};

static WINDOWS_PROBE: Probe = Probe {
    program: "reg",
    args: &[
        "query",
        r"HKCU\Software\Microsoft\Windows\CurrentVersion\Themes\Personalize",
        "/v",
        "AppsUseLightTheme",
    ],
    interpret: registry_is_dark,
};

fn probe_for_current_os() -> Option<&'static Probe> {
    if cfg!(target_os = "macos") {
        Some(&MACOS_PROBE)
    } else if cfg!(target_os = "linux") {
        Some(&GNOME_PROBE)
    } else if cfg!(target_os = "windows") {
        Some(&WINDOWS_PROBE)
    } else {
        None
    }
}

// `defaults` exits non-zero in light mode, so only "Dark" reaches here.
fn macos_is_dark(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("dark")
}

fn gsettings_is_dark(output: &str) -> bool {
    output.trim().trim_matches('\'') == "prefer-dark"
}

fn registry_is_dark(output: &str) -> bool {
    output
        .lines()
        .find(|line| line.contains("AppsUseLightTheme"))
        .and_then(|line| line.split_whitespace().last())
        .is_some_and(|value| value == "0x0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macos_output() {
        assert!(macos_is_dark("Dark\n"));
        assert!(!macos_is_dark(""));
    }

    #[test]
    fn gsettings_output() {
        assert!(gsettings_is_dark("'prefer-dark'\n"));
        assert!(!gsettings_is_dark("'default'\n"));
        assert!(!gsettings_is_dark("'prefer-light'"));
    }

    #[test]
    fn registry_output() {
        let dark = "\r\nHKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize\r\n    AppsUseLightTheme    REG_DWORD    0x0\r\n";
        let light = dark.replace("0x0", "0x1");
        assert!(registry_is_dark(dark));
        assert!(!registry_is_dark(&light));
        assert!(!registry_is_dark("ERROR: The system was unable to find the specified registry key"));
    }

    #[test]
    fn fixed_appearance_answers_as_configured() {
        assert!(FixedAppearance(true).prefers_dark());
        assert!(!FixedAppearance(false).prefers_dark());
    }
}
