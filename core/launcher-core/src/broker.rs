//! Authoritative theme/locale state and its propagation to views.
//!
//! The broker is the only writer of [`UiState`]. Every accepted change runs
//! the same steps in order:
//!
//! 1. validate against the enumerated values (invalid input is logged and
//!    dropped, state untouched)
//! 2. assign in memory
//! 3. persist through [`ConfigStore`]
//! 4. apply window-chrome side effects synchronously
//! 5. broadcast to every subscribed view
//!
//! Broadcasts are best-effort. A view that is not subscribed at the time of
//! the change never sees it and has to re-read state on its next startup.

use lazy_launcher_protocol::{Broadcast, Locale, Theme, UiState, UnsupportedValue};
use serde_json::json;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::appearance::AppearanceProbe;
use crate::chrome::{build_menu_model, resolve_chrome, ChromeAppearance, WindowChrome};
use crate::error::LauncherError;
use crate::storage::{ConfigKey, ConfigStore};

/// Identifies a registered view so it can be removed when it disconnects.
pub type SubscriberId = u64;

pub struct StateSyncBroker {
    state: UiState,
    appearance: ChromeAppearance,
    store: ConfigStore,
    probe: Box<dyn AppearanceProbe>,
    chrome: Box<dyn WindowChrome>,
    subscribers: Vec<(SubscriberId, Sender<Broadcast>)>,
    next_subscriber: SubscriberId,
}

impl StateSyncBroker {
    /// Loads persisted state (defaults for anything missing or invalid) and
    /// applies the initial chrome.
    pub fn load(
        store: ConfigStore,
        probe: Box<dyn AppearanceProbe>,
        chrome: Box<dyn WindowChrome>,
    ) -> Self {
        let state = UiState {
            theme: load_value::<Theme>(&store, ConfigKey::Theme),
            locale: load_value::<Locale>(&store, ConfigKey::Locale),
        };
        let appearance = resolve_chrome(state.theme, probe.as_ref());

        let mut broker = Self {
            state,
            appearance,
            store,
            probe,
            chrome,
            subscribers: Vec::new(),
            next_subscriber: 0,
        };
        broker.chrome.apply_appearance(&broker.appearance);
        broker.chrome.apply_menu(&build_menu_model(&broker.state));

        tracing::info!(
            theme = %broker.state.theme,
            locale = %broker.state.locale,
            "UI state loaded"
        );
        broker
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn appearance(&self) -> ChromeAppearance {
        self.appearance
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Registers a new view; it receives every broadcast from now on.
    pub fn subscribe(&mut self) -> Receiver<Broadcast> {
        let (tx, rx) = mpsc::channel();
        self.add_subscriber(tx);
        rx
    }

    pub fn add_subscriber(&mut self, subscriber: Sender<Broadcast>) -> SubscriberId {
        self.next_subscriber += 1;
        self.subscribers.push((self.next_subscriber, subscriber));
        self.next_subscriber
    }

    /// Drops a view that hung up. Returns false if it was already pruned.
    pub fn remove_subscriber(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscriber, _)| *subscriber != id);
        self.subscribers.len() < before
    }

    /// Applies a theme change. Returns false when `value` was rejected.
    pub fn set_theme(&mut self, value: &str) -> bool {
        let theme = match Theme::from_str(value) {
            Ok(theme) => theme,
            Err(err) => {
                reject(err);
                return false;
            }
        };

        self.state.theme = theme;
        self.store
            .write(ConfigKey::Theme, &json!({ "theme": theme.as_str() }));

        self.appearance = resolve_chrome(theme, self.probe.as_ref());
        self.chrome.apply_appearance(&self.appearance);
        self.chrome.apply_menu(&build_menu_model(&self.state));

        tracing::info!(theme = %theme, background = self.appearance.background, "Theme changed");
        self.broadcast(Broadcast::ThemeChanged { theme });
        true
    }

    /// Applies a locale change. Returns false when `value` was rejected.
    pub fn set_locale(&mut self, value: &str) -> bool {
        let locale = match Locale::from_str(value) {
            Ok(locale) => locale,
            Err(err) => {
                reject(err);
                return false;
            }
        };

        self.state.locale = locale;
        self.store
            .write(ConfigKey::Locale, &json!({ "locale": locale.as_str() }));
        self.chrome.apply_menu(&build_menu_model(&self.state));

        tracing::info!(locale = %locale, "Locale changed");
        self.broadcast(Broadcast::LocaleChanged { locale });
        true
    }

    fn broadcast(&mut self, event: Broadcast) {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|(_, subscriber)| subscriber.send(event).is_ok());

        tracing::debug!(
            event = event.name(),
            delivered = self.subscribers.len(),
            dropped = before - self.subscribers.len(),
            "Broadcast sent"
        );
    }
}

fn reject(err: UnsupportedValue) {
    let err = LauncherError::from(err);
    tracing::warn!(error = %err, code = err.code(), "Ignoring state change");
}

fn load_value<T>(store: &ConfigStore, key: ConfigKey) -> T
where
    T: FromStr<Err = UnsupportedValue> + Default,
{
    let document = store.read(key);
    let Some(raw) = document.get(key.as_str()).and_then(|value| value.as_str()) else {
        tracing::warn!(key = key.as_str(), "Persisted document has no usable value; using default");
        return T::default();
    };

    raw.parse().unwrap_or_else(|err: UnsupportedValue| {
        tracing::warn!(key = key.as_str(), error = %err, "Persisted value unsupported; using default");
        T::default()
    })
}
