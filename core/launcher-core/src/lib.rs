//! # launcher-core
//!
//! Core library for Lazy Project Launcher: starts per-project command
//! sequences, opens terminals, and owns the authoritative theme/locale state
//! that view surfaces mirror.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Threads and channels only.
//! - **Single owner**: Registry and UI state live on the runtime thread; other
//!   threads talk to it through [`RuntimeHandle`].
//! - **Graceful degradation**: Missing or corrupt config yields defaults.
//!   Persistence failures are logged, never surfaced.
//! - **Detached children**: Stopping a project forgets it; the process keeps
//!   running.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use launcher_core::{runtime, platform, ConfigStore, HeadlessChrome, Origin,
//!     RuntimeConfig, StateSyncBroker, SystemAppearance};
//!
//! let store = ConfigStore::from_user_dirs()?;
//! let launcher = platform::detect(&RuntimeConfig::default());
//! let broker = StateSyncBroker::load(store, Box::new(SystemAppearance), Box::new(HeadlessChrome));
//! let (handle, _thread) = runtime::spawn(launcher, broker)?;
//! let response = handle.dispatch(Origin::View, request);
//! ```

pub mod appearance;
pub mod broker;
pub mod chrome;
pub mod config;
pub mod controller;
pub mod error;
pub mod platform;
pub mod process_info;
pub mod registry;
pub mod runtime;
pub mod storage;

pub use appearance::{AppearanceProbe, FixedAppearance, SystemAppearance};
pub use broker::{StateSyncBroker, SubscriberId};
pub use chrome::{
    build_menu_model, resolve_chrome, ChromeAppearance, HeadlessChrome, MenuModel, WindowChrome,
};
pub use config::{load_runtime_config, RuntimeConfig};
pub use controller::{Controller, Origin, APP_NAME};
pub use error::{LauncherError, Result};
pub use platform::{Platform, PlatformLauncher, ProcessEvent};
pub use process_info::is_process_alive;
pub use registry::{ProcessRegistry, SessionEvent, SessionSummary};
pub use runtime::{Runtime, RuntimeHandle, Subscription};
pub use storage::{ConfigKey, ConfigStore};

pub use lazy_launcher_protocol as protocol;
