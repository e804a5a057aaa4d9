use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::page::logger::LOGGER;
use crate::platform::clock::SharedClock;
use crate::platform::runtime::spawn_detached;

/// How long a server-error banner stays up unless dismissed first.
pub const SERVER_ERROR_BANNER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BannerKind {
    Offline,
    ServerError,
}

impl BannerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerKind::Offline => "offline",
            BannerKind::ServerError => "server-error",
        }
    }

    /// Auto-dismiss delay for transient kinds.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            BannerKind::Offline => None,
            BannerKind::ServerError => Some(SERVER_ERROR_BANNER_TIMEOUT),
        }
    }

    fn default_title(&self) -> &'static str {
        match self {
            BannerKind::Offline => "Offline",
            BannerKind::ServerError => "Server error",
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            BannerKind::Offline => "No internet connection",
            BannerKind::ServerError => "The server is unavailable",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub title: String,
    pub message: String,
    pub status: Option<u16>,
}

impl Banner {
    pub fn new(kind: BannerKind, message: Option<String>, status: Option<u16>) -> Self {
        Self {
            kind,
            title: kind.default_title().to_string(),
            message: message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| kind.default_message().to_string()),
            status,
        }
    }

    /// Text as rendered, with the HTTP status appended when known.
    pub fn text(&self) -> String {
        match self.status {
            Some(status) => format!("{}: {} ({status})", self.title, self.message),
            None => format!("{}: {}", self.title, self.message),
        }
    }
}

struct ShownBanner {
    banner: Banner,
    generation: u64,
}

#[derive(Default)]
struct BannerState {
    shown: BTreeMap<BannerKind, ShownBanner>,
    next_generation: u64,
}

/// Keeps at most one banner per kind on a page.
#[derive(Clone)]
pub struct BannerManager {
    state: Arc<Mutex<BannerState>>,
    clock: SharedClock,
}

impl BannerManager {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(BannerState::default())),
            clock,
        }
    }

    /// Shows `banner` unless one of the same kind is already displayed.
    ///
    /// Returns `false` for the no-op case. Transient kinds schedule their own removal.
    pub fn show(&self, banner: Banner) -> bool {
        let kind = banner.kind;
        let generation = {
            let mut state = self.state.lock().unwrap();
            if state.shown.contains_key(&kind) {
                return false;
            }
            let generation = state.next_generation;
            state.next_generation += 1;
            LOGGER.info(format!("Showing {} banner: {}", kind.as_str(), banner.text()));
            state.shown.insert(kind, ShownBanner { banner, generation });
            generation
        };

        if let Some(timeout) = kind.timeout() {
            let timer = self.clock.sleep(timeout);
            let state = Arc::clone(&self.state);
            spawn_detached(async move {
                timer.await;
                let mut state = state.lock().unwrap();
                if matches!(state.shown.get(&kind), Some(shown) if shown.generation == generation) {
                    state.shown.remove(&kind);
                    log::debug!("{} banner expired", kind.as_str());
                }
            });
        }
        true
    }

    pub fn dismiss(&self, kind: BannerKind) -> bool {
        self.state.lock().unwrap().shown.remove(&kind).is_some()
    }

    pub fn is_shown(&self, kind: BannerKind) -> bool {
        self.state.lock().unwrap().shown.contains_key(&kind)
    }

    pub fn get(&self, kind: BannerKind) -> Option<Banner> {
        self.state
            .lock()
            .unwrap()
            .shown
            .get(&kind)
            .map(|shown| shown.banner.clone())
    }

    pub fn active(&self) -> Vec<Banner> {
        self.state
            .lock()
            .unwrap()
            .shown
            .values()
            .map(|shown| shown.banner.clone())
            .collect()
    }
}
