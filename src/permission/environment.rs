//! Classification of the host the page runs in (browser tab, installed PWA or Trusted
//! Web Activity) and the gesture rule derived from it.

use std::fmt;

use async_trait::async_trait;

const TWA_REFERRER_PREFIX: &str = "android-app://";

/// CSS `display-mode` the page was launched with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Browser,
    Standalone,
    Fullscreen,
    MinimalUi,
    WindowControlsOverlay,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Browser => "browser",
            DisplayMode::Standalone => "standalone",
            DisplayMode::Fullscreen => "fullscreen",
            DisplayMode::MinimalUi => "minimal-ui",
            DisplayMode::WindowControlsOverlay => "window-controls-overlay",
        }
    }

    pub fn is_installed(&self) -> bool {
        !matches!(self, DisplayMode::Browser)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Android,
    AndroidTwa,
    Ios,
    Windows,
    MacOs,
    Linux,
    Unknown,
}

impl Platform {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.contains("android") {
            Platform::Android
        } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
            Platform::Ios
        } else if ua.contains("windows") {
            Platform::Windows
        } else if ua.contains("mac") {
            Platform::MacOs
        } else if ua.contains("linux") {
            Platform::Linux
        } else {
            Platform::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::AndroidTwa => "android-twa",
            Platform::Ios => "ios",
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Unknown => "unknown",
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Android | Platform::AndroidTwa | Platform::Ios)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw observations about the host, gathered synchronously by the binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    pub display_mode: DisplayMode,
    /// iOS home-screen launch marker (`navigator.standalone`).
    pub navigator_standalone: bool,
    pub referrer: Option<String>,
    /// Whether the browser exposes its own chrome object; Trusted Web Activities
    /// launched from an app store typically do not.
    pub has_browser_chrome_marker: bool,
    pub user_agent: String,
}

#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    fn signals(&self) -> EnvironmentSignals;

    /// Number of native apps related to this origin that are installed. Hosts without
    /// the query report `0`.
    async fn installed_related_apps(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub installed: bool,
    pub pwa: bool,
    /// Confirmed Trusted Web Activity (referrer or related-app match).
    pub twa: bool,
    /// Standalone without the browser chrome marker. Unreliable on its own.
    pub possible_twa: bool,
    pub platform: Platform,
    pub display_mode: DisplayMode,
}

impl ExecutionContext {
    pub fn is_browser(&self) -> bool {
        !self.installed
    }

    pub fn description(&self) -> String {
        if self.twa || self.possible_twa {
            "Installed app (Trusted Web Activity)".to_string()
        } else if self.pwa && self.platform == Platform::Ios {
            "Installed PWA (iOS)".to_string()
        } else if self.pwa {
            format!("Installed PWA ({})", self.display_mode.as_str())
        } else {
            format!("Web browser ({})", self.platform)
        }
    }

    /// Class names the page applies to its root element.
    pub fn css_classes(&self) -> Vec<String> {
        let mut classes = Vec::new();
        if self.installed {
            classes.push("pwa-installed".to_string());
        }
        if self.twa || self.possible_twa {
            classes.push("pwa-twa".to_string());
        }
        if self.is_browser() {
            classes.push("pwa-browser".to_string());
        }
        classes.push(format!("pwa-platform-{}", self.platform));
        classes.push(format!("pwa-display-{}", self.display_mode.as_str()));
        classes
    }
}

pub fn detect_context(signals: &EnvironmentSignals, related_apps: usize) -> ExecutionContext {
    let mut display_mode = signals.display_mode;
    let mut platform = None;

    if signals.navigator_standalone {
        display_mode = DisplayMode::Standalone;
        platform = Some(Platform::Ios);
    }

    let twa_referrer = signals
        .referrer
        .as_deref()
        .is_some_and(|referrer| referrer.contains(TWA_REFERRER_PREFIX));
    if twa_referrer {
        display_mode = DisplayMode::Standalone;
    }

    let twa = twa_referrer || related_apps > 0;
    let possible_twa =
        !twa && display_mode == DisplayMode::Standalone && !signals.has_browser_chrome_marker;
    if twa || possible_twa {
        platform = Some(Platform::AndroidTwa);
    }

    let installed = display_mode.is_installed() || twa;
    ExecutionContext {
        installed,
        pwa: installed,
        twa,
        possible_twa,
        platform: platform.unwrap_or_else(|| Platform::from_user_agent(&signals.user_agent)),
        display_mode,
    }
}

/// Whether notification prompts must wait for an explicit user gesture.
///
/// Installed apps on mobile platforms, Trusted Web Activities (confirmed or suspected)
/// and origins with related native apps only show the prompt from a gesture handler.
pub fn requires_gesture(signals: &EnvironmentSignals, related_apps: usize) -> bool {
    let context = detect_context(signals, related_apps);
    (context.installed && context.platform.is_mobile())
        || context.twa
        || context.possible_twa
}

/// Short browser name reported with push registrations.
pub fn browser_name(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg/") || user_agent.contains("Edge") {
        "Edge"
    } else if user_agent.contains("OPR/") || user_agent.contains("Opera") {
        "Opera"
    } else if user_agent.contains("SamsungBrowser") {
        "Samsung Internet"
    } else if user_agent.contains("Firefox") || user_agent.contains("FxiOS") {
        "Firefox"
    } else if user_agent.contains("Chrome") || user_agent.contains("CriOS") {
        "Chrome"
    } else if user_agent.contains("Safari") {
        "Safari"
    } else {
        "Unknown"
    }
}
