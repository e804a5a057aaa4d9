pub const CACHE_COMPONENT_NAME: &str = "cache";

/// Cache generation embedded at build time; overridden by `PWA_CACHE_VERSION` or the
/// deployment config.
pub const DEFAULT_CACHE_VERSION: &str = "pwa-cache-v3";

/// Resources precached by `install` when the deployment supplies no manifest.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "./",
    "./index.html",
    "./app.js",
    "./manifest.json",
    "./fallback.css",
];
