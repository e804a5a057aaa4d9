//! Page-side reactions to worker envelopes: banners, page events, navigation and
//! worker liveness.
mod agent;
mod banner;
mod logger;

pub use agent::{PageAgent, PageEvent, PageLocation};
pub use banner::{Banner, BannerKind, BannerManager, SERVER_ERROR_BANNER_TIMEOUT};
