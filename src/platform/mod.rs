//! Runtime plumbing shared by every component: detached task spawning, timers and
//! configuration discovery.

pub mod clock;
pub mod environment;
pub mod runtime;
pub mod token;
