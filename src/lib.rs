// Library exports for Logtail

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logs;

pub use client::{EventPager, LogTailClient};
pub use error::{LogTailError, Result};
