#![forbid(unsafe_code)]

pub mod assemble;
pub mod build;
pub mod chapter_store;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod prefetch;
pub mod toc;
