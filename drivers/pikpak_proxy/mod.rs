//! PikPak中转驱动 / PikPak Proxy Driver
//!
//! 可经中转通道访问盘API / Drive API optionally reached through a relay channel.

pub mod types;
pub mod util;
pub mod client;
pub mod driver;
pub mod writer;

pub use driver::{
    PikPakProxyDriver,
    PikPakProxyConfig,
    PikPakProxyDriverFactory,
};
