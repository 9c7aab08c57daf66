//! 家庭云驱动 / HomeCloud Driver
//!
//! 支持模式 / Supported modes:
//! - personal_new: 个人云(新版API)
//! - personal: 个人云(旧版API)
//! - family: 家庭云

pub mod types;
pub mod util;
pub mod client;
pub mod driver;

pub use driver::{
    HomeCloudDriver,
    HomeCloudConfig,
    HomeCloudDriverFactory,
};
