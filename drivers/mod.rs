// Driver package / 驱动包
pub mod homecloud;
pub mod pikpak_proxy;

use crate::storage::{DriverError, StorageManager};

/// Register all drivers to StorageManager / 注册所有驱动
pub async fn register_all(manager: &StorageManager) -> Result<(), DriverError> {
    // Register HomeCloud driver (personal_new/personal/family) / 注册家庭云驱动
    manager.register_factory(Box::new(homecloud::HomeCloudDriverFactory)).await?;
    // Register PikPak proxy driver / 注册PikPak中转驱动
    manager.register_factory(Box::new(pikpak_proxy::PikPakProxyDriverFactory)).await?;
    Ok(())
}
