use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::error::{DriverError, Result};
use super::StorageDriver;

pub type DriverBox = Arc<Box<dyn StorageDriver>>;

/// 配置保存回调：每次凭据变更成功后立即调用，绝不攒批
/// Config save callback: invoked immediately after every successful
/// credential mutation, never batched.
pub type ConfigSaver = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// 驱动配置的持久化存储(外部协作者) / Durable driver-config storage (external collaborator)
pub trait ConfigStore: Send + Sync {
    fn save(&self, id: &str, config: Value) -> Result<()>;
}

/// 内存配置存储，用于测试与默认场景 / In-memory config store for tests and defaults
#[derive(Default)]
pub struct MemoryConfigStore {
    configs: std::sync::Mutex<HashMap<String, Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.configs.lock().unwrap().get(id).cloned()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn save(&self, id: &str, config: Value) -> Result<()> {
        self.configs.lock().unwrap().insert(id.to_string(), config);
        Ok(())
    }
}

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// 创建驱动实例；saver交给驱动在凭据轮换后回写配置
    /// Create a driver instance; the saver is handed to the driver for
    /// writing the config back after credential rotation.
    fn create_driver(&self, config: Value, saver: ConfigSaver) -> Result<Box<dyn StorageDriver>>;
}

/// Storage manager (manages all driver instances) / 存储管理器
#[derive(Clone)]
pub struct StorageManager {
    drivers: Arc<RwLock<HashMap<String, DriverBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<Box<dyn DriverFactory>>>>>,
    /// Driver error status (id -> error message) / 驱动错误状态
    driver_errors: Arc<RwLock<HashMap<String, String>>>,
    store: Arc<dyn ConfigStore>,
}

impl StorageManager {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            drivers: Arc::new(RwLock::new(HashMap::new())),
            factories: Arc::new(RwLock::new(HashMap::new())),
            driver_errors: Arc::new(RwLock::new(HashMap::new())),
            store,
        }
    }

    /// Register driver factory / 注册驱动工厂
    pub async fn register_factory(&self, factory: Box<dyn DriverFactory>) -> Result<()> {
        let driver_type = factory.driver_type().to_string();
        let mut factories = self.factories.write().await;
        factories.insert(driver_type.clone(), Arc::new(factory));

        tracing::info!("Driver factory registered: {}", driver_type);
        Ok(())
    }

    /// 创建并初始化驱动实例；初始化中的凭据错误是致命的，实例不会挂载
    /// Create and initialize a driver instance; a credential error during
    /// initialization is fatal and the instance is not mounted.
    pub async fn create_driver(&self, id: String, driver_type: &str, config: Value) -> Result<String> {
        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(driver_type)
                .cloned()
                .ok_or_else(|| DriverError::Config(format!("driver type not found: {}", driver_type)))?
        };

        let saver = self.saver_for(&id);
        let driver = match factory.create_driver(config, saver) {
            Ok(driver) => driver,
            Err(e) => {
                self.set_driver_error(&id, e.to_string()).await;
                tracing::error!("Driver creation failed: {} ({}) - {}", id, driver_type, e);
                return Err(e);
            }
        };

        if let Err(e) = driver.init().await {
            self.set_driver_error(&id, e.to_string()).await;
            tracing::error!("Driver initialization failed: {} ({}) - {}", id, driver_type, e);
            return Err(e);
        }

        let mut drivers = self.drivers.write().await;
        drivers.insert(id.clone(), Arc::new(driver));
        drop(drivers);

        self.clear_driver_error(&id).await;
        tracing::info!("Driver created and initialized: {} ({})", id, driver_type);
        Ok(id)
    }

    /// 绑定driver id的保存回调 / Save callback bound to one driver id
    fn saver_for(&self, id: &str) -> ConfigSaver {
        let store = self.store.clone();
        let id = id.to_string();
        Arc::new(move |config| store.save(&id, config))
    }

    /// Set driver error status / 设置驱动错误状态
    pub async fn set_driver_error(&self, id: &str, error: String) {
        let mut errors = self.driver_errors.write().await;
        errors.insert(id.to_string(), error);
    }

    /// Clear driver error status / 清除驱动错误状态
    pub async fn clear_driver_error(&self, id: &str) {
        let mut errors = self.driver_errors.write().await;
        errors.remove(id);
    }

    /// Get driver error status / 获取驱动错误状态
    pub async fn get_driver_error(&self, id: &str) -> Option<String> {
        let errors = self.driver_errors.read().await;
        errors.get(id).cloned()
    }

    /// Get driver instance / 获取驱动实例
    pub async fn get_driver(&self, id: &str) -> Option<DriverBox> {
        let drivers = self.drivers.read().await;
        drivers.get(id).cloned()
    }

    /// Remove driver instance / 移除驱动实例
    pub async fn remove_driver(&self, id: &str) -> Result<()> {
        let mut drivers = self.drivers.write().await;
        drivers
            .remove(id)
            .ok_or_else(|| DriverError::Config(format!("driver not found: {}", id)))?;

        tracing::info!("Driver removed: {}", id);
        Ok(())
    }

    /// List all driver ids / 列出所有驱动
    pub async fn list_drivers(&self) -> Vec<String> {
        let drivers = self.drivers.read().await;
        drivers.keys().cloned().collect()
    }

    /// List all available driver types / 列出所有可用的驱动类型
    pub async fn list_driver_types(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        factories.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Object, Result, UploadStream};
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeDriver {
        saver: ConfigSaver,
        fail_init: bool,
    }

    #[async_trait]
    impl StorageDriver for FakeDriver {
        fn name(&self) -> &str {
            "fake"
        }

        async fn init(&self) -> Result<()> {
            if self.fail_init {
                return Err(DriverError::Auth("refresh rejected".to_string()));
            }
            // credential rotated during init, persisted right away
            (self.saver)(json!({"token": "rotated"}))
        }

        fn root(&self) -> Object {
            Object::folder("/", "")
        }

        async fn list(&self, _dir: &Object) -> Result<Vec<Object>> {
            Ok(Vec::new())
        }

        async fn link(&self, _file: &Object) -> Result<String> {
            Ok(String::new())
        }

        async fn create_dir(&self, _parent: &Object, _name: &str) -> Result<()> {
            Ok(())
        }

        async fn rename(&self, _obj: &Object, _new_name: &str) -> Result<()> {
            Ok(())
        }

        async fn move_item(&self, _obj: &Object, _dst_dir: &Object) -> Result<()> {
            Ok(())
        }

        async fn copy_item(&self, _obj: &Object, _dst_dir: &Object) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _obj: &Object) -> Result<()> {
            Ok(())
        }

        async fn put(&self, _dst_dir: &Object, _stream: &mut UploadStream) -> Result<()> {
            Ok(())
        }
    }

    struct FakeFactory {
        fail_init: bool,
    }

    impl DriverFactory for FakeFactory {
        fn driver_type(&self) -> &'static str {
            "fake"
        }

        fn create_driver(&self, _config: Value, saver: ConfigSaver) -> Result<Box<dyn StorageDriver>> {
            Ok(Box::new(FakeDriver { saver, fail_init: self.fail_init }))
        }
    }

    #[tokio::test]
    async fn rotated_credential_is_written_through_the_store() {
        let store = Arc::new(MemoryConfigStore::new());
        let manager = StorageManager::new(store.clone());
        manager.register_factory(Box::new(FakeFactory { fail_init: false })).await.unwrap();

        manager
            .create_driver("mount1".to_string(), "fake", json!({}))
            .await
            .unwrap();

        assert_eq!(store.get("mount1"), Some(json!({"token": "rotated"})));
        assert!(manager.get_driver("mount1").await.is_some());
        assert!(manager.get_driver_error("mount1").await.is_none());
    }

    #[tokio::test]
    async fn init_failure_is_fatal_and_leaves_the_instance_unmounted() {
        let store = Arc::new(MemoryConfigStore::new());
        let manager = StorageManager::new(store.clone());
        manager.register_factory(Box::new(FakeFactory { fail_init: true })).await.unwrap();

        let result = manager.create_driver("mount1".to_string(), "fake", json!({})).await;

        assert!(matches!(result, Err(DriverError::Auth(_))));
        assert!(manager.get_driver("mount1").await.is_none());
        assert!(manager.get_driver_error("mount1").await.is_some());
        assert!(store.get("mount1").is_none());
    }

    #[tokio::test]
    async fn unknown_driver_type_is_a_config_error() {
        let manager = StorageManager::new(Arc::new(MemoryConfigStore::new()));
        let result = manager.create_driver("m".to_string(), "nope", json!({})).await;
        assert!(matches!(result, Err(DriverError::Config(_))));
    }
}
