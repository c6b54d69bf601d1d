// 設定管理の具象実装

use crate::core::PoolConfig;

/// デフォルト設定実装
#[derive(Debug, Clone)]
pub struct DefaultPoolConfig {
    worker_count: usize,
    max_concurrent: usize,
    queue_capacity: usize,
    batch_size: usize,
    enable_progress: bool,
}

impl DefaultPoolConfig {
    pub fn new(cpu_count: usize) -> Self {
        let worker_count = cpu_count.max(1) * 2;
        Self {
            worker_count,
            max_concurrent: worker_count,
            queue_capacity: 100,
            batch_size: 50,
            enable_progress: true,
        }
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_progress_reporting(mut self, enable: bool) -> Self {
        self.enable_progress = enable;
        self
    }
}

impl Default for DefaultPoolConfig {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl PoolConfig for DefaultPoolConfig {
    fn worker_count(&self) -> usize {
        self.worker_count
    }

    fn max_concurrent_tasks(&self) -> usize {
        self.max_concurrent
    }

    fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn enable_progress_reporting(&self) -> bool {
        self.enable_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_config() {
        let config = DefaultPoolConfig::default();

        assert!(config.worker_count() > 0);
        assert_eq!(config.max_concurrent_tasks(), config.worker_count());
        assert_eq!(config.queue_capacity(), 100);
        assert_eq!(config.batch_size(), 50);
        assert!(config.enable_progress_reporting());
    }

    #[test]
    fn test_pool_config_builder() {
        let config = DefaultPoolConfig::new(4)
            .with_worker_count(8)
            .with_max_concurrent(16)
            .with_queue_capacity(200)
            .with_batch_size(100)
            .with_progress_reporting(false);

        assert_eq!(config.worker_count(), 8);
        assert_eq!(config.max_concurrent_tasks(), 16);
        assert_eq!(config.queue_capacity(), 200);
        assert_eq!(config.batch_size(), 100);
        assert!(!config.enable_progress_reporting());
    }

    #[test]
    fn test_new_scales_with_cpu_count() {
        let config = DefaultPoolConfig::new(4);

        assert_eq!(config.worker_count(), 8);
    }

    #[test]
    fn test_zero_cpu_count_still_yields_workers() {
        // cpu_count 0でもワーカー数は最低2になる
        let config = DefaultPoolConfig::new(0);

        assert_eq!(config.worker_count(), 2);
    }
}
