use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::utils::density_grid::GridMetadata;

#[derive(Debug, Clone, Serialize)]
pub struct ChunkDescriptor {
    pub index: usize,
    /// 开始位置（包含），单位：浮点元素索引
    pub start: usize,
    /// 结束位置（不包含），单位：浮点元素索引
    pub end: usize,
}

/// 任务数据，存储分块的密度网格数据
/// 每个 chunk 在 HashMap 中独立存储，交付后单独释放
pub struct TaskData {
    /// 网格维度 [nx, ny, nz]
    pub shape: [usize; 3],
    /// 分块描述列表
    pub chunks: Vec<ChunkDescriptor>,
    /// 每个 chunk 的数据，key 是 chunk_index
    /// None 表示后台还在解析，Some(Vec) 表示已就绪
    /// chunk 被请求后整个条目被移除，以释放内存
    pub chunk_data: RwLock<HashMap<usize, Option<Vec<f64>>>>,
    /// cube 文件头部元数据（原点、轴向量、原子列表）
    /// 后台解析完成后填入
    pub metadata: RwLock<Option<GridMetadata>>,
    /// 任务创建时间，用于 TTL 过期检查
    pub created_at: Instant,
}

impl TaskData {
    /// 创建新的 TaskData（预处理阶段，chunk 尚未解析）
    pub fn new(shape: [usize; 3], chunks: Vec<ChunkDescriptor>) -> Self {
        let mut chunk_data = HashMap::new();
        for descriptor in &chunks {
            chunk_data.insert(descriptor.index, None);
        }

        Self {
            shape,
            chunks,
            chunk_data: RwLock::new(chunk_data),
            metadata: RwLock::new(None),
            created_at: Instant::now(),
        }
    }

    /// 设置指定 chunk 的数据（后台解析完成后调用）
    pub fn set_chunk(&self, chunk_index: usize, data: Vec<f64>) {
        self.chunk_data.write().insert(chunk_index, Some(data));
    }

    /// 填入 cube 头部元数据
    pub fn set_metadata(&self, metadata: GridMetadata) {
        *self.metadata.write() = Some(metadata);
    }

    /// 获取 cube 头部元数据的副本，尚未解析完成时返回 None
    pub fn get_metadata(&self) -> Option<GridMetadata> {
        self.metadata.read().clone()
    }

    /// 获取并移除指定 chunk 的数据（交付后立即释放内存）
    /// 返回 None 的情况:
    /// - chunk 不存在
    /// - chunk 还在解析中
    /// - chunk 已被请求过
    pub fn take_chunk(&self, chunk_index: usize) -> Option<Vec<f64>> {
        let mut chunk_data = self.chunk_data.write();
        if let Some(Some(data)) = chunk_data.remove(&chunk_index) {
            Some(data)
        } else {
            None
        }
    }

    /// 检查指定 chunk 是否已就绪
    pub fn is_chunk_ready(&self, chunk_index: usize) -> bool {
        self.chunk_data
            .read()
            .get(&chunk_index)
            .map(|opt| opt.is_some())
            .unwrap_or(false)
    }
}

pub struct TaskStore {
    tasks: RwLock<HashMap<String, Arc<TaskData>>>,
    /// TTL（Time-To-Live）默认过期时间：30 分钟
    default_ttl: Duration,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(30 * 60))
    }

    /// 创建带自定义 TTL 的 TaskStore
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            default_ttl: ttl,
        }
    }

    pub fn insert(&self, data: TaskData) -> String {
        let task_id = Uuid::new_v4().to_string();
        self.tasks.write().insert(task_id.clone(), Arc::new(data));
        task_id
    }

    pub fn get(&self, task_id: &str) -> Option<Arc<TaskData>> {
        self.tasks.read().get(task_id).cloned()
    }

    /// 清理过期的任务
    /// 返回清理的任务数量
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut tasks = self.tasks.write();
        let before_count = tasks.len();

        tasks.retain(|_, task| now.duration_since(task.created_at) < self.default_ttl);

        before_count - tasks.len()
    }

    /// 获取当前任务数量
    pub fn task_count(&self) -> usize {
        self.tasks.read().len()
    }

    /// 获取默认 TTL
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
