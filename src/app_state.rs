use std::sync::Arc;

use crate::performance::PerformanceStore;
use crate::task::TaskStore;
use crate::utils::parser_registry::ParserRegistry;

/// 应用级共享状态
/// 持有解析器注册表、资源目录和各个存储，注入到所有 handler
pub struct AppState {
    pub parser_registry: Arc<ParserRegistry>,
    pub resource_dir: String,
    pub task_store: Arc<TaskStore>,
    pub performance_store: Arc<PerformanceStore>,
}
