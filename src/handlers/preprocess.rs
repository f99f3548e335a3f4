use std::time::Instant;

use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::performance::{PerformanceRecord, get_unix_timestamp_ms};
use crate::task::{ChunkDescriptor, TaskData};

#[derive(Deserialize)]
pub struct PreprocessRequest {
    /// 资源目录下的文件名，例如 "Dt.cube"
    pub file: Option<String>,
    /// 密度种类，total/alpha/beta/spin，与 file 二选一
    pub variant: Option<String>,
    pub chunk_size: usize,
}

#[derive(Serialize, Clone)]
pub struct PreprocessResponse {
    pub task_id: String,
    pub file: String,
    pub file_size: u64,
    pub shape: [usize; 3],
    pub data_length: usize,
    pub chunk_size: usize,
    pub chunks: Vec<ChunkDescriptor>,
}

/// 把密度种类映射到求解器约定的 cube 文件名
/// 约定来自量子化学引擎的输出: Dt=总密度, Da=alpha, Db=beta, Ds=自旋差
pub fn variant_file_name(variant: &str) -> Option<&'static str> {
    match variant {
        "total" => Some("Dt.cube"),
        "alpha" => Some("Da.cube"),
        "beta" => Some("Db.cube"),
        "spin" => Some("Ds.cube"),
        _ => None,
    }
}

/// 解析请求中的文件选择: 直接给文件名，或给密度种类由服务端映射
pub fn resolve_file_selection(
    file: Option<&str>,
    variant: Option<&str>,
) -> Result<String, HttpResponse> {
    match (file, variant) {
        (Some(file), _) => Ok(file.to_string()),
        (None, Some(variant)) => match variant_file_name(variant) {
            Some(name) => Ok(name.to_string()),
            None => Err(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "未知的密度种类",
                "variant": variant,
                "supported_variants": ["total", "alpha", "beta", "spin"],
            }))),
        },
        (None, None) => Err(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "缺少 file 或 variant 参数",
        }))),
    }
}

#[post("/density-grid/preprocess")]
pub async fn preprocess_density_grid(
    data: web::Data<AppState>,
    payload: web::Json<PreprocessRequest>,
) -> impl Responder {
    let file = match resolve_file_selection(payload.file.as_deref(), payload.variant.as_deref()) {
        Ok(file) => file,
        Err(err) => return err,
    };

    match run_preprocess(data.get_ref(), &file, payload.chunk_size) {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(err) => err,
    }
}

/// 预处理密度网格文件：快速创建任务并启动后台解析
///
/// 只做轻量级操作:
/// 1. 读取文件头部获取 shape（不解析数据块）
/// 2. 按 chunk_size 计算分块信息
/// 3. 创建任务（task_id）并立即返回
/// 4. 在后台完整解析文件、填入元数据、分割成 chunk
///
/// 各阶段耗时记录到性能存储，session_id 即 task_id
pub fn run_preprocess(
    app_state: &AppState,
    file: &str,
    chunk_size: usize,
) -> Result<PreprocessResponse, HttpResponse> {
    // 分块大小至少为 1，避免除零或无效分块
    let chunk_size = chunk_size.max(1);
    let file_path = format!("{}/{}", app_state.resource_dir, file);

    // 根据文件扩展名查找对应的解析器
    let parser = match app_state.parser_registry.find_parser_for_file(&file_path) {
        Some((p, _)) => p,
        None => {
            let supported = app_state.parser_registry.supported_extensions();
            return Err(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "不支持的文件格式",
                "file": file,
                "supported_extensions": supported,
            })));
        }
    };

    let file_size = match std::fs::metadata(&file_path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            return Err(HttpResponse::NotFound().json(serde_json::json!({
                "error": "文件不存在或无法访问",
                "file": file,
                "details": e.to_string(),
            })));
        }
    };

    // 只读取 cube 头部的 shape，数据块留给后台任务
    let shape = match parser.get_shape_from_file(&file_path) {
        Ok(s) => s,
        Err(e) => {
            return Err(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "读取文件头部失败",
                "file": file,
                "parser": parser.name(),
                "details": e.to_string(),
            })));
        }
    };

    // 按元素个数划分 chunk
    let data_length = shape[0] * shape[1] * shape[2];
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;
    while start < data_length {
        let end = (start + chunk_size).min(data_length);
        chunks.push(ChunkDescriptor { index, start, end });
        start = end;
        index += 1;
    }

    // 创建任务（此时 chunk 都是 None，元数据为空）
    let task_data = TaskData::new(shape, chunks.clone());
    let task_id = app_state.task_store.insert(task_data);

    let Some(task) = app_state.task_store.get(&task_id) else {
        return Err(HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "创建任务失败",
        })));
    };

    // 后台完整解析文件并分割，不阻塞预处理响应
    let parser_registry = app_state.parser_registry.clone();
    let performance_store = app_state.performance_store.clone();
    let file_name = file.to_string();
    let task_id_clone = task_id.clone();

    actix_web::rt::spawn(async move {
        let parse_start = Instant::now();
        let parse_start_ms = get_unix_timestamp_ms();

        let parser = match parser_registry.find_parser_for_file(&file_path) {
            Some((p, _)) => p,
            None => {
                eprintln!("[后台解析] 任务 {} 解析失败：找不到解析器", task_id_clone);
                return;
            }
        };

        let (grid, metadata) = match parser.parse_from_file(&file_path) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("[后台解析] 任务 {} 解析文件失败: {}", task_id_clone, e);
                return;
            }
        };

        task.set_metadata(metadata);

        let parse_duration = parse_start.elapsed();
        performance_store.add_record(
            &task_id_clone,
            PerformanceRecord {
                start_time: parse_start_ms,
                end_time: get_unix_timestamp_ms(),
                channel_group: "preprocess".to_string(),
                channel_index: "parse_file".to_string(),
                msg: format!("{} shape {:?}", file_name, grid.shape),
            },
        );
        println!(
            "[后台解析] 任务 {} 文件解析完成，耗时 {:.2}ms",
            task_id_clone,
            parse_duration.as_millis()
        );

        // 并行分割成多个 chunk 并存储
        let data = grid.get_data();
        let split_start = Instant::now();
        let split_start_ms = get_unix_timestamp_ms();

        let mut handles = Vec::new();
        for descriptor in task.chunks.clone() {
            let task_ref = task.clone();
            // 每个任务需要各自的数据切片副本
            let chunk_values: Vec<f64> = data[descriptor.start..descriptor.end].to_vec();

            let handle = actix_web::rt::spawn(async move {
                task_ref.set_chunk(descriptor.index, chunk_values);
            });
            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.await;
        }

        let split_duration = split_start.elapsed();
        performance_store.add_record(
            &task_id_clone,
            PerformanceRecord {
                start_time: split_start_ms,
                end_time: get_unix_timestamp_ms(),
                channel_group: "preprocess".to_string(),
                channel_index: "split_chunks".to_string(),
                msg: format!("{} 个 chunk", task.chunks.len()),
            },
        );
        println!(
            "[后台解析] 任务 {} 分割完成，共 {} 个 chunk，耗时 {:.2}ms",
            task_id_clone,
            task.chunks.len(),
            split_duration.as_millis()
        );
    });

    // 立即返回，前端通过 chunk 接口轮询数据
    Ok(PreprocessResponse {
        task_id,
        file: file.to_string(),
        file_size,
        shape,
        data_length,
        chunk_size,
        chunks,
    })
}
