use std::io::Write;

use actix_web::{HttpResponse, Responder, get, http::header::ContentType, web};
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;

use crate::app_state::AppState;

#[derive(Deserialize)]
pub struct ChunkQuery {
    pub task_id: String,
    pub chunk_index: usize,
    /// 为 true 时对载荷做 gzip 压缩
    pub gzip: Option<bool>,
}

/// 按小端序 f64 交付一个 chunk 的数据
/// chunk 数据在交付后即被释放，每个 chunk 只能请求一次
#[get("/density-grid/chunk")]
pub async fn get_density_chunk(
    data: web::Data<AppState>,
    query: web::Query<ChunkQuery>,
) -> impl Responder {
    let Some(task) = data.task_store.get(&query.task_id) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "无效的 task_id",
            "task_id": query.task_id,
        }));
    };

    let Some(descriptor) = task.chunks.get(query.chunk_index) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "无效的 chunk_index",
            "chunk_index": query.chunk_index,
        }));
    };

    // 后台解析还未完成时返回 202，前端稍后重试
    if !task.is_chunk_ready(query.chunk_index) {
        return HttpResponse::Accepted().json(serde_json::json!({
            "error": "chunk 正在解析中，请稍后重试",
            "task_id": query.task_id,
            "chunk_index": query.chunk_index,
            "status": "processing",
        }));
    }

    // 获取并移除 chunk 数据，已被请求过的 chunk 返回 None
    let Some(chunk_values) = task.take_chunk(query.chunk_index) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "chunk 已被请求或不存在",
            "task_id": query.task_id,
            "chunk_index": query.chunk_index,
        }));
    };

    // 序列化为小端序二进制
    let mut bytes = Vec::with_capacity(chunk_values.len() * std::mem::size_of::<f64>());
    for value in chunk_values {
        if let Err(e) = bytes.write_f64::<LittleEndian>(value) {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "写入 chunk 数据失败",
                "details": e.to_string(),
            }));
        }
    }

    let mut response = HttpResponse::Ok();
    response
        .content_type(ContentType::octet_stream())
        .append_header(("X-Chunk-Index", descriptor.index.to_string()))
        .append_header(("X-Chunk-Start", descriptor.start.to_string()))
        .append_header(("X-Chunk-End", descriptor.end.to_string()))
        .append_header((
            "X-Chunk-Length",
            (descriptor.end - descriptor.start).to_string(),
        ))
        .append_header(("X-Chunk-Task", query.task_id.clone()));

    // 可选 gzip 压缩，大网格的 f64 数据压缩收益明显
    if query.gzip.unwrap_or(false) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        if let Err(e) = encoder.write_all(&bytes) {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "压缩 chunk 数据失败",
                "details": e.to_string(),
            }));
        }
        match encoder.finish() {
            Ok(compressed_bytes) => {
                return response
                    .append_header(("Content-Encoding", "gzip"))
                    .body(compressed_bytes);
            }
            Err(e) => {
                return HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "压缩 chunk 数据失败",
                    "details": e.to_string(),
                }));
            }
        }
    }

    response.body(bytes)
}
