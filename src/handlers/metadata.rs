use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;

use crate::app_state::AppState;

#[derive(Deserialize)]
pub struct MetadataQuery {
    pub task_id: String,
}

/// 返回预处理任务对应 cube 文件的头部元数据
/// 包括网格原点、各轴点数与步进向量、原子列表
#[get("/density-grid/metadata")]
pub async fn get_density_metadata(
    data: web::Data<AppState>,
    query: web::Query<MetadataQuery>,
) -> impl Responder {
    let Some(task) = data.task_store.get(&query.task_id) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "无效的 task_id",
            "task_id": query.task_id,
        }));
    };

    // 元数据在后台解析完成后才可用
    let Some(metadata) = task.get_metadata() else {
        return HttpResponse::Accepted().json(serde_json::json!({
            "error": "文件正在解析中，请稍后重试",
            "task_id": query.task_id,
            "status": "processing",
        }));
    };

    HttpResponse::Ok().json(serde_json::json!({
        "task_id": query.task_id,
        "shape": task.shape,
        "metadata": metadata,
    }))
}
