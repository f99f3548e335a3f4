use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;

/// 根路径健康检查/服务说明
#[get("/")]
pub async fn hello(data: web::Data<AppState>) -> impl Responder {
    let supported = data.parser_registry.supported_extensions();
    HttpResponse::Ok().json(serde_json::json!({
        "message": "电子密度网格数据服务",
        "endpoints": [
            "/density-grid?file=<filename>&chunk_size=<size>",
            "/density-grid?variant=<total|alpha|beta|spin>&chunk_size=<size>",
            "/density-grid/preprocess",
            "/density-grid/chunk?task_id=<id>&chunk_index=<n>",
            "/density-grid/metadata?task_id=<id>",
            "/density-slice?file=<filename>&axis=<0|1|2>&index=<n>",
            "/performance?session_id=<task_id>",
        ],
        "supported_extensions": supported,
        "resource_dir": data.resource_dir,
    }))
}
