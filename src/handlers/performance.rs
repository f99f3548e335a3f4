use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;

use crate::app_state::AppState;

#[derive(Deserialize)]
pub struct PerformanceQuery {
    pub session_id: String,
}

/// 获取指定会话的性能数据
/// 没有记录时返回空数组而不是 404，因为请求可能全部命中了前端缓存
#[get("/performance")]
pub async fn get_performance(
    data: web::Data<AppState>,
    query: web::Query<PerformanceQuery>,
) -> impl Responder {
    let records = data.performance_store.get_records(&query.session_id);

    HttpResponse::Ok().json(serde_json::json!({
        "session_id": query.session_id,
        "records": records.unwrap_or_default(),
    }))
}
