use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::handlers::preprocess::{resolve_file_selection, run_preprocess};

#[derive(Deserialize)]
pub struct DensityGridQuery {
    /// 文件名，例如 "Dt.cube"
    pub file: Option<String>,
    /// 密度种类 total/alpha/beta/spin，与 file 二选一
    pub variant: Option<String>,
    /// 分块大小（元素数量），必须指定
    pub chunk_size: Option<usize>,
}

/// 密度网格接口，根据文件名自动识别文件格式并解析
/// 例如: /density-grid?file=Dt.cube&chunk_size=1000000
/// 或按密度种类: /density-grid?variant=spin&chunk_size=1000000
#[get("/density-grid")]
pub async fn get_density_grid(
    data: web::Data<AppState>,
    query: web::Query<DensityGridQuery>,
) -> impl Responder {
    let Some(chunk_size) = query.chunk_size else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "缺少 chunk_size 参数",
            "message": "请提供分块大小（元素个数），例如 /density-grid?file=Dt.cube&chunk_size=1000000",
        }));
    };

    let file = match resolve_file_selection(query.file.as_deref(), query.variant.as_deref()) {
        Ok(file) => file,
        Err(err) => return err,
    };

    match run_preprocess(data.get_ref(), &file, chunk_size) {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(err) => err,
    }
}
