use actix_web::{HttpResponse, Responder, get, web};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::handlers::preprocess::resolve_file_selection;
use crate::parsers::CubeParseError;

/// 原始绘图流程使用的相对容差
const DEFAULT_ISO_RTOL: f64 = 0.03;

#[derive(Deserialize)]
pub struct SliceQuery {
    pub file: Option<String>,
    pub variant: Option<String>,
    /// 切片轴: 0/1/2 对应 x/y/z
    pub axis: usize,
    /// 在该轴上的位置
    pub index: usize,
    /// 等值密度，给出时返回等值线附近的标记点
    pub iso: Option<f64>,
    /// isclose 判定的相对容差，默认 0.03
    pub rtol: Option<f64>,
}

/// 密度切片接口: 同步解析文件，返回二维切片与等值线标记
/// 例如: /density-slice?variant=total&axis=0&index=60&iso=0.02
#[get("/density-slice")]
pub async fn get_density_slice(
    data: web::Data<AppState>,
    query: web::Query<SliceQuery>,
) -> impl Responder {
    let file = match resolve_file_selection(query.file.as_deref(), query.variant.as_deref()) {
        Ok(file) => file,
        Err(err) => return err,
    };
    let file_path = format!("{}/{}", data.resource_dir, file);

    let parser = match data.parser_registry.find_parser_for_file(&file_path) {
        Some((p, _)) => p,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "不支持的文件格式",
                "file": file,
                "supported_extensions": data.parser_registry.supported_extensions(),
            }));
        }
    };

    // 切片接口一次性返回结果，直接同步解析
    let (grid, metadata) = match parser.parse_from_file(&file_path) {
        Ok(parsed) => parsed,
        Err(e) => return parse_error_response(&file, e),
    };

    let slice = match grid.slice_along_axis(query.axis, query.index) {
        Ok(slice) => slice,
        Err(message) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": message,
                "file": file,
                "grid_shape": grid.shape,
            }));
        }
    };

    let markers = query
        .iso
        .map(|iso| slice.iso_markers(iso, query.rtol.unwrap_or(DEFAULT_ISO_RTOL)));

    HttpResponse::Ok().json(serde_json::json!({
        "file": file,
        "axis": query.axis,
        "index": query.index,
        "slice": slice,
        "iso": query.iso,
        "markers": markers,
        "origin": metadata.origin,
        "axis_vectors": metadata.axis_vectors,
    }))
}

/// 把解析错误映射到 HTTP 状态码
/// 格式问题归为 422，文件读不到归为 404，其余归为 500
fn parse_error_response(file: &str, error: Box<dyn std::error::Error>) -> HttpResponse {
    let body = serde_json::json!({
        "error": "解析 cube 文件失败",
        "file": file,
        "details": error.to_string(),
    });

    match error.downcast_ref::<CubeParseError>() {
        Some(
            CubeParseError::MalformedHeader { .. }
            | CubeParseError::TruncatedData { .. }
            | CubeParseError::MalformedToken { .. },
        ) => HttpResponse::UnprocessableEntity().json(body),
        Some(CubeParseError::Io(_)) => HttpResponse::NotFound().json(body),
        None => HttpResponse::InternalServerError().json(body),
    }
}
