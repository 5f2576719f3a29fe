use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::error;

use crate::errors::PeerReviewError;
use crate::models::ApiResponse;
use crate::models::peer_reviews::requests::{
    AssignReviewsRequest, CreateReviewAssignmentRequest, PendingReviewsQuery, SubmitReviewRequest,
    UpdateReviewStatusRequest,
};
use crate::services::PeerReviewService;

// 业务错误 -> HTTP 响应
fn error_response(err: PeerReviewError) -> HttpResponse {
    if !err.is_client_error() {
        #[cfg(debug_assertions)]
        error!("{}", err.format_colored());
        #[cfg(not(debug_assertions))]
        error!("{}", err.format_simple());
    }

    let body = ApiResponse::from_error(&err);
    match err {
        PeerReviewError::Validation(_) => HttpResponse::BadRequest().json(body),
        PeerReviewError::NotFound(_) => HttpResponse::NotFound().json(body),
        PeerReviewError::Conflict(_) => HttpResponse::Conflict().json(body),
        PeerReviewError::InvalidTransition(_) => HttpResponse::UnprocessableEntity().json(body),
        PeerReviewError::DatabaseConfig(_)
        | PeerReviewError::DatabaseConnection(_)
        | PeerReviewError::DatabaseOperation(_) => HttpResponse::InternalServerError().json(body),
    }
}

// 批量分配互评任务
pub async fn assign_reviews(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
    body: Option<web::Json<AssignReviewsRequest>>,
) -> ActixResult<HttpResponse> {
    let req = body.map(|b| b.into_inner()).unwrap_or_default();
    match service
        .assign_reviews(path.into_inner(), req.reviews_per_submission)
        .await
    {
        Ok(result) => {
            let message = result.message.clone();
            Ok(HttpResponse::Ok().json(ApiResponse::success(result, message)))
        }
        Err(e) => Ok(error_response(e)),
    }
}

// 作业互评统计
pub async fn get_statistics(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match service.get_statistics(path.into_inner()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats, "查询成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

// 作业下的全部互评任务
pub async fn list_by_assignment(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match service.list_by_assignment(path.into_inner()).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items, "查询成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

// 提交下的互评任务
pub async fn list_by_submission(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match service.list_by_submission(path.into_inner()).await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items, "查询成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

// 评审人待办列表
pub async fn get_pending_reviews(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
    query: web::Query<PendingReviewsQuery>,
) -> ActixResult<HttpResponse> {
    match service
        .get_pending_reviews(path.into_inner(), query.course_instance_id)
        .await
    {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items, "查询成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

// 手动分配
pub async fn create_review_assignment(
    service: web::Data<PeerReviewService>,
    body: web::Json<CreateReviewAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    match service.create_review_assignment(body.into_inner()).await {
        Ok(item) => Ok(HttpResponse::Created().json(ApiResponse::success(item, "分配成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn get_review_assignment(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match service.get_review_assignment(path.into_inner()).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item, "查询成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn delete_review_assignment(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match service.delete_assignment(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("删除成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn update_status(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
    body: web::Json<UpdateReviewStatusRequest>,
) -> ActixResult<HttpResponse> {
    match service.update_status(path.into_inner(), body.status).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item, "状态已更新"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn start_review(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    match service.start_review(path.into_inner()).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item, "已开始评审"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn submit_review(
    service: web::Data<PeerReviewService>,
    path: web::Path<i64>,
    body: web::Json<SubmitReviewRequest>,
) -> ActixResult<HttpResponse> {
    match service
        .submit_review(path.into_inner(), body.into_inner())
        .await
    {
        Ok(review) => Ok(HttpResponse::Created().json(ApiResponse::success(review, "评审已提交"))),
        Err(e) => Ok(error_response(e)),
    }
}

// 配置路由
pub fn configure_peer_review_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/peer-reviews")
            .service(
                web::scope("/assignments/{id}")
                    .route("/assign", web::post().to(assign_reviews))
                    .route("/statistics", web::get().to(get_statistics))
                    .route("/review-assignments", web::get().to(list_by_assignment)),
            )
            .route(
                "/submissions/{id}/review-assignments",
                web::get().to(list_by_submission),
            )
            .route("/reviewers/{id}/pending", web::get().to(get_pending_reviews))
            .service(
                web::resource("/review-assignments")
                    .route(web::post().to(create_review_assignment)),
            )
            .service(
                web::resource("/review-assignments/{id}")
                    .route(web::get().to(get_review_assignment))
                    .route(web::delete().to(delete_review_assignment)),
            )
            .route(
                "/review-assignments/{id}/status",
                web::put().to(update_status),
            )
            .route("/review-assignments/{id}/start", web::post().to(start_review))
            .route(
                "/review-assignments/{id}/reviews",
                web::post().to(submit_review),
            ),
    );
}
