use std::sync::Arc;

use actix_web::{web, HttpResponse};
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::models::*;
use crate::repo::{Repo, RepoError};

/// Fixed text stored whenever a report carries a voice note. There is no real
/// speech-to-text behind this endpoint.
pub const VOICE_TRANSCRIPT_PLACEHOLDER: &str =
    "Voice note recorded (transcription available in full version)";

/// Half-width of the proximity search box, in decimal degrees. The `radius`
/// query parameter is accepted for wire compatibility but does not change it.
pub const GEO_BOX_OFFSET: f64 = 0.05;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/").route(web::get().to(health)))
            .service(web::resource("/users/register").route(web::post().to(register_user)))
            .service(web::resource("/users/login").route(web::post().to(login_user)))
            .service(web::resource("/categories").route(web::get().to(list_categories)))
            .service(web::resource("/categories/init").route(web::post().to(init_categories)))
            .service(
                web::resource("/issues")
                    .route(web::get().to(list_issues))
                    .route(web::post().to(create_issue)),
            )
            .service(web::resource("/issues/{id}").route(web::get().to(get_issue)))
            .service(web::resource("/issues/{id}/vote").route(web::post().to(vote_issue)))
            .service(
                web::resource("/issues/{id}/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(add_comment)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
}

/// SHA-256 over the raw password bytes, hex-encoded. Matches what the mobile
/// client's accounts were created with, so it cannot change silently.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The seven-entry taxonomy installed by `POST /api/categories/init`.
pub fn default_categories() -> Vec<NewCategory> {
    let seed = [
        ("Roads & Transportation", "Potholes, traffic issues, road repairs", "car"),
        ("Water & Sanitation", "Water leaks, drainage, sewage", "water-drop"),
        ("Electricity", "Power outages, street lights, electrical issues", "flash"),
        ("Waste Management", "Garbage collection, littering, recycling", "trash"),
        ("Public Safety", "Security, crime, emergency services", "shield"),
        ("Parks & Recreation", "Parks maintenance, recreational facilities", "leaf"),
        ("Other", "Other civic issues", "help-circle"),
    ];
    seed.into_iter()
        .map(|(name, description, icon)| NewCategory {
            name: name.into(),
            description: description.into(),
            icon: icon.into(),
        })
        .collect()
}

// ---------------- request / response shapes ----------------

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: UserPublic,
    pub message: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct IssueEnvelope {
    pub success: bool,
    pub issue: Issue,
    pub message: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct CommentEnvelope {
    pub success: bool,
    pub comment: Comment,
    pub message: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct VoteEnvelope {
    pub success: bool,
    pub voted: bool,
    pub message: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

// ---------------- handlers ----------------

#[utoipa::path(
    get,
    path = "/api/",
    responses((status = 200, description = "Liveness", body = HealthResponse))
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".into(),
        message: "CIRS API is running".into(),
    })
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = UserEnvelope),
        (status = 400, description = "Email already registered")
    )
)]
pub async fn register_user(
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let new = NewUser {
        name: req.name,
        email: req.email,
        password_hash: hash_password(&req.password),
        phone: req.phone,
        role: "citizen".into(),
    };
    let user = data.repo.create_user(new).await.map_err(|e| match e {
        RepoError::Conflict => ApiError::Validation("Email already registered".into()),
        other => other.into(),
    })?;
    Ok(HttpResponse::Ok().json(UserEnvelope {
        success: true,
        user: user.into(),
        message: "User registered successfully".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserEnvelope),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_user(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let digest = hash_password(&req.password);
    let user = data
        .repo
        .find_user_by_credentials(&req.email, &digest)
        .await
        .map_err(|e| match e {
            RepoError::NotFound => ApiError::Unauthorized,
            other => other.into(),
        })?;
    Ok(HttpResponse::Ok().json(UserEnvelope {
        success: true,
        user: user.into(),
        message: "Login successful".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "List categories", body = [Category]))
)]
pub async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let categories = data.repo.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[utoipa::path(
    post,
    path = "/api/categories/init",
    responses((status = 200, description = "Catalog reseeded", body = MessageEnvelope))
)]
pub async fn init_categories(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let seeded = data.repo.reset_categories(default_categories()).await?;
    log::info!("category catalog reseeded ({} entries)", seeded.len());
    Ok(HttpResponse::Ok().json(MessageEnvelope {
        success: true,
        message: "Categories initialized".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/issues",
    request_body = NewIssue,
    responses(
        (status = 200, description = "Issue reported", body = IssueEnvelope),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn create_issue(
    data: web::Data<AppState>,
    payload: web::Json<NewIssue>,
) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    let transcript = match &new.voice_base64 {
        Some(v) if !v.is_empty() => Some(VOICE_TRANSCRIPT_PLACEHOLDER.to_string()),
        _ => None,
    };
    let issue = data.repo.create_issue(new, transcript).await?;
    Ok(HttpResponse::Ok().json(IssueEnvelope {
        success: true,
        issue,
        message: "Issue reported successfully".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/issues",
    params(
        ("lat" = Option<f64>, Query, description = "Bounding-box center latitude"),
        ("lng" = Option<f64>, Query, description = "Bounding-box center longitude"),
        ("radius" = Option<f64>, Query, description = "Accepted but unused; the box is a fixed 0.05-degree offset"),
        ("category_id" = Option<i64>, Query, description = "Filter by category")
    ),
    responses((status = 200, description = "Filtered issue list", body = [Issue]))
)]
pub async fn list_issues(
    data: web::Data<AppState>,
    query: web::Query<IssueFilter>,
) -> Result<HttpResponse, ApiError> {
    let filter = query.into_inner();
    // Precedence: proximity box, then category, then everything.
    let issues = match (filter.lat, filter.lng, filter.category_id) {
        (Some(lat), Some(lng), _) => {
            data.repo
                .list_issues_in_box(
                    lat - GEO_BOX_OFFSET,
                    lat + GEO_BOX_OFFSET,
                    lng - GEO_BOX_OFFSET,
                    lng + GEO_BOX_OFFSET,
                )
                .await?
        }
        (_, _, Some(category_id)) => data.repo.list_issues_by_category(category_id).await?,
        _ => data.repo.list_issues().await?,
    };
    Ok(HttpResponse::Ok().json(issues))
}

#[utoipa::path(
    get,
    path = "/api/issues/{id}",
    params(("id" = Id, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Issue", body = Issue),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn get_issue(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let issue = data.repo.get_issue(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(issue))
}

#[utoipa::path(
    post,
    path = "/api/issues/{id}/vote",
    params(("id" = Id, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Vote added", body = VoteEnvelope),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn vote_issue(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let issue = data.repo.vote_issue(path.into_inner()).await?;
    log::debug!("issue {} now at {} votes", issue.id, issue.vote_count);
    Ok(HttpResponse::Ok().json(VoteEnvelope {
        success: true,
        voted: true,
        message: "Vote added".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/issues/{id}/comments",
    params(("id" = Id, Path, description = "Issue id")),
    request_body = NewComment,
    responses(
        (status = 200, description = "Comment added", body = CommentEnvelope),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn add_comment(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewComment>,
) -> Result<HttpResponse, ApiError> {
    let comment = data
        .repo
        .create_comment(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(CommentEnvelope {
        success: true,
        comment,
        message: "Comment added".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/issues/{id}/comments",
    params(("id" = Id, Path, description = "Issue id")),
    responses((status = 200, description = "Comments, newest first", body = [Comment]))
)]
pub async fn list_comments(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let comments = data.repo.list_comments(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}
