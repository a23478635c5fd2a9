use crate::models::{Category, Comment, Issue, NewComment, NewIssue, UserPublic};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::register_user,
        crate::routes::login_user,
        crate::routes::list_categories,
        crate::routes::init_categories,
        crate::routes::create_issue,
        crate::routes::list_issues,
        crate::routes::get_issue,
        crate::routes::vote_issue,
        crate::routes::add_comment,
        crate::routes::list_comments,
    ),
    components(schemas(
        UserPublic, Category, Issue, NewIssue, Comment, NewComment,
        crate::routes::RegisterRequest, crate::routes::LoginRequest,
        crate::routes::UserEnvelope, crate::routes::IssueEnvelope,
        crate::routes::CommentEnvelope, crate::routes::VoteEnvelope,
        crate::routes::MessageEnvelope, crate::routes::HealthResponse
    )),
    tags(
        (name = "users", description = "Registration and login"),
        (name = "categories", description = "Issue taxonomy"),
        (name = "issues", description = "Issue reports, votes and comments"),
    )
)]
pub struct ApiDoc;
