use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::accounts::{CompanyUpdate, EmployerId, IdentityId, RegistrationForm};
use super::applications::{ApplicantInput, ApplicationId, NewApplication, ReviewUpdate};
use super::error::BoardError;
use super::listings::{ListingDraft, ListingId, ListingQuery};
use super::repository::{BoardRepository, RowScope};
use super::storage::{StoredRef, Upload};
use super::JobBoard;

/// Uploads up to the 10 MiB document limit plus multipart slack.
const BODY_LIMIT: usize = 12 * 1024 * 1024;

type SharedBoard<R> = Arc<JobBoard<R>>;

/// Router exposing the job board over JSON.
pub fn board_router<R>(board: SharedBoard<R>) -> Router
where
    R: BoardRepository + 'static,
{
    Router::new()
        .route("/api/v1/accounts/register", post(register::<R>))
        .route("/api/v1/accounts/login", post(login::<R>))
        .route("/api/v1/accounts/me", get(me::<R>))
        .route("/api/v1/accounts/me/company", put(update_company::<R>))
        .route(
            "/api/v1/accounts/me/company/logo/:file_name",
            put(upload_logo::<R>),
        )
        .route(
            "/api/v1/accounts/me/picture/:file_name",
            put(upload_picture::<R>),
        )
        .route("/api/v1/accounts/me/cv", axum::routing::delete(remove_cv::<R>))
        .route("/api/v1/accounts/me/cv/:file_name", put(upload_cv::<R>))
        .route(
            "/api/v1/accounts/me/cv-preferences",
            put(cv_preferences::<R>),
        )
        .route("/api/v1/candidates/:identity/cv", get(candidate_cv::<R>))
        .route("/api/v1/jobs", get(search_jobs::<R>).post(submit_job::<R>))
        .route("/api/v1/jobs/facets", get(job_facets::<R>))
        .route(
            "/api/v1/jobs/:listing",
            get(job_detail::<R>)
                .put(edit_job::<R>)
                .delete(delete_job::<R>),
        )
        .route("/api/v1/jobs/:listing/resubmit", post(resubmit_job::<R>))
        .route(
            "/api/v1/jobs/:listing/applications",
            get(listing_applications::<R>),
        )
        .route(
            "/api/v1/jobs/:listing/save",
            post(save_job::<R>).delete(unsave_job::<R>),
        )
        .route("/api/v1/saved-jobs", get(saved_jobs::<R>))
        .route("/api/v1/resumes/:file_name", post(upload_resume::<R>))
        .route("/api/v1/applications", post(apply::<R>))
        .route("/api/v1/applications/mine", get(my_applications::<R>))
        .route(
            "/api/v1/applications/:application",
            axum::routing::patch(review_application::<R>),
        )
        .route(
            "/api/v1/applications/:application/read",
            post(mark_read::<R>),
        )
        .route(
            "/api/v1/applications/:application/resume",
            get(application_resume::<R>),
        )
        .route("/api/v1/rejection-reasons", get(rejection_reasons::<R>))
        .route("/api/v1/employer/jobs", get(employer_jobs::<R>))
        .route(
            "/api/v1/employer/applications",
            get(employer_applications::<R>),
        )
        .route("/api/v1/employer/dashboard", get(employer_dashboard::<R>))
        .route("/api/v1/admin/jobs", get(admin_jobs::<R>))
        .route(
            "/api/v1/admin/jobs/:listing",
            axum::routing::delete(hard_delete_job::<R>),
        )
        .route("/api/v1/admin/jobs/:listing/approve", post(approve_job::<R>))
        .route("/api/v1/admin/jobs/:listing/reject", post(reject_job::<R>))
        .route("/api/v1/admin/jobs/:listing/restore", post(restore_job::<R>))
        .route("/api/v1/admin/accounts/roles", post(assign_roles::<R>))
        .route(
            "/api/v1/admin/accounts/:identity/role",
            post(assign_role::<R>),
        )
        .route(
            "/api/v1/admin/employers/:employer",
            axum::routing::delete(delete_employer::<R>),
        )
        .route(
            "/api/v1/admin/employers/:employer/restore",
            post(restore_employer::<R>),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(board)
}

fn requester<R>(board: &SharedBoard<R>, headers: &HeaderMap) -> Result<IdentityId, BoardError>
where
    R: BoardRepository + 'static,
{
    optional_requester(board, headers)?.ok_or(BoardError::Unauthenticated)
}

/// No `Authorization` header means an anonymous caller. Anything other than
/// a valid `Bearer` session token is rejected.
fn optional_requester<R>(
    board: &SharedBoard<R>,
    headers: &HeaderMap,
) -> Result<Option<IdentityId>, BoardError>
where
    R: BoardRepository + 'static,
{
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .ok_or(BoardError::Unauthenticated)?;
    board.accounts.resolve_session(token).map(Some)
}

fn created<T: serde::Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    login: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CvPreferences {
    consent: bool,
    #[serde(default)]
    share_with_employers: bool,
}

#[derive(Debug, Deserialize)]
struct RoleRequest {
    role: String,
}

#[derive(Debug, Deserialize)]
struct BulkRoleRequest {
    targets: Vec<IdentityId>,
    role: String,
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    #[serde(default)]
    feedback: String,
}

#[derive(Debug, Default, Deserialize)]
struct AdminListingQuery {
    #[serde(default)]
    include_deleted: bool,
}

/// Application body. The applicant is the authenticated caller, or the
/// guest contact when the request is anonymous.
#[derive(Debug, Deserialize)]
struct ApplicationRequest {
    listing: Option<ListingId>,
    job_title: Option<String>,
    job_company: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    cover_letter: String,
    resume: StoredRef,
}

async fn register<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    Json(form): Json<RegistrationForm>,
) -> Result<Response, BoardError> {
    Ok(created(board.accounts.register(form)?))
}

async fn login<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, BoardError> {
    let session = board.accounts.login(&request.login, &request.password)?;
    Ok(Json(session).into_response())
}

async fn me<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.accounts.account(actor)?).into_response())
}

async fn update_company<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Json(update): Json<CompanyUpdate>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.accounts.update_company(actor, update)?).into_response())
}

async fn upload_logo<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(file_name): Path<String>,
    body: Bytes,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let upload = Upload::new(file_name, body.to_vec());
    Ok(Json(board.accounts.update_company_logo(actor, upload)?).into_response())
}

async fn upload_picture<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(file_name): Path<String>,
    body: Bytes,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let upload = Upload::new(file_name, body.to_vec());
    Ok(Json(board.accounts.update_profile_picture(actor, upload)?).into_response())
}

async fn upload_cv<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(file_name): Path<String>,
    body: Bytes,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let upload = Upload::new(file_name, body.to_vec());
    Ok(Json(board.cvs.upload_cv(actor, upload)?).into_response())
}

async fn remove_cv<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.cvs.remove_cv(actor)?).into_response())
}

async fn cv_preferences<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Json(preferences): Json<CvPreferences>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let profile = board.cvs.set_cv_preferences(
        actor,
        preferences.consent,
        preferences.share_with_employers,
    )?;
    Ok(Json(profile).into_response())
}

async fn candidate_cv<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(candidate): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.cvs.access_cv(actor, IdentityId(candidate))?).into_response())
}

async fn search_jobs<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    Query(query): Query<ListingQuery>,
) -> Result<Response, BoardError> {
    Ok(Json(board.listings.search(&query)?).into_response())
}

async fn job_facets<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
) -> Result<Response, BoardError> {
    Ok(Json(board.listings.facets()?).into_response())
}

async fn submit_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Json(draft): Json<ListingDraft>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(created(board.listings.submit(actor, draft)?))
}

async fn job_detail<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    Ok(Json(board.listings.detail(ListingId(listing))?).into_response())
}

async fn edit_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
    Json(draft): Json<ListingDraft>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.listings.edit(actor, ListingId(listing), draft)?).into_response())
}

async fn delete_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.listings.delete(actor, ListingId(listing))?).into_response())
}

async fn resubmit_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.listings.resubmit(actor, ListingId(listing))?).into_response())
}

async fn listing_applications<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let views = board
        .applications
        .listing_applications(actor, ListingId(listing))?;
    Ok(Json(views).into_response())
}

async fn save_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.applications.save_job(actor, ListingId(listing))?).into_response())
}

async fn unsave_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    board
        .applications
        .remove_saved_job(actor, ListingId(listing))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn saved_jobs<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.applications.saved_jobs(actor)?).into_response())
}

async fn upload_resume<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    Path(file_name): Path<String>,
    body: Bytes,
) -> Result<Response, BoardError> {
    let upload = Upload::new(file_name, body.to_vec());
    Ok(created(board.applications.upload_resume(upload)?))
}

async fn apply<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Json(request): Json<ApplicationRequest>,
) -> Result<Response, BoardError> {
    let applicant = ApplicantInput {
        identity: optional_requester(&board, &headers)?,
        guest_name: request.guest_name,
        guest_email: request.guest_email,
    };
    let application = board.applications.apply(NewApplication {
        listing: request.listing,
        job_title: request.job_title,
        job_company: request.job_company,
        applicant,
        cover_letter: request.cover_letter,
        resume: request.resume,
    })?;
    Ok(created(application))
}

async fn my_applications<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.applications.my_applications(actor)?).into_response())
}

async fn review_application<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(application): Path<u64>,
    Json(update): Json<ReviewUpdate>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let reviewed = board
        .applications
        .review(actor, ApplicationId(application), update)?;
    Ok(Json(reviewed).into_response())
}

async fn mark_read<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(application): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let reviewed = board
        .applications
        .mark_read(actor, ApplicationId(application))?;
    Ok(Json(reviewed).into_response())
}

async fn application_resume<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(application): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let link = board
        .applications
        .application_resume(actor, ApplicationId(application))?;
    Ok(Json(link).into_response())
}

async fn rejection_reasons<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
) -> Result<Response, BoardError> {
    Ok(Json(board.applications.rejection_reasons()?).into_response())
}

async fn employer_jobs<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.listings.employer_listings(actor)?).into_response())
}

async fn employer_applications<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.applications.employer_applications(actor)?).into_response())
}

async fn employer_dashboard<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.listings.employer_dashboard(actor)?).into_response())
}

async fn admin_jobs<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Query(query): Query<AdminListingQuery>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let scope = if query.include_deleted {
        RowScope::IncludeDeleted
    } else {
        RowScope::Active
    };
    Ok(Json(board.listings.admin_listings(actor, scope)?).into_response())
}

async fn approve_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.listings.approve(actor, ListingId(listing))?).into_response())
}

async fn reject_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
    Json(request): Json<RejectRequest>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let listing = board
        .listings
        .reject(actor, ListingId(listing), &request.feedback)?;
    Ok(Json(listing).into_response())
}

async fn restore_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.listings.restore(actor, ListingId(listing))?).into_response())
}

async fn hard_delete_job<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(listing): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    board.listings.hard_delete(actor, ListingId(listing))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn assign_role<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(target): Path<u64>,
    Json(request): Json<RoleRequest>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let view = board
        .accounts
        .assign_role(actor, IdentityId(target), &request.role)?;
    Ok(Json(view).into_response())
}

async fn assign_roles<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Json(request): Json<BulkRoleRequest>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    let views = board
        .accounts
        .assign_role_bulk(actor, &request.targets, &request.role)?;
    Ok(Json(views).into_response())
}

async fn delete_employer<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(employer): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.accounts.delete_employer(actor, EmployerId(employer))?).into_response())
}

async fn restore_employer<R: BoardRepository + 'static>(
    State(board): State<SharedBoard<R>>,
    headers: HeaderMap,
    Path(employer): Path<u64>,
) -> Result<Response, BoardError> {
    let actor = requester(&board, &headers)?;
    Ok(Json(board.accounts.restore_employer(actor, EmployerId(employer))?).into_response())
}
