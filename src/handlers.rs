use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query},
    Extension, Json,
};
use tracing::{error, info};

use crate::{
    authentication::{get_jwt_token, hash_password_argon2, verify_password_argon2, AuthUser},
    data_formats::*,
    db_helpers::{
        bookmark_exists, delete_bookmark, get_article_by_id, get_article_by_url, get_preferences,
        get_user_by_email, get_user_by_id, insert_article_if_absent, insert_bookmark_if_absent,
        insert_user, list_bookmarks_with_articles, record_interaction, set_preferences,
        update_newsletter_in_db, update_profile_in_db,
    },
    errors::RequestError,
    mailer::welcome_email,
    models::{Category, InteractionKind, Upsert, User},
    news::{list_news, CategoryFilter, FeedRequest},
    newsletter::normalize_time,
    recommendations::recommend_for_user,
    summarizer::SummaryRequest,
    uploads::save_avatar,
    AppContext,
};

type JsonResult<T> = Result<Json<T>, RequestError>;
type Ctx = Extension<Arc<AppContext>>;

const MAX_BIO_CHARS: usize = 500;

// ----------------- Helper Handlers -----------------
pub async fn health(Extension(ctx): Ctx) -> Json<HealthWrapper> {
    Json(HealthWrapper {
        status: "OK".to_string(),
        timestamp: ctx.clock.now().to_rfc3339(),
    })
}

pub async fn not_found() -> RequestError {
    RequestError::NotFound("Route not found")
}

async fn user_response(ctx: &AppContext, user: User) -> Result<UserResponse, RequestError> {
    let categories = get_preferences(&ctx.pool, user.id).await?;
    Ok(UserResponse::new(user, categories))
}

async fn current_user(ctx: &AppContext, id: i64) -> Result<User, RequestError> {
    get_user_by_id(&ctx.pool, id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))
}

/// Ids are numeric; anything else cannot name a stored row.
fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

// ----------------- Auth Handlers -----------------
pub async fn register_user(
    Extension(ctx): Ctx,
    Json(request): Json<RegisterRequest>,
) -> JsonResult<AuthWrapper> {
    let username = request.username.trim();
    let email = request.email.trim().to_lowercase();
    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(RequestError::bad_request(
            "Username, email and password are required",
        ));
    }

    let password_hash = hash_password_argon2(request.password).await.map_err(|e| {
        error!("Could not hash password: {}", e);
        RequestError::ServerError
    })?;
    let user = insert_user(&ctx.pool, username, &email, &password_hash)
        .await?
        .ok_or_else(|| RequestError::bad_request("User already exists"))?;

    let token = get_jwt_token(user.id, &ctx.config.jwt_secret).map_err(|e| {
        error!("Could not generate JWT: {}", e);
        RequestError::ServerError
    })?;
    info!(user_id = user.id, "registered user");
    Ok(Json(AuthWrapper {
        token,
        user: UserResponse::new(user, Vec::new()),
    }))
}

pub async fn login_user(
    Extension(ctx): Ctx,
    Json(request): Json<LoginRequest>,
) -> JsonResult<AuthWrapper> {
    let invalid = || RequestError::bad_request("Invalid credentials");
    let email = request.email.trim().to_lowercase();
    let user = get_user_by_email(&ctx.pool, &email)
        .await?
        .ok_or_else(invalid)?;

    let is_password_correct = verify_password_argon2(request.password, &user.password)
        .await
        .map_err(|e| {
            error!("Could not verify password: {}", e);
            RequestError::ServerError
        })?;
    if !is_password_correct {
        return Err(invalid());
    }

    let token = get_jwt_token(user.id, &ctx.config.jwt_secret).map_err(|e| {
        error!("Could not generate JWT: {}", e);
        RequestError::ServerError
    })?;
    let user = user_response(&ctx, user).await?;
    Ok(Json(AuthWrapper { token, user }))
}

pub async fn get_current_user(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
) -> JsonResult<UserWrapper<UserResponse>> {
    let user = current_user(&ctx, id).await?;
    let user = user_response(&ctx, user).await?;
    Ok(Json(UserWrapper::wrap_with_user_data(user)))
}

// ----------------- News Handlers -----------------
pub async fn get_news(
    Extension(ctx): Ctx,
    Query(params): Query<NewsQueryParams>,
) -> JsonResult<NewsPageWrapper> {
    let filter = CategoryFilter::parse(params.category.as_deref())?;
    let request = FeedRequest::new(filter, params.page, params.page_size, params.since);
    let page = list_news(&ctx.pool, ctx.news_source.as_ref(), &request).await?;
    Ok(Json(NewsPageWrapper {
        articles: page.articles.into_iter().map(ArticleResponse::new).collect(),
        has_more: page.has_more,
    }))
}

pub async fn record_view(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
    Path(article_id): Path<String>,
) -> JsonResult<MessageWrapper> {
    let article = match parse_id(&article_id) {
        Some(article_id) => get_article_by_id(&ctx.pool, article_id).await?,
        None => None,
    }
    .ok_or(RequestError::NotFound("Article not found"))?;

    record_interaction(&ctx.pool, id, article.id, InteractionKind::View).await?;
    Ok(Json(MessageWrapper::new("View recorded")))
}

// ----------------- Bookmark Handlers -----------------
pub async fn list_bookmarks(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
) -> JsonResult<MultipleBookmarksWrapper> {
    let bookmarks = list_bookmarks_with_articles(&ctx.pool, id, None)
        .await?
        .into_iter()
        .map(|(bookmark, article)| BookmarkResponse::new(bookmark, article))
        .collect();
    Ok(Json(MultipleBookmarksWrapper { bookmarks }))
}

pub async fn toggle_bookmark(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
    Json(request): Json<BookmarkRequest>,
) -> JsonResult<BookmarkActionWrapper> {
    let action = request
        .action()
        .ok_or_else(|| RequestError::bad_request("Invalid action"))?;
    let url = request
        .article_data
        .url()
        .ok_or_else(|| RequestError::bad_request("Article URL is required"))?;

    match action {
        BookmarkAction::Remove => {
            if let Some(article) = get_article_by_url(&ctx.pool, url).await? {
                if delete_bookmark(&ctx.pool, id, article.id).await? {
                    info!(user_id = id, article_id = article.id, "bookmark removed");
                }
            }
            Ok(Json(BookmarkActionWrapper {
                message: "Bookmark removed".to_string(),
                bookmark: None,
            }))
        }
        BookmarkAction::Add => {
            let new_article = request
                .article_data
                .to_new_article(ctx.clock.now())
                .ok_or_else(|| RequestError::bad_request("Article URL is required"))?;
            let article = insert_article_if_absent(&ctx.pool, &new_article)
                .await?
                .into_inner();

            match insert_bookmark_if_absent(&ctx.pool, id, article.id).await? {
                Upsert::Existing(_) => Ok(Json(BookmarkActionWrapper {
                    message: "Already bookmarked".to_string(),
                    bookmark: None,
                })),
                Upsert::Created(bookmark) => {
                    record_interaction(&ctx.pool, id, article.id, InteractionKind::Bookmark)
                        .await?;
                    info!(user_id = id, article_id = article.id, "bookmark added");
                    Ok(Json(BookmarkActionWrapper {
                        message: "Bookmark added".to_string(),
                        bookmark: Some(BookmarkResponse::new(bookmark, article)),
                    }))
                }
            }
        }
    }
}

pub async fn check_bookmark(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
    Path(article_id): Path<String>,
) -> JsonResult<BookmarkStatusWrapper> {
    let is_bookmarked = match parse_id(&article_id) {
        Some(article_id) => bookmark_exists(&ctx.pool, id, article_id).await?,
        None => false,
    };
    Ok(Json(BookmarkStatusWrapper { is_bookmarked }))
}

// ----------------- Recommendation Handlers -----------------
pub async fn get_recommendations(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
) -> JsonResult<RecommendationsWrapper> {
    let recommendations = recommend_for_user(&ctx.pool, id)
        .await?
        .into_iter()
        .map(ArticleResponse::recommended)
        .collect();
    Ok(Json(RecommendationsWrapper { recommendations }))
}

// ----------------- Summary Handlers -----------------
pub async fn summarize_article(
    Extension(ctx): Ctx,
    Json(request): Json<SummarizeRequest>,
) -> JsonResult<SummaryWrapper> {
    let request = SummaryRequest {
        title: request.title.unwrap_or_default(),
        description: request.description.unwrap_or_default(),
        url: request.url,
        article_id: request.article_id,
    };
    let summary = ctx.summarizer.summarize(&ctx.pool, &request).await?;
    Ok(Json(SummaryWrapper { summary }))
}

// ----------------- Newsletter Handlers -----------------
pub async fn subscribe_newsletter(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
    Json(request): Json<SubscribeRequest>,
) -> JsonResult<SubscriptionWrapper> {
    let time = match request.time.as_deref().map(str::trim) {
        Some(time) if !time.is_empty() => Some(normalize_time(time)?),
        _ => None,
    };
    let user = update_newsletter_in_db(&ctx.pool, id, request.subscribe, time)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;

    if request.subscribe {
        let email = welcome_email(&user.email, &user.newsletter_time);
        match ctx.mailer.send(&email).await {
            Ok(()) => info!(to = %user.email, "Welcome email sent"),
            Err(e) => error!(to = %user.email, "Failed to send welcome email: {}", e),
        }
    }

    let message = if request.subscribe {
        "Subscribed to newsletter successfully"
    } else {
        "Unsubscribed from newsletter successfully"
    };
    Ok(Json(SubscriptionWrapper {
        message: message.to_string(),
        newsletter_subscription: user.newsletter_subscription,
    }))
}

pub async fn newsletter_status(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
) -> JsonResult<NewsletterStatusWrapper> {
    let user = current_user(&ctx, id).await?;
    Ok(Json(NewsletterStatusWrapper {
        newsletter_subscription: user.newsletter_subscription,
        newsletter_time: user.newsletter_time,
    }))
}

// ----------------- Profile Handlers -----------------
pub async fn get_profile(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
) -> JsonResult<UserWrapper<UserResponse>> {
    let user = current_user(&ctx, id).await?;
    let user = user_response(&ctx, user).await?;
    Ok(Json(UserWrapper::wrap_with_user_data(user)))
}

pub async fn update_profile(
    Extension(ctx): Ctx,
    AuthUser { id }: AuthUser,
    mut multipart: Multipart,
) -> JsonResult<UserWrapper<UserResponse>> {
    let mut bio = None;
    let mut preferences = None;
    let mut avatar = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| RequestError::bad_request("Invalid form data"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bio" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| RequestError::bad_request("Invalid form data"))?;
                if text.chars().count() > MAX_BIO_CHARS {
                    return Err(RequestError::bad_request(
                        "Bio must be 500 characters or less",
                    ));
                }
                bio = Some(text);
            }
            "preferences" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| RequestError::bad_request("Invalid form data"))?;
                preferences = Some(Category::parse_set(text.split(',')));
            }
            "avatar" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| RequestError::bad_request("File too large. Max size is 5MB."))?;
                if bytes.is_empty() && file_name.is_empty() {
                    continue;
                }
                let path = save_avatar(
                    &ctx.config.upload_dir,
                    id,
                    &file_name,
                    content_type.as_deref(),
                    &bytes,
                )
                .await?;
                avatar = Some(path);
            }
            _ => {}
        }
    }

    let user = update_profile_in_db(&ctx.pool, id, bio, avatar)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    if let Some(categories) = preferences {
        set_preferences(&ctx.pool, id, &categories).await?;
    }
    let user = user_response(&ctx, user).await?;
    Ok(Json(UserWrapper::wrap_with_user_data(user)))
}
