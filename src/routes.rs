use actix_identity::Identity;
use actix_session::Session;
use actix_web::{
    get,
    http::StatusCode,
    post,
    web::{self, Data},
    HttpRequest, HttpResponse, Responder,
};
use serde::Deserialize;
use tera::Context;

use crate::{
    api,
    auth::{self, AuthedUser},
    db,
    errors::AppError,
    structs::Role,
    utils, AppState, TEMPLATES,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index_handler)
        .service(login_handler)
        .service(login_form_handler)
        .service(logout_handler)
        .service(register_handler)
        .service(register_form_handler)
        .service(inventory_handler)
        .service(inventory_add_handler)
        .service(password_handler)
        .service(password_form_handler)
        .service(api::list_handler)
        .service(api::create_handler)
        .service(api::update_handler)
        .service(api::delete_handler);
}

fn render_page(
    name: &str,
    context: &Context,
    status: StatusCode,
) -> Result<HttpResponse, AppError> {
    let rendered = TEMPLATES.render(name, context).map_err(|e| {
        log::error!("Failed to render template {}: {}", name, e);
        AppError::Template(e)
    })?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

fn page_context(title: &str, user: &AuthedUser) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("username", &user.username);
    context.insert("role", &user.role);
    context
}

#[get("/")]
pub async fn index_handler(user: AuthedUser) -> Result<impl Responder, AppError> {
    let mut context = page_context("Home", &user);
    context.insert("version", env!("CARGO_PKG_VERSION"));
    render_page("home.html", &context, StatusCode::OK)
}

#[get("/login")]
pub async fn login_handler() -> Result<impl Responder, AppError> {
    let mut context = Context::new();
    context.insert("title", "Login");
    render_page("login.html", &context, StatusCode::OK)
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[post("/login")]
pub async fn login_form_handler(
    web::Form(form): web::Form<LoginForm>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    match auth::authenticate(&state, &form.username, &form.password).await {
        Ok(user) => {
            auth::start_session(&request, &user)?;
            log::info!("User {} logged in", user.username);
            Ok(HttpResponse::SeeOther()
                .append_header(("Location", "/"))
                .finish())
        }
        Err(AppError::InvalidCredentials) => {
            let mut context = Context::new();
            context.insert("title", "Login");
            context.insert("error", "Invalid credentials");
            render_page("login.html", &context, StatusCode::UNAUTHORIZED)
        }
        Err(e) => Err(e),
    }
}

#[get("/logout")]
pub async fn logout_handler(identity: Option<Identity>, session: Session) -> impl Responder {
    auth::end_session(identity, &session);
    HttpResponse::SeeOther()
        .append_header(("Location", "/login"))
        .finish()
}

#[get("/register")]
pub async fn register_handler() -> Result<impl Responder, AppError> {
    let mut context = Context::new();
    context.insert("title", "Register");
    render_page("register.html", &context, StatusCode::OK)
}

#[derive(Deserialize)]
pub struct RegisterForm {
    username: String,
    password: String,
    role: Option<String>,
}

#[post("/register")]
pub async fn register_form_handler(
    web::Form(form): web::Form<RegisterForm>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let mut context = Context::new();
    context.insert("title", "Register");

    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        context.insert("error", "Username and password are required");
        return render_page("register.html", &context, StatusCode::BAD_REQUEST);
    }

    let role = Role::from_input(form.role.as_deref());
    let password_hash = utils::hash_password(&form.password)?;

    match db::create_user(&state, username, &password_hash, role).await {
        Ok(_) => Ok(HttpResponse::SeeOther()
            .append_header(("Location", "/login"))
            .finish()),
        Err(AppError::DuplicateUsername) => {
            context.insert("error", "Username already exists");
            render_page("register.html", &context, StatusCode::CONFLICT)
        }
        Err(e) => Err(e),
    }
}

#[get("/inventory")]
pub async fn inventory_handler(user: AuthedUser) -> Result<impl Responder, AppError> {
    let context = page_context("Inventory", &user);
    render_page("inventory.html", &context, StatusCode::OK)
}

#[get("/inventory-add")]
pub async fn inventory_add_handler(user: AuthedUser) -> Result<impl Responder, AppError> {
    let context = page_context("Add item", &user);
    render_page("inventory_add.html", &context, StatusCode::OK)
}

#[get("/password")]
pub async fn password_handler(user: AuthedUser) -> Result<impl Responder, AppError> {
    let context = page_context("Change password", &user);
    render_page("password.html", &context, StatusCode::OK)
}

#[derive(Deserialize)]
pub struct PasswordForm {
    old_password: String,
    password: String,
    password2: String,
}

#[post("/password")]
pub async fn password_form_handler(
    web::Form(form): web::Form<PasswordForm>,
    state: Data<AppState>,
    user: AuthedUser,
) -> Result<impl Responder, AppError> {
    let mut context = page_context("Change password", &user);

    if form.old_password.is_empty() || form.password.is_empty() || form.password2.is_empty() {
        context.insert("error", "All fields are required");
        return render_page("password.html", &context, StatusCode::BAD_REQUEST);
    }
    if form.password != form.password2 {
        context.insert("error", "Passwords do not match");
        return render_page("password.html", &context, StatusCode::BAD_REQUEST);
    }

    let stored = db::find_user_by_id(&state, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !utils::verify_password(&form.old_password, &stored.password_hash) {
        log::warn!("Old password verification failed for user {}", stored.id);
        context.insert("error", "Old password is incorrect");
        return render_page("password.html", &context, StatusCode::UNAUTHORIZED);
    }

    let new_hash = utils::hash_password(&form.password)?;
    db::update_user_password(&state, stored.id, &new_hash).await?;
    log::info!("Password changed for user {}", stored.id);

    Ok(HttpResponse::SeeOther()
        .append_header(("Location", "/"))
        .finish())
}
