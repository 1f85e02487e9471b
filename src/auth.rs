use actix_identity::{Identity, IdentityExt};
use actix_session::{Session, SessionExt};
use actix_utils::future::{ready, Ready};
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};

use crate::{
    db,
    errors::AppError,
    structs::{Role, User},
    utils, AppState,
};

const USERNAME_KEY: &str = "username";
const ROLE_KEY: &str = "role";

/// The authenticated requester, pulled out of the identity cookie and the
/// session. Extraction fails with [`AppError::AuthRequired`], which answers
/// with a redirect to the login form.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthedUser {
    fn from_http_request(req: &HttpRequest) -> Result<AuthedUser, AppError> {
        let identity = req.get_identity().map_err(|_| AppError::AuthRequired)?;
        let id = identity
            .id()
            .map_err(|_| AppError::AuthRequired)?
            .parse::<i64>()
            .map_err(|_| AppError::AuthRequired)?;

        let session = req.get_session();
        let username = session
            .get::<String>(USERNAME_KEY)
            .map_err(|e| AppError::Session(e.to_string()))?
            .ok_or(AppError::AuthRequired)?;
        let role = session
            .get::<Role>(ROLE_KEY)
            .map_err(|e| AppError::Session(e.to_string()))?
            .ok_or(AppError::AuthRequired)?;

        Ok(AuthedUser { id, username, role })
    }
}

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = Ready<Result<AuthedUser, AppError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(AuthedUser::from_http_request(req))
    }
}

/// Admin-gated requester. Anonymous callers are sent to the login form
/// first; authenticated non-admins get a 403 and no redirect.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthedUser);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<AdminUser, AppError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(AuthedUser::from_http_request(req).and_then(|user| {
            if user.role.is_admin() {
                Ok(AdminUser(user))
            } else {
                Err(AppError::Forbidden)
            }
        }))
    }
}

/// Looks the user up and checks the password. Unknown usernames and wrong
/// passwords are indistinguishable to the caller.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = db::find_user_by_username(state, username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    if !utils::verify_password(password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

/// Records a successful login: the user id on the identity, username and
/// role on the session.
pub fn start_session(req: &HttpRequest, user: &User) -> Result<(), AppError> {
    Identity::login(&req.extensions(), user.id.to_string())
        .map_err(|e| AppError::Session(e.to_string()))?;
    let session = req.get_session();
    session
        .insert(USERNAME_KEY, &user.username)
        .map_err(|e| AppError::Session(e.to_string()))?;
    session
        .insert(ROLE_KEY, user.role)
        .map_err(|e| AppError::Session(e.to_string()))?;
    Ok(())
}

/// Drops the login state and everything else held on the session. Harmless
/// for anonymous callers.
pub fn end_session(identity: Option<Identity>, session: &Session) {
    if let Some(identity) = identity {
        identity.logout();
    }
    session.purge();
}
