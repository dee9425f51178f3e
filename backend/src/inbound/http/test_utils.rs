//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, test as actix_test, web};
use serde_json::Value;

use crate::domain::{Error, UserId};
use crate::inbound::http::drafts::{load_draft, save_draft};
use crate::inbound::http::error::{json_config, query_config};
use crate::inbound::http::measurements::{replace_measurement_batch, update_measurement_field};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

pub(crate) const TEST_SESSION_COOKIE: &str = "session";
pub(crate) const TEST_LOGIN_PATH: &str = "/test-login/{user_id}";

/// Build a session middleware configured for tests.
///
/// Uses a fresh key per invocation and drops the `Secure` flag so cookies
/// survive plain-HTTP test requests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name(TEST_SESSION_COOKIE.to_owned())
        .cookie_secure(false)
        .build()
}

/// Session cookie set by `res`; panics when none was set.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    refreshed_session_cookie(res).expect("session cookie set")
}

/// Session cookie set by `res`, if the session changed.
pub fn refreshed_session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == TEST_SESSION_COOKIE)
        .map(Cookie::into_owned)
}

/// Stand-in for the external login layer: stores `user_id` in the session.
pub async fn test_login(
    session: SessionContext,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let user_id = UserId::new(user_id.into_inner())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    session.persist_user(user_id)?;
    Ok(HttpResponse::Ok().finish())
}

/// App exposing every `/api/v1` endpoint plus the test login route.
pub fn api_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_config())
        .app_data(query_config())
        .wrap(test_session_middleware())
        .route(TEST_LOGIN_PATH, web::get().to(test_login))
        .service(
            web::scope("/api/v1")
                .service(save_draft)
                .service(load_draft)
                .service(update_measurement_field)
                .service(replace_measurement_batch),
        )
}

/// Cookie jar replaying the session cookie across requests, as a browser would.
#[derive(Debug, Default)]
pub struct TestBrowser {
    cookie: Option<Cookie<'static>>,
}

impl TestBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `req` with the current session cookie and return the JSON reply.
    pub async fn send<S>(&mut self, app: &S, req: actix_test::TestRequest) -> (StatusCode, Value)
    where
        S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    {
        let req = match &self.cookie {
            Some(cookie) => req.cookie(cookie.clone()),
            None => req,
        };
        let res = actix_test::call_service(app, req.to_request()).await;
        if let Some(fresh) = refreshed_session_cookie(&res) {
            self.cookie = Some(fresh);
        }
        let status = res.status();
        let body = actix_test::read_body(res).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("JSON response body")
        };
        (status, json)
    }

    /// Log in as `user_id` through the test login route.
    pub async fn login<S>(&mut self, app: &S, user_id: i64)
    where
        S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    {
        let uri = TEST_LOGIN_PATH.replace("{user_id}", &user_id.to_string());
        let (status, _) = self.send(app, actix_test::TestRequest::get().uri(&uri)).await;
        assert_eq!(status, StatusCode::OK, "test login failed");
    }
}
