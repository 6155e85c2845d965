//! Request handler definitions
//!
//! Define each route and its handler here. Payment handlers live in [`crate::payment_routes`].
//!
//! Handlers never block. Every database, identity provider or gateway call is awaited, so a worker thread keeps
//! serving other requests while one of them is in flight.
//!
//! Routes declared `where authenticated` are wrapped in [`crate::middleware::SessionAuthMiddlewareFactory`]. Their
//! handlers receive the caller's identity as `web::ReqData<VerifiedIdentity>` and must take the subject from there,
//! never from the request body.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use parley_engine::{
    db_types::VerifiedIdentity,
    traits::{AccountManagement, EntitlementManagement},
    AccountApi,
    AdmissionDecision,
    EntitlementApi,
};

use crate::{
    auth::SessionTokens,
    data_objects::{ChatAdmission, ChatStatus, GoogleLoginRequest, LoginResponse},
    errors::ServerError,
    integrations::google::{AssertionVerifier, VerificationKeys},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where authenticated) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::SessionAuthMiddlewareFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(google_login => Post "/auth/google" impl AccountManagement, VerificationKeys);
/// Route handler for Google sign-in.
///
/// The client posts the ID token it received from Google as `token` (or `credential`). If the token verifies, the user
/// record is created or refreshed and a session token is issued. The session token must be sent as a bearer token to
/// every authenticated endpoint.
pub async fn google_login<B, K>(
    body: web::Json<GoogleLoginRequest>,
    verifier: web::Data<AssertionVerifier<K>>,
    accounts: web::Data<AccountApi<B>>,
    tokens: web::Data<SessionTokens>,
) -> Result<HttpResponse, ServerError>
where
    B: AccountManagement,
    K: VerificationKeys,
{
    trace!("💻️ Received Google sign-in request");
    let identity = verifier.verify(&body.token).await?;
    accounts.record_login(&identity).await?;
    let user = accounts.account_for(&identity.external_id).await?.ok_or_else(|| {
        ServerError::BackendError(format!("The account for {identity} was not found right after it was saved"))
    })?;
    let session = tokens.issue(&identity).map_err(|e| ServerError::CouldNotSerializeAccessToken(e.to_string()))?;
    info!("💻️ {identity} signed in. Session expires at {}", session.expires_at);
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: session.access_token,
        token_type: "bearer".to_string(),
        expires_at: session.expires_at,
        user,
    }))
}

//----------------------------------------------   Account  ----------------------------------------------------
route!(me => Get "/me" impl AccountManagement where authenticated);
pub async fn me<B: AccountManagement>(
    identity: web::ReqData<VerifiedIdentity>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET /me for {}", identity.external_id);
    let account = api
        .account_for(&identity.external_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No account exists for {}", identity.external_id)))?;
    Ok(HttpResponse::Ok().json(account))
}

//----------------------------------------------   Chat  ----------------------------------------------------
route!(chat_status => Get "/chat/status" impl EntitlementManagement where authenticated);
pub async fn chat_status<B: EntitlementManagement>(
    identity: web::ReqData<VerifiedIdentity>,
    api: web::Data<EntitlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET /chat/status for {}", identity.external_id);
    let state = api.entitlement_for(&identity.external_id).await?;
    Ok(HttpResponse::Ok().json(ChatStatus::from(state)))
}

route!(chat_admit => Post "/chat/admit" impl EntitlementManagement where authenticated);
/// The entitlement gate. A chat service calls this before answering a message on the user's behalf.
///
/// Non-premium users spend one free chat per successful call. When none are left, the call fails with a 403 and a body
/// telling the client that an upgrade is required.
pub async fn chat_admit<B: EntitlementManagement>(
    identity: web::ReqData<VerifiedIdentity>,
    api: web::Data<EntitlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST /chat/admit for {}", identity.external_id);
    match api.admit_chat(&identity.external_id).await? {
        AdmissionDecision::Admitted { is_premium, remaining_chats } => {
            Ok(HttpResponse::Ok().json(ChatAdmission { admitted: true, is_premium, remaining_chats }))
        },
        AdmissionDecision::Rejected(quota) => Err(ServerError::QuotaExceeded(quota)),
    }
}
