use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{extract_token, AuthError, AuthUser};
use crate::response::AppError;
use crate::state::AppState;

pub async fn require_auth(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let Some(verifier) = state.verifier() else {
        req.extensions_mut().insert(AuthUser::local());
        return next.run(req).await;
    };

    let Some(token) = extract_token(req.headers()) else {
        return AppError::from(AuthError::MissingToken).into_response();
    };

    match verifier.verify(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "bearer token rejected");
            AppError::from(err).into_response()
        }
    }
}

pub async fn optional_auth(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let Some(verifier) = state.verifier() else {
        req.extensions_mut().insert(AuthUser::local());
        return next.run(req).await;
    };

    if let Some(token) = extract_token(req.headers()) {
        if let Ok(user) = verifier.verify(&token).await {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}
