use super::error::ApiRejection;
use crate::application_port::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reject;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: String,
}

/// Logout and validate take the raw header value and tolerate a missing
/// `Bearer ` prefix. The strict parse lives at the gateway; these two
/// endpoints accept what the original clients send.
fn strip_bearer(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header)
}

pub async fn register(
    body: RegisterRequest,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    token_service
        .register(RegisterInput {
            username: body.username,
            password: body.password,
            email: body.email,
        })
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&MessageBody {
        message: "User registered successfully".to_string(),
    }))
}

pub async fn login(
    body: LoginRequest,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pair = token_service
        .authenticate(LoginInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&pair))
}

pub async fn refresh(
    body: RefreshRequest,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pair = token_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&pair))
}

pub async fn logout(
    authorization: String,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    token_service
        .logout(strip_bearer(&authorization))
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply())
}

pub async fn validate(
    authorization: String,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let check = token_service
        .validate_access(strip_bearer(&authorization))
        .await;

    Ok(warp::reply::json(&check))
}
