use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

/// Client-correctable failures become a 400 with the service's message;
/// store and internal failures become an anonymous 500. The raw cause
/// goes to the log, never to the client.
#[derive(Debug)]
pub struct ApiRejection {
    pub status: StatusCode,
    pub message: String,
}

impl reject::Reject for ApiRejection {}

impl From<AuthError> for ApiRejection {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::UsernameTaken
            | AuthError::UserNotFoundOrDisabled
            | AuthError::InvalidPassword
            | AuthError::InvalidRefreshToken => ApiRejection {
                status: StatusCode::BAD_REQUEST,
                message: error.to_string(),
            },
            AuthError::TokenInvalid | AuthError::TokenExpired => ApiRejection {
                status: StatusCode::BAD_REQUEST,
                message: "Invalid token".to_string(),
            },
            AuthError::Store(e) | AuthError::InternalError(e) => {
                warn!("internal error: {}", e);
                ApiRejection {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal error".to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message) = if let Some(rejection) = err.find::<ApiRejection>() {
        (rejection.status, rejection.message.clone())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MissingHeader>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            "Missing required header".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        warn!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error".to_string(),
        )
    };

    let json = warp::reply::json(&ErrorBody { error: message });
    Ok(warp::reply::with_status(json, status))
}
