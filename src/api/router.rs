use super::handler;
use crate::application_port::TokenService;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    token_service: Arc<dyn TokenService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::post()
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(token_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(token_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(token_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::header::<String>("authorization"))
        .and(with(token_service.clone()))
        .and_then(handler::logout);

    let validate = warp::get()
        .and(warp::path("validate"))
        .and(warp::path::end())
        .and(warp::header::<String>("authorization"))
        .and(with(token_service.clone()))
        .and_then(handler::validate);

    warp::path("auth").and(register.or(login).or(refresh).or(logout).or(validate))
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
