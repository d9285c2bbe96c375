use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::{RateLimit, SessionMiddleware};
use crate::routes::{
    change_password, forgot_password, get_user, health_check, login, logout, me, refresh,
    register, reset_password,
};
use crate::security::{RateLimiter, SecurityHeaders};
use crate::user_store::UserRepository;

/// Build the HTTP server on an already bound listener.
///
/// The store is injected so tests can run against the in-memory repository.
pub fn run(
    listener: TcpListener,
    users: Arc<dyn UserRepository>,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let service = AuthService::new(users, &settings);
    let gate = service.gate().clone();
    let service = web::Data::new(service);
    let limiter = Arc::new(RateLimiter::new(&settings.rate_limit));

    tracing::info!(
        environment = %settings.application.environment,
        requests_per_minute = settings.rate_limit.requests_per_minute,
        "Building HTTP server"
    );

    let server = HttpServer::new(move || {
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            AppError::Validation(ValidationError::InvalidFormat(err.to_string())).into()
        });

        App::new()
            // Global middleware
            .wrap(SecurityHeaders::middleware())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(json_config)
            .app_data(service.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .wrap(RateLimit::new(limiter.clone()))
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/forgot-password", web::post().to(forgot_password))
                    .route("/reset-password", web::post().to(reset_password))
                    // Protected routes (require a live access token)
                    .service(
                        web::resource("/me")
                            .wrap(SessionMiddleware::new(gate.clone()))
                            .route(web::get().to(me)),
                    )
                    .service(
                        web::resource("/logout")
                            .wrap(SessionMiddleware::new(gate.clone()))
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/password")
                            .wrap(SessionMiddleware::new(gate.clone()))
                            .route(web::put().to(change_password)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .wrap(SessionMiddleware::new(gate.clone()))
                    .route("/users/{id}", web::get().to(get_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
