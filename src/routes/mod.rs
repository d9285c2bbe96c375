mod admin;
mod auth;
mod health_check;

pub use admin::get_user;
pub use auth::{
    change_password, forgot_password, login, logout, me, refresh, register, reset_password,
};
pub use health_check::health_check;
