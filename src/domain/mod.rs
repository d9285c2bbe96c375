/// Domain types: the user record, roles and the authorization policy.

mod policy;
mod user;

pub use policy::{authorize, Permission};
pub use user::{Role, User, UserProfile};
