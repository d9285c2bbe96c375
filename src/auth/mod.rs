/// Authentication module
///
/// JWT issuance and verification, password hashing, password reset
/// tickets, the session gate and the flows built on top of them.

mod claims;
mod jwt;
mod password;
mod reset_token;
mod service;
mod session;

pub use claims::{Claims, TokenKind};
pub use jwt::{decode_token, issue_token, issue_token_pair, TokenPair};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use reset_token::{generate_reset_secret, hash_token, ResetTicket};
pub use service::{AuthService, AuthSession, ForgotPasswordOutcome};
pub use session::{bearer_token, AuthenticatedUser, SessionGate};
