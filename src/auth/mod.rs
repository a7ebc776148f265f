//! Authentication and session management

pub mod clock;
pub mod error;
pub mod jwt;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod password;
pub mod redis_store;
pub mod session;
pub mod store;
pub mod users;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AuthError;
pub use jwt::{Claims, IssuedToken, TokenService};
pub use keys::{JsonWebKey, JsonWebKeySet};
pub use middleware::GateState;
pub use models::{
    AuthorizationContext, LoginRequest, LoginResponse, Role, SessionRecord, SubjectProfile,
    SubscriptionStatus, UserRecord,
};
pub use redis_store::RedisSessionStore;
pub use session::{AuthService, SessionManager};
pub use store::{MemorySessionStore, SessionStore, SessionStoreError, StoredSession};
pub use users::{DirectoryError, PostgresUserDirectory, StaticUserDirectory, UserDirectory};
