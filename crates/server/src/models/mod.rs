//! Domain models for the server.
//!
//! These types represent validated domain objects separate from database
//! row types and from the JSON shapes returned by the API.

pub mod analytics;
pub mod session;
pub mod user;

pub use analytics::{
    ActivityCounts, ActivitySummary, AnalyticsEvent, AnalyticsSummary, NewEvent, UserEventStats,
    UserStats, actions,
};
pub use session::{CurrentUser, keys};
pub use user::{NewUser, User, UserResponse};
