pub mod analytics;
pub mod auth;
pub mod auth_client;
pub mod collections;
pub mod domain;
pub mod guard;
pub mod ports;
pub mod session;
pub mod view;

pub use auth::{AuthError, SignInForm, SignUpForm, ValidationError};
pub use auth_client::{AuthClient, AuthEvent};
pub use collections::{CollectionError, CollectionStore};
pub use domain::{
    Collection, CollectionDraft, CollectionStatus, DashboardTab, ProviderSession, SortDirection,
    SortOption, User, UserMetadata, ViewMode,
};
pub use guard::{decide, GuardDecision, GuardState, Route};
pub use ports::{AuthorizationRequest, IdentityProvider, PortError, PortResult, SignUpOutcome};
pub use session::{SessionSnapshot, SessionStore, SignUpResult};
pub use view::{compose, DashboardView};
