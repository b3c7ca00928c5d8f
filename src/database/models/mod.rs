pub mod audit;
pub mod invitation;
pub mod organization;
pub mod profile;
pub mod reservation;
pub mod subscription;
pub mod team_settings;
pub mod tenant;

pub use audit::SecurityEvent;
pub use invitation::{InvitationStatus, NewInvitation, PendingInvitation};
pub use organization::Organization;
pub use profile::UserProfile;
pub use reservation::SubdomainReservation;
pub use subscription::{Subscription, SubscriptionTier, TierLimits, TierName};
pub use team_settings::{TeamSettings, TeamSettingsPatch};
pub use tenant::{NewTenant, Tenant};
