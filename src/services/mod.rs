pub mod acting;
pub mod audit;
pub mod capability_service;
pub mod invitation_service;
pub mod invite_sender;
pub mod reservation_service;
pub mod session_service;
pub mod team_settings_service;
pub mod tier_service;

pub use acting::ActingContext;
pub use audit::AuditLog;
pub use capability_service::CapabilityService;
pub use invitation_service::{ApprovedInvitation, InvitationService};
pub use invite_sender::{HttpInviteSender, InviteError, InviteSender, LogInviteSender};
pub use reservation_service::{Availability, ReservationService};
pub use session_service::SessionService;
pub use team_settings_service::TeamSettingsService;
pub use tier_service::{TierInfo, TierService, UsageResource, UsageResult};
