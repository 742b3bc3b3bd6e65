//! Data transfer objects for API requests, responses and pushed events
//!
//! Request DTOs carry `validator` rules for shape checks; the services apply
//! the domain rules on top.

pub mod requests;
pub mod responses;

pub use requests::{
    AddMembersRequest, CreateGroupRequest, CreatePrivateRequest, RenameConversationRequest,
    SendMessageRequest,
};

pub use responses::{
    ConversationResponse, HealthChecks, HealthResponse, LeaveOutcome, MemberRemoveEvent,
    MessageDeleteEvent, MessagePage, MessageResponse, PrivateConversationResult,
    ReactionUpdateResponse, ReadReceiptResponse, ReadinessResponse,
};
