//! # inbox-service
//!
//! Application layer: conversation and message use cases, request and
//! response DTOs, and the in-process presence registry and delivery router
//! that push events to connected participants.

pub mod dto;
pub mod realtime;
pub mod services;

pub use realtime::{ClientHandle, DeliveryRouter, EventKind, InboxEvent, PresenceRegistry};
pub use services::{
    ConversationService, MessageService, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult,
};
