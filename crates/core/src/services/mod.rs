//! Business logic services.

#![allow(missing_docs)]

pub mod authorization;
pub mod group;
pub mod group_request;

pub use authorization::{GroupPolicy, MasterPolicy};
pub use group::{
    CreateGroupInput, GroupDetail, GroupService, UpdateGroupInput, UserSummary,
};
pub use group_request::{GroupRequestDetail, GroupRequestService, GroupSummary};
