//! Database entities.

pub mod group;
pub mod group_member;
pub mod group_request;
pub mod user;

pub use group::Entity as Group;
pub use group_member::Entity as GroupMember;
pub use group_request::Entity as GroupRequest;
pub use user::Entity as User;
