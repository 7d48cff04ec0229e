//! Authorization seam for group management.

use tavern_db::entities::group;

/// Decides whether an actor may manage a group (delete it, resolve its
/// membership). Injected into the services so the rule is evaluated at the
/// start of each operation instead of hiding in a global hook.
pub trait GroupPolicy: Send + Sync {
    /// Whether `actor_id` may manage `group`.
    fn can_manage(&self, actor_id: &str, group: &group::Model) -> bool;
}

/// Default policy: only the group's master manages it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MasterPolicy;

impl GroupPolicy for MasterPolicy {
    fn can_manage(&self, actor_id: &str, group: &group::Model) -> bool {
        group.master_id == actor_id
    }
}
