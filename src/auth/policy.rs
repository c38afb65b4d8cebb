//! Authorization Policy
//! Mission: Decide whether a caller may act on an account
//!
//! Precedence: admin may do everything; owning the target account grants
//! `Update` and `Delete` on it and nothing else. An update may carry any
//! field, `role` included.

use crate::auth::models::{Account, Role};

/// Actions that need an authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
    ListAll,
}

/// Pure allow/deny decision. `target_id` is `None` for actions without a
/// single target account (`ListAll`).
pub fn can_act(caller: &Account, target_id: Option<&str>, action: Action) -> bool {
    if caller.role == Role::Admin {
        return true;
    }

    let is_self = target_id.is_some_and(|id| id == caller.id);
    match action {
        Action::Update | Action::Delete => is_self,
        Action::ListAll => false,
    }
}
