use crate::error::AppResult;

/// Privileged account operations gated by the authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountAction {
    UpdateRole { target: i64 },
    DeleteUser { target: i64 },
}

/// Authorization seam for privileged operations. Each privileged service
/// function makes exactly one `authorize` call, so a real verified-identity
/// or claims check can replace `AllowAll` via `AppState` without touching
/// business logic.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, action: &AccountAction) -> AppResult<()>;
}

/// Pass-through gate: allows everything. This is a known gap, not a feature;
/// no real authentication backs it yet.
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _action: &AccountAction) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_permits_everything() {
        let gate = AllowAll;
        assert!(gate.authorize(&AccountAction::UpdateRole { target: 5 }).is_ok());
        assert!(gate.authorize(&AccountAction::DeleteUser { target: 5 }).is_ok());
    }

    #[test]
    fn deny_all_surfaces_forbidden() {
        use crate::error::AppError;

        struct DenyAll;
        impl Authorizer for DenyAll {
            fn authorize(&self, _action: &AccountAction) -> crate::error::AppResult<()> {
                Err(AppError::Forbidden("Not allowed.".into()))
            }
        }

        let err = DenyAll
            .authorize(&AccountAction::DeleteUser { target: 5 })
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
