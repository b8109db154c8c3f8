use std::collections::HashSet;

use ember_config::CONFIG;
use ember_protocol::client::CGmAuthResult;
use parking_lot::Mutex;

use crate::net::SessionId;

/// Connections that have presented the shared GM password. Keyed by
/// session, so a character switch keeps the authorization and a
/// disconnect drops it.
#[derive(Default)]
pub struct GmSessions {
    members: Mutex<HashSet<SessionId>>,
}

impl GmSessions {
    pub fn authenticate(&self, session: SessionId, password: &str) -> CGmAuthResult {
        let Some(expected) = CONFIG.gm_password.as_deref() else {
            return CGmAuthResult {
                success: false,
                message: Some("GM system not configured".into()),
            };
        };
        if password == expected {
            self.members.lock().insert(session);
            log::info!("gm session authenticated: {session}");
            CGmAuthResult {
                success: true,
                message: None,
            }
        } else {
            log::warn!("gm auth failure from {session}");
            CGmAuthResult {
                success: false,
                message: Some("Invalid password".into()),
            }
        }
    }

    pub fn is_gm(&self, session: SessionId) -> bool {
        self.members.lock().contains(&session)
    }

    pub fn drop_session(&self, session: SessionId) {
        self.members.lock().remove(&session);
    }

    #[cfg(test)]
    pub fn force_insert(&self, session: SessionId) {
        self.members.lock().insert(session);
    }
}
