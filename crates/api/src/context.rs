use pharmadis_core::ActorId;

/// Actor context for a request.
///
/// The authentication layer in front of this API resolves the session and
/// passes the acting staff identity down; every mutating route requires it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor_id: ActorId,
}

impl ActorContext {
    pub fn new(actor_id: ActorId) -> Self {
        Self { actor_id }
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }
}
