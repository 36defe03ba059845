use crate::domain::identity::GuestIdentity;
use crate::domain::ports::KeyValueStore;

pub const KEY_GUEST_ID: &str = "guest_id";

// Owns the persisted guest identifier. Storage failures fall back to an
// identifier that lives as long as this instance.
pub struct GuestIdentityStore<S> {
    store: S,
    cached: Option<GuestIdentity>,
}

impl<S> GuestIdentityStore<S>
where
    S: KeyValueStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cached: None,
        }
    }

    // Reads the identity without creating one.
    pub fn current(&mut self) -> Option<GuestIdentity> {
        if self.cached.is_none() {
            self.cached = self.load();
        }
        self.cached.clone()
    }

    // Returns the stored identity, creating and persisting one on first use.
    pub fn ensure(&mut self) -> GuestIdentity {
        if let Some(identity) = self.current() {
            return identity;
        }

        let identity = GuestIdentity::generate();
        if let Err(err) = self.store.set(KEY_GUEST_ID, identity.as_str()) {
            tracing::warn!(error = %err, "failed to persist guest id; using it for this session only");
        } else {
            tracing::info!(guest_id = %identity.as_str(), "created guest identity");
        }
        self.cached = Some(identity.clone());
        identity
    }

    // Forgets the guest once the user authenticates.
    pub fn clear(&mut self) {
        self.cached = None;
        if let Err(err) = self.store.remove(KEY_GUEST_ID) {
            tracing::warn!(error = %err, "failed to remove stored guest id");
        }
    }

    fn load(&self) -> Option<GuestIdentity> {
        match self.store.get(KEY_GUEST_ID) {
            Ok(Some(value)) => {
                let identity = GuestIdentity::parse(&value);
                if identity.is_none() {
                    tracing::warn!("stored guest id is malformed; issuing a new one");
                }
                identity
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read stored guest id");
                None
            }
        }
    }
}
