//! Authentication state trait.

use crate::identity::IdentityLookup;
use crate::session::SessionProtocol;

/// Trait for state types that expose the session protocol to extractors.
pub trait HasSession {
    type Identities: IdentityLookup;

    fn session(&self) -> &SessionProtocol<Self::Identities>;
}
