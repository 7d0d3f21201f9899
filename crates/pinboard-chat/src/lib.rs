pub mod connection;
pub mod presence;
pub mod router;
pub mod session;
pub mod store;
pub mod verify;

use std::sync::Arc;

use pinboard_db::Database;

use crate::presence::PresenceTable;
use crate::router::Router;
use crate::store::MessageStore;
use crate::verify::TokenVerifier;

/// Shared dependencies handed to every chat session. Cloned per connection;
/// all members are handles onto process-wide state.
#[derive(Clone)]
pub struct ChatState {
    pub verifier: Arc<TokenVerifier>,
    pub presence: PresenceTable,
    pub store: MessageStore,
    pub router: Router,
    pub db: Arc<Database>,
}

impl ChatState {
    pub fn new(db: Arc<Database>, jwt_secret: &str) -> Self {
        let presence = PresenceTable::new();
        Self {
            verifier: Arc::new(TokenVerifier::new(jwt_secret)),
            router: Router::new(presence.clone()),
            store: MessageStore::new(db.clone()),
            presence,
            db,
        }
    }
}
