//! Shared application state handed to sessions and the host.

use std::sync::Arc;

use panel_protocol::Transport;

use crate::modal::ModalRouter;
use crate::session::SessionRegistry;

/// Everything a session needs from the outside world.
#[derive(Clone)]
pub struct AppContext {
    pub transport: Arc<dyn Transport>,
    pub sessions: SessionRegistry,
    pub modals: ModalRouter,
}

impl AppContext {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sessions: SessionRegistry::new(),
            modals: ModalRouter::new(),
        }
    }
}
