//! Built-in session kinds.

pub mod composer;
pub mod rps;

pub use composer::{Composer, ComposerAction, EmbedDraft, WebhookTarget};
pub use rps::{Choice, RockPaperScissors, RoundOutcome, RpsAction};

use panel_protocol::UserRef;

use crate::config::Config;
use crate::host::{SessionHost, SessionLauncher};

/// Register every enabled app with `host`.
pub fn install(mut host: SessionHost, config: &Config) -> SessionHost {
    if config.composer.enabled {
        host = host.with_factory(SessionLauncher::new(
            config.composer.trigger.clone(),
            config.composer.session_config(),
            |_: &UserRef| Composer::new(),
        ));
    }
    if config.rps.enabled {
        host = host.with_factory(SessionLauncher::new(
            config.rps.trigger.clone(),
            config.rps.session_config(),
            |_: &UserRef| RockPaperScissors::new(),
        ));
    }
    host
}
