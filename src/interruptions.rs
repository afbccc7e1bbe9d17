//! System interruptions fed to the player as events.
//!
//! logind announces suspend with `PrepareForSleep(true)` and wake-up with
//! `PrepareForSleep(false)`. They map onto `Interruption::Began` and
//! `Interruption::Ended`.

use std::sync::mpsc::Sender;

use async_io::block_on;
use futures::StreamExt;
use tracing::{debug, info};
use zbus::{Connection, proxy};

use crate::player::{Interruption, PlayerCmd, PlayerEvent};

#[proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LoginManager {
    #[zbus(signal)]
    fn prepare_for_sleep(&self, start: bool) -> zbus::Result<()>;
}

fn interruption_for(sleep_starting: bool) -> Interruption {
    if sleep_starting {
        Interruption::Began
    } else {
        Interruption::Ended {
            should_resume: true,
        }
    }
}

async fn watch(tx: Sender<PlayerCmd>) -> zbus::Result<()> {
    let connection = Connection::system().await?;
    let manager = LoginManagerProxy::new(&connection).await?;
    let mut signals = manager.receive_prepare_for_sleep().await?;

    while let Some(signal) = signals.next().await {
        let starting = *signal.args()?.start();
        info!(starting, "system sleep transition");
        let event = PlayerEvent::Interruption(interruption_for(starting));
        if tx.send(event.into()).is_err() {
            break;
        }
    }
    Ok(())
}

/// Watch for suspend/resume on the system bus. Without logind this logs and
/// does nothing.
pub fn spawn_sleep_watch(tx: Sender<PlayerCmd>) {
    std::thread::spawn(move || {
        if let Err(e) = block_on(watch(tx)) {
            debug!("sleep notifications unavailable: {e}");
        }
    });
}
