//! One client session from connect to disconnect

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::config::Config;
use crate::game::{GameLoop, LoopPhase, WorldState};
use crate::net::NetworkClient;

/// How a session ended
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    /// At least one server message arrived
    pub received_state: bool,
    /// The world as the loop last saw it
    pub final_state: Option<WorldState>,
    /// Loop phase after the loop thread was joined
    pub loop_phase: LoopPhase,
}

/// Connects an agent to the server and runs the game loop until the
/// connection ends
pub struct Session<A> {
    config: Arc<Config>,
    agent: A,
}

impl<A> Session<A>
where
    A: Agent + Send + 'static,
{
    pub fn new(config: Config, agent: A) -> Self {
        Self {
            config: Arc::new(config),
            agent,
        }
    }

    /// Run until the server goes away or the process is asked to stop
    pub async fn run(self) -> anyhow::Result<SessionReport> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until the server goes away or `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        let client = NetworkClient::new(self.config.endpoint(), Handle::current());
        let signals = client.signals();

        let mut game_loop = GameLoop::new(
            &client,
            self.agent,
            self.config.game_config(),
            self.config.fps_log_interval,
        );
        let status = game_loop.status();

        info!(endpoint = client.endpoint(), fps = self.config.frames_per_second, "Connecting");
        client.start();

        // The loop busy-waits between frames, so it gets a blocking thread
        let mut loop_task = tokio::task::spawn_blocking(move || {
            game_loop.start();
            game_loop
        });

        tokio::pin!(shutdown);
        let game_loop = tokio::select! {
            finished = &mut loop_task => finished?,
            _ = &mut shutdown => {
                info!("Shutdown requested, disconnecting");
                client.stop();
                status.request_stop();
                loop_task.await?
            }
        };

        // Server-initiated endings leave our side to close
        client.stop();

        let report = SessionReport {
            received_state: signals.has_received(),
            final_state: game_loop.state().cloned(),
            loop_phase: status.phase(),
        };
        if !report.received_state {
            warn!(endpoint = client.endpoint(), "Session ended before any game state arrived");
        }
        info!("Session complete");
        Ok(report)
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, disconnecting");
        }
        _ = terminate => {
            info!("Received terminate signal, disconnecting");
        }
    }
}
