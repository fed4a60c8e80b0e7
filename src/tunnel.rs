//! Tunnel Provisioning Flow
//!
//! Drives the tunnel panel through provisioning:
//! - **Idle**: form ready
//! - **Submitting**: waiting on the backend (tunnel + DNS creation, slow)
//! - **Success**: tunnel live, redirect to the public URL scheduled
//! - **Error**: provider message shown, form kept for correction
//!
//! The redirect after success is a spawned timer owned by
//! [`ScheduledNavigation`]; tearing the flow down aborts it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ControlPlane;
use crate::config::DEFAULT_REDIRECT_DELAY;
use crate::dashboard::SharedDashboard;
use crate::error::{ConsoleError, Result};
use crate::models::TunnelConfig;
use crate::navigator::{Destination, Navigator};
use crate::session::SessionStore;

const TUNNEL_SETUP_FAILED: &str = "Tunnel setup failed";

/// Flow states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelState {
    Idle,
    Submitting,
    Success { public_url: String },
    Error { message: String },
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelEvent {
    Submit,
    Succeeded { public_url: String },
    Failed { message: String },
}

impl TunnelState {
    pub fn name(&self) -> &'static str {
        match self {
            TunnelState::Idle => "idle",
            TunnelState::Submitting => "submitting",
            TunnelState::Success { .. } => "success",
            TunnelState::Error { .. } => "error",
        }
    }

    /// Whether a submit is accepted from this state
    pub fn can_submit(&self) -> bool {
        matches!(self, TunnelState::Idle | TunnelState::Error { .. })
    }

    /// Pure transition function; `None` when the event is not accepted
    pub fn on_event(&self, event: TunnelEvent) -> Option<TunnelState> {
        match (self, event) {
            (TunnelState::Idle | TunnelState::Error { .. }, TunnelEvent::Submit) => {
                Some(TunnelState::Submitting)
            }
            (TunnelState::Submitting, TunnelEvent::Succeeded { public_url }) => {
                Some(TunnelState::Success { public_url })
            }
            (TunnelState::Submitting, TunnelEvent::Failed { message }) => {
                Some(TunnelState::Error { message })
            }
            _ => None,
        }
    }

    /// Confirmation or error line for the panel
    pub fn message(&self) -> Option<String> {
        match self {
            TunnelState::Success { public_url } => {
                Some(format!("Tunnel live at {public_url}, redirecting…"))
            }
            TunnelState::Error { message } => Some(message.clone()),
            _ => None,
        }
    }
}

/// A navigation that fires once after a delay unless cancelled
///
/// Dropping it cancels the navigation.
pub struct ScheduledNavigation {
    handle: JoinHandle<()>,
    destination: Destination,
    fired: Arc<AtomicBool>,
}

impl ScheduledNavigation {
    /// Spawn the timer on the current Tokio runtime
    pub fn schedule(navigator: Arc<dyn Navigator>, destination: Destination, delay: Duration) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let task_fired = Arc::clone(&fired);
        let task_destination = destination.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task_fired.store(true, Ordering::SeqCst);
            info!(destination = %task_destination, "Scheduled navigation firing");
            navigator.navigate(task_destination);
        });

        debug!(%destination, delay_ms = delay.as_millis() as u64, "Navigation scheduled");
        Self {
            handle,
            destination,
            fired,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Still waiting to fire
    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Abort the timer. Returns true if the navigation had not fired yet.
    pub fn cancel(&self) -> bool {
        let pending = !self.has_fired();
        self.handle.abort();
        if pending {
            debug!(destination = %self.destination, "Scheduled navigation cancelled");
        }
        pending
    }

    /// Wait until the navigation has fired (or was cancelled)
    pub async fn wait(mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for ScheduledNavigation {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Tunnel panel state machine
pub struct TunnelProvisioningFlow {
    api: Arc<dyn ControlPlane>,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    view: SharedDashboard,
    redirect_delay: Duration,
    state: watch::Sender<TunnelState>,
    form: Option<TunnelConfig>,
    redirect: Option<ScheduledNavigation>,
}

impl TunnelProvisioningFlow {
    pub fn new(
        api: Arc<dyn ControlPlane>,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        view: SharedDashboard,
    ) -> Self {
        let (state, _) = watch::channel(TunnelState::Idle);
        Self {
            api,
            session,
            navigator,
            view,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            state,
            form: None,
            redirect: None,
        }
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn state(&self) -> TunnelState {
        self.state.borrow().clone()
    }

    /// Observe state changes (e.g. to render "Submitting…" while waiting)
    pub fn subscribe(&self) -> watch::Receiver<TunnelState> {
        self.state.subscribe()
    }

    /// Last submitted input; kept after errors for correction
    pub fn form(&self) -> Option<&TunnelConfig> {
        self.form.as_ref()
    }

    pub fn pending_redirect(&self) -> Option<&ScheduledNavigation> {
        self.redirect.as_ref()
    }

    /// Hand the scheduled redirect to the caller (e.g. a host that waits for it)
    pub fn take_redirect(&mut self) -> Option<ScheduledNavigation> {
        self.redirect.take()
    }

    fn apply(&self, event: TunnelEvent) -> Result<()> {
        let current = self.state();
        let next = current
            .on_event(event)
            .ok_or(ConsoleError::InvalidState(current.name()))?;
        debug!("Tunnel flow: {} -> {}", current.name(), next.name());
        self.state.send_replace(next);
        Ok(())
    }

    /// Submit provisioning credentials.
    ///
    /// Local checks (state, fields, session token) run before any network
    /// call and leave the state untouched when they fail.
    pub async fn submit(&mut self, config: TunnelConfig) -> Result<String> {
        let current = self.state();
        if !current.can_submit() {
            return Err(ConsoleError::InvalidState(current.name()));
        }

        self.form = Some(config.clone());
        validate(&config)?;

        let token = self
            .session
            .token()
            .filter(|t| !t.is_empty())
            .ok_or(ConsoleError::NotAuthenticated)?;

        self.apply(TunnelEvent::Submit)?;
        info!(domain = %config.domain, subdomain = %config.subdomain, "Provisioning tunnel");

        match self.api.setup_tunnel(&token, &config).await {
            Ok(response) => {
                let public_url = response.public_url;
                self.view.write().record_provisioned_tunnel(&public_url);
                self.apply(TunnelEvent::Succeeded {
                    public_url: public_url.clone(),
                })?;
                info!(%public_url, "Tunnel provisioned");

                self.redirect = Some(ScheduledNavigation::schedule(
                    Arc::clone(&self.navigator),
                    Destination::External(public_url.clone()),
                    self.redirect_delay,
                ));
                Ok(public_url)
            }
            Err(e) => {
                warn!("Tunnel provisioning failed: {}", e);
                let message = e.detail_or(TUNNEL_SETUP_FAILED);
                self.apply(TunnelEvent::Failed {
                    message: message.clone(),
                })?;
                Err(ConsoleError::ProvisioningFailure(message))
            }
        }
    }

    /// Back to an empty Idle panel, cancelling any pending redirect
    pub fn reset(&mut self) {
        self.teardown();
        self.form = None;
        let previous = self.state.send_replace(TunnelState::Idle);
        if previous != TunnelState::Idle {
            debug!("Tunnel flow: {} -> idle (reset)", previous.name());
        }
    }

    /// View torn down: drop any pending redirect. Returns true if one was cancelled.
    pub fn teardown(&mut self) -> bool {
        self.redirect
            .take()
            .map(|redirect| redirect.cancel())
            .unwrap_or(false)
    }
}

fn validate(config: &TunnelConfig) -> Result<()> {
    if config.api_token.trim().is_empty() {
        return Err(ConsoleError::validation("api_token", "Required"));
    }
    if config.domain.trim().is_empty() {
        return Err(ConsoleError::validation("domain", "Required"));
    }
    if config.subdomain.trim().is_empty() {
        return Err(ConsoleError::validation("subdomain", "Required"));
    }
    Ok(())
}
