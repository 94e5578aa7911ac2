//! Single-pass reconciler
//!
//! The Reconciler is responsible for:
//! - Asking the IpDetector for the current public addresses
//! - Asking the RecordResolver for the published addresses
//! - Diffing both and issuing the minimal create/update/delete calls
//!   through the ProviderClient
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────────┐
//! │ IpDetector  │     │ RecordResolver │
//! └─────────────┘     └────────────────┘
//!        │ PublicAddress        │ ResolvedAddress
//!        └──────────┬───────────┘
//!                   ▼
//!           ┌──────────────┐
//!           │  Reconciler  │──── ReconcileEvent ───▶ observer
//!           └──────────────┘
//!                   │ create / update / delete
//!                   ▼
//!           ┌────────────────┐
//!           │ ProviderClient │
//!           └────────────────┘
//! ```
//!
//! ## Pass
//!
//! 1. Disabled configuration: no-op
//! 2. Compare current and published address per family
//! 3. Both match: no-op ("unchanged")
//! 4. Otherwise evaluate, in this order, the independent sub-actions
//!    create AAAA, create A, delete AAAA, update A, update AAAA
//!
//! Sub-actions are best-effort and never rolled back. A structured API
//! rejection abandons only the sub-action that hit it; any other failure
//! aborts the pass.

use std::fmt;
use std::net::IpAddr;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, trace, warn};

use crate::config::ReconcileConfig;
use crate::error::{Error, Result};
use crate::traits::{
    IpDetector, ProviderClient, PublicAddress, RecordId, RecordResolver, RecordStatus,
    RecordType, ResolvedAddress,
};

/// Capacity of the event channel handed to observers
///
/// A pass emits a bounded number of events; this leaves ample headroom.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What a sub-action does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        })
    }
}

impl ActionKind {
    /// Whether finding no target record is routine for this kind
    pub fn tolerates_missing_record(self) -> bool {
        matches!(self, ActionKind::Delete)
    }
}

/// A single create/update/delete decided by [`plan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    /// Create, update or delete
    pub kind: ActionKind,
    /// A or AAAA
    pub record_type: RecordType,
    /// Value to write (None for deletes)
    pub value: Option<IpAddr>,
}

impl Action {
    /// Create a record with `value`
    pub fn create(value: IpAddr) -> Self {
        Self {
            kind: ActionKind::Create,
            record_type: RecordType::for_addr(&value),
            value: Some(value),
        }
    }

    /// Overwrite a record with `value`
    pub fn update(value: IpAddr) -> Self {
        Self {
            kind: ActionKind::Update,
            record_type: RecordType::for_addr(&value),
            value: Some(value),
        }
    }

    /// Delete the record of `record_type`
    pub fn delete(record_type: RecordType) -> Self {
        Self {
            kind: ActionKind::Delete,
            record_type,
            value: None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{} {} -> {}", self.kind, self.record_type, value),
            None => write!(f, "{} {}", self.kind, self.record_type),
        }
    }
}

/// How a sub-action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    /// The provider accepted the call (or it was logged in dry-run mode)
    Applied {
        /// Record the call touched
        id: RecordId,
    },
    /// Nothing to act on (e.g. no record id found)
    Skipped {
        reason: String,
    },
    /// The provider rejected the call; the pass went on
    Failed {
        code: String,
        message: String,
    },
}

/// A sub-action and how it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: Action,
    pub status: ActionStatus,
}

/// Overall result of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The configuration switch is off
    Disabled,
    /// Published records already match
    Unchanged,
    /// At least one sub-action was evaluated
    Reconciled,
}

/// Summary of a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub outcome: Outcome,
    pub actions: Vec<ActionReport>,
}

impl ReconcileReport {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            actions: Vec::new(),
        }
    }

    /// Number of sub-actions the provider accepted
    pub fn applied(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Applied { .. }))
    }

    /// Number of sub-actions the provider rejected
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Failed { .. }))
    }

    /// Number of sub-actions with nothing to act on
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ActionStatus::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&ActionStatus) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(&a.status)).count()
    }
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Pass started for a name
    Started { fqdn: String },

    /// Configuration switch is off, nothing done
    Disabled,

    /// Current public addresses learned
    AddressDetected { current: PublicAddress },

    /// Published addresses learned
    AddressResolved { resolved: ResolvedAddress },

    /// Lookup failed; treated as "nothing published"
    ResolutionFailed { fqdn: String, error: String },

    /// Published records already match
    Unchanged,

    /// Sub-action about to be sent to the provider
    ActionStarted { action: Action },

    /// Sub-action accepted by the provider
    ActionSucceeded { action: Action, id: RecordId },

    /// Sub-action had nothing to act on
    ActionSkipped { action: Action, reason: String },

    /// Sub-action failed
    ActionFailed { action: Action, error: String },

    /// Pass finished
    Finished { outcome: Outcome },
}

/// Decide the sub-actions for a pass.
///
/// Returns an empty list when both families match (empty on both sides
/// counts as a match). Otherwise the independent conditions are evaluated in
/// their fixed order; more than one may fire.
pub fn plan(
    config: &ReconcileConfig,
    current: &PublicAddress,
    resolved: &ResolvedAddress,
) -> Vec<Action> {
    let match_v4 = current.ipv4 == resolved.ipv4;
    let match_v6 = current.ipv6 == resolved.ipv6;
    let enable_ipv6 = config.dns.enable_ipv6;

    if match_v4 && match_v6 {
        return Vec::new();
    }

    let mut actions = Vec::new();

    // create AAAA
    if resolved.ipv6.is_none()
        && let Some(v6) = current.ipv6
        && enable_ipv6
    {
        actions.push(Action::create(IpAddr::V6(v6)));
    }

    // create A
    if resolved.ipv4.is_none()
        && let Some(v4) = current.ipv4
    {
        actions.push(Action::create(IpAddr::V4(v4)));
    }

    // delete AAAA
    if !enable_ipv6 || (resolved.ipv6.is_some() && current.ipv6.is_none()) {
        actions.push(Action::delete(RecordType::Aaaa));
    }

    // update A
    if !match_v4
        && resolved.ipv4.is_some()
        && let Some(v4) = current.ipv4
    {
        actions.push(Action::update(IpAddr::V4(v4)));
    }

    // update AAAA
    if !match_v6
        && let Some(v6) = current.ipv6
        && enable_ipv6
    {
        actions.push(Action::update(IpAddr::V6(v6)));
    }

    actions
}

/// Single-pass DDNS reconciler
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`], keep the event receiver if needed
/// 2. Call [`Reconciler::run()`] once per scheduled invocation
/// 3. Drop
///
/// No state survives the pass: running twice with unchanged external state
/// is a no-op the second time.
pub struct Reconciler {
    /// Provider client for record CRUD
    provider: Box<dyn ProviderClient>,

    /// Immutable configuration for this run
    config: ReconcileConfig,

    /// Event sender for external observers
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// every decision and action of a pass
    pub fn new(
        provider: Box<dyn ProviderClient>,
        config: ReconcileConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let reconciler = Self {
            provider,
            config,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Run one full pass: detect, resolve, reconcile
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileReport)`: pass completed (sub-actions may have been rejected)
    /// - `Err(Error::Network)`: current addresses could not be detected
    /// - `Err(Error::Transport)` (or other): a sub-action hit a fatal error
    pub async fn run(
        &self,
        detector: &dyn IpDetector,
        resolver: &dyn RecordResolver,
    ) -> Result<ReconcileReport> {
        if !self.config.enable {
            return Ok(self.disabled());
        }

        let fqdn = self.config.fqdn();
        self.emit_event(ReconcileEvent::Started { fqdn: fqdn.clone() });

        let current = detector.detect().await?;
        info!("Current public address: {}", current);
        self.emit_event(ReconcileEvent::AddressDetected { current });

        let resolved = match resolver
            .resolve(&self.config.dns.domain, &self.config.dns.subdomain)
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                // Indistinguishable from "no record" downstream
                warn!("Resolving {} failed, assuming no record: {}", fqdn, e);
                self.emit_event(ReconcileEvent::ResolutionFailed {
                    fqdn: fqdn.clone(),
                    error: e.to_string(),
                });
                ResolvedAddress::empty()
            }
        };
        info!("Published address of {}: {}", fqdn, resolved);
        self.emit_event(ReconcileEvent::AddressResolved { resolved });

        self.reconcile(current, resolved).await
    }

    /// Diff current against published state and act on the difference
    pub async fn reconcile(
        &self,
        current: PublicAddress,
        resolved: ResolvedAddress,
    ) -> Result<ReconcileReport> {
        if !self.config.enable {
            return Ok(self.disabled());
        }

        debug!(
            "match_v4={} match_v6={}",
            current.ipv4 == resolved.ipv4,
            current.ipv6 == resolved.ipv6
        );

        let actions = plan(&self.config, &current, &resolved);
        if actions.is_empty() {
            info!("{} unchanged", self.config.fqdn());
            self.emit_event(ReconcileEvent::Unchanged);
            self.emit_event(ReconcileEvent::Finished {
                outcome: Outcome::Unchanged,
            });
            return Ok(ReconcileReport::new(Outcome::Unchanged));
        }

        let mut report = ReconcileReport::new(Outcome::Reconciled);
        for action in actions {
            self.emit_event(ReconcileEvent::ActionStarted { action });

            let status = match self.execute(action).await {
                Ok(status) => status,
                Err(e) if e.is_api_rejection() => {
                    warn!("{} rejected by {}: {}", action, self.provider.provider_name(), e);
                    self.emit_event(ReconcileEvent::ActionFailed {
                        action,
                        error: e.to_string(),
                    });
                    match e {
                        Error::ProviderApi { code, message } => {
                            ActionStatus::Failed { code, message }
                        }
                        other => ActionStatus::Failed {
                            code: String::new(),
                            message: other.to_string(),
                        },
                    }
                }
                Err(e) => {
                    error!("{} failed, aborting pass: {}", action, e);
                    self.emit_event(ReconcileEvent::ActionFailed {
                        action,
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };

            match &status {
                ActionStatus::Applied { id } => {
                    info!("{} applied (record {})", action, id);
                    self.emit_event(ReconcileEvent::ActionSucceeded { action, id: *id });
                }
                ActionStatus::Skipped { reason } => {
                    if action.kind.tolerates_missing_record() {
                        info!("{} skipped: {}", action, reason);
                    } else {
                        warn!("{} skipped: {}", action, reason);
                    }
                    self.emit_event(ReconcileEvent::ActionSkipped {
                        action,
                        reason: reason.clone(),
                    });
                }
                ActionStatus::Failed { .. } => {}
            }

            report.actions.push(ActionReport { action, status });
        }

        info!(
            "{} reconciled: {} applied, {} skipped, {} rejected",
            self.config.fqdn(),
            report.applied(),
            report.skipped(),
            report.failed()
        );
        self.emit_event(ReconcileEvent::Finished {
            outcome: Outcome::Reconciled,
        });

        Ok(report)
    }

    /// Send one sub-action to the provider
    async fn execute(&self, action: Action) -> Result<ActionStatus> {
        let domain = self.config.dns.domain.as_str();
        let subdomain = self.config.dns.subdomain.as_str();

        match (action.kind, action.value) {
            (ActionKind::Create, Some(value)) => {
                info!("Creating {} record {} -> {}", action.record_type, self.config.fqdn(), value);
                let id = self
                    .provider
                    .create_record(domain, subdomain, action.record_type, value)
                    .await?;
                Ok(ActionStatus::Applied { id })
            }
            (ActionKind::Update, Some(value)) => {
                let Some(id) = self.lookup_record_id(action.record_type).await? else {
                    return Ok(self.no_record(action.record_type));
                };
                info!(
                    "Updating {} record {} ({}) -> {}",
                    action.record_type,
                    self.config.fqdn(),
                    id,
                    value
                );
                self.provider
                    .update_record(
                        domain,
                        subdomain,
                        action.record_type,
                        value,
                        id,
                        RecordStatus::Enable,
                    )
                    .await?;
                Ok(ActionStatus::Applied { id })
            }
            (ActionKind::Delete, _) => {
                // No id means nothing to delete; never send a sentinel id
                let Some(id) = self.lookup_record_id(action.record_type).await? else {
                    return Ok(self.no_record(action.record_type));
                };
                info!("Deleting {} record {} ({})", action.record_type, self.config.fqdn(), id);
                self.provider.delete_record(domain, id).await?;
                Ok(ActionStatus::Applied { id })
            }
            (kind, None) => Err(Error::Other(format!(
                "{} {} planned without a value",
                kind, action.record_type
            ))),
        }
    }

    /// Fetch the record list and pick the id for the managed name
    async fn lookup_record_id(&self, record_type: RecordType) -> Result<Option<RecordId>> {
        let records = self.provider.list_records(&self.config.dns.domain).await?;
        let id = self
            .provider
            .find_record_id(&records, &self.config.dns.subdomain, record_type);
        debug!(
            "{} {} record id: {:?} ({} records listed)",
            self.config.fqdn(),
            record_type,
            id,
            records.len()
        );
        Ok(id)
    }

    fn no_record(&self, record_type: RecordType) -> ActionStatus {
        ActionStatus::Skipped {
            reason: format!("no {} record found for {}", record_type, self.config.fqdn()),
        }
    }

    fn disabled(&self) -> ReconcileReport {
        info!("Reconcile disabled by configuration, nothing to do");
        self.emit_event(ReconcileEvent::Disabled);
        self.emit_event(ReconcileEvent::Finished {
            outcome: Outcome::Disabled,
        });
        ReconcileReport::new(Outcome::Disabled)
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Is the observer draining its receiver?");
            }
            // Nobody is listening; logs still carry the information
            Err(TrySendError::Closed(event)) => {
                trace!("Event receiver dropped: {:?}", event);
            }
        }
    }
}
