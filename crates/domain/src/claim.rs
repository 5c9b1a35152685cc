//! Claim lifecycle types: attempt state machine, terminal outcomes, and the
//! claim request/response wire shapes.

use common::OfferId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cart::CartView;

/// Message shown when a claim fails and the server did not say why.
pub const GENERIC_CLAIM_FAILURE: &str = "Unable to claim offer";

/// Per-offer, per-session state of a claim attempt. Never persisted.
///
/// State transitions:
/// ```text
/// Idle ──► Claiming ──┬──► Succeeded ──────┐
///                     ├──► AlreadyClaimed ─┼──► Idle
///                     └──► Failed ─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ClaimAttemptState {
    /// No claim in flight.
    #[default]
    Idle,

    /// A claim request is in flight; further attempts are suppressed.
    Claiming,

    /// The server recorded the claim.
    Succeeded,

    /// The server already had a claim for this user.
    AlreadyClaimed,

    /// The attempt failed; the user may retry.
    Failed,
}

impl ClaimAttemptState {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimAttemptState::Idle => "Idle",
            ClaimAttemptState::Claiming => "Claiming",
            ClaimAttemptState::Succeeded => "Succeeded",
            ClaimAttemptState::AlreadyClaimed => "AlreadyClaimed",
            ClaimAttemptState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ClaimAttemptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a claim attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The request never produced an HTTP response.
    Network,

    /// The server answered with a non-success status or `success: false`.
    Server {
        status: u16,
        message: Option<String>,
    },

    /// The claim task ended without producing an outcome.
    Aborted,
}

impl FailureReason {
    /// Message to show the user, falling back to [`GENERIC_CLAIM_FAILURE`].
    pub fn user_message(&self) -> &str {
        match self {
            FailureReason::Network => "network",
            FailureReason::Server {
                message: Some(m), ..
            } => m.as_str(),
            FailureReason::Server { message: None, .. } | FailureReason::Aborted => {
                GENERIC_CLAIM_FAILURE
            }
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

/// Terminal result of one claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim was recorded; carries the number of products it applied to.
    Succeeded(usize),

    /// The user had already claimed the offer. The desired end state holds,
    /// so this is a success path.
    AlreadyClaimed,

    /// No usable session; the caller should redirect to sign-in.
    Unauthenticated,

    /// Any other failure.
    Failed(FailureReason),
}

impl ClaimOutcome {
    /// Returns true if the offer is claimed for the user after this outcome.
    pub fn is_claimed(&self) -> bool {
        matches!(
            self,
            ClaimOutcome::Succeeded(_) | ClaimOutcome::AlreadyClaimed
        )
    }

    /// Returns true if the cart view must be reconciled after this outcome.
    pub fn requires_cart_refresh(&self) -> bool {
        self.is_claimed()
    }

    /// Attempt state this outcome settles into.
    pub fn attempt_state(&self) -> ClaimAttemptState {
        match self {
            ClaimOutcome::Succeeded(_) => ClaimAttemptState::Succeeded,
            ClaimOutcome::AlreadyClaimed => ClaimAttemptState::AlreadyClaimed,
            ClaimOutcome::Unauthenticated | ClaimOutcome::Failed(_) => ClaimAttemptState::Failed,
        }
    }

    /// Short label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Succeeded(_) => "succeeded",
            ClaimOutcome::AlreadyClaimed => "already_claimed",
            ClaimOutcome::Unauthenticated => "unauthenticated",
            ClaimOutcome::Failed(FailureReason::Network) => "failed_network",
            ClaimOutcome::Failed(FailureReason::Server { .. }) => "failed_server",
            ClaimOutcome::Failed(FailureReason::Aborted) => "failed_aborted",
        }
    }
}

/// Body of `POST /api/offers/claim`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub offer_id: OfferId,
    #[serde(default)]
    pub create_order: bool,
}

impl ClaimRequest {
    /// Claim request that applies the discount to the cart only.
    pub fn cart_only(offer_id: OfferId) -> Self {
        Self {
            offer_id,
            create_order: false,
        }
    }
}

/// Returns true if a server message says the offer was already claimed.
pub fn indicates_already_claimed(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already claimed")
}

/// Fields of a claim response body the client cares about.
///
/// Parsing never fails: anything missing or malformed reads as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimResponseBody {
    pub success: bool,
    pub message: Option<String>,
    /// Length of `data.addedProducts`, when present.
    pub added_product_count: Option<usize>,
    /// Post-claim cart snapshot, when the server includes one.
    pub cart: Option<CartView>,
}

impl ClaimResponseBody {
    /// Extracts the known fields from a raw response body.
    pub fn parse(body: &str) -> Self {
        let Ok(root) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };

        let message = ["message", "error"]
            .iter()
            .find_map(|k| root.get(*k).and_then(Value::as_str))
            .map(str::to_string);

        let cart = root
            .pointer("/data/cart")
            .cloned()
            .and_then(|v| match CartView::from_value(v) {
                Ok(cart) => Some(cart),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring malformed cart in claim response");
                    None
                }
            });

        Self {
            success: root.get("success").and_then(Value::as_bool).unwrap_or(false),
            message,
            added_product_count: root
                .pointer("/data/addedProducts")
                .and_then(Value::as_array)
                .map(Vec::len),
            cart,
        }
    }
}
