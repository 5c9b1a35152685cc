//! Per-offer claim coordination.
//!
//! The coordinator owns a board keyed by offer id. An offer with a claim in
//! flight has an entry holding the shared outcome future; a second `claim`
//! for the same offer awaits that future instead of issuing another request.
//! Each attempt runs in its own task, so dropping the caller's future (for
//! example on view teardown) never abandons a half-submitted claim.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use common::{OfferId, UserId};
use domain::{
    CartView, ClaimAttemptState, ClaimOutcome, ClaimRequest, ClaimResponseBody, FailureReason,
    Offer, indicates_already_claimed,
};
use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::cart_sync::CartSynchronizer;
use crate::session::{Session, SessionStore};
use crate::transport::{RawResponse, StorefrontTransport, TransportError};

const STATUS_UNAUTHORIZED: u16 = 401;

type SharedOutcome = Shared<BoxFuture<'static, ClaimOutcome>>;

/// What the view needs to render one offer's claim control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfferClaimStatus {
    pub state: ClaimAttemptState,
    /// Sticky for the session once any attempt ends claimed.
    pub claimed: bool,
}

struct InFlight {
    attempt: u64,
    outcome: SharedOutcome,
}

#[derive(Default)]
struct Board {
    in_flight: HashMap<OfferId, InFlight>,
    status: HashMap<OfferId, OfferClaimStatus>,
    next_attempt: u64,
    generation: u64,
}

/// Identifies one attempt on the board.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    attempt: u64,
    generation: u64,
}

/// Releases an attempt's in-flight entry when dropped, including on panic.
struct Release {
    board: Arc<Mutex<Board>>,
    offer_id: OfferId,
    attempt: u64,
}

impl Drop for Release {
    fn drop(&mut self) {
        let mut board = lock(&self.board);
        let owned = board
            .in_flight
            .get(&self.offer_id)
            .is_some_and(|f| f.attempt == self.attempt);
        if !owned {
            return;
        }
        board.in_flight.remove(&self.offer_id);
        if let Some(status) = board.status.get_mut(&self.offer_id) {
            if status.state == ClaimAttemptState::Claiming {
                status.state = ClaimAttemptState::Idle;
            }
        }
    }
}

fn lock(board: &Mutex<Board>) -> MutexGuard<'_, Board> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Claims offers on behalf of the signed-in user.
pub struct ClaimCoordinator<T: StorefrontTransport> {
    transport: Arc<T>,
    sessions: Arc<dyn SessionStore>,
    cart_sync: CartSynchronizer<T>,
    board: Arc<Mutex<Board>>,
}

impl<T: StorefrontTransport> Clone for ClaimCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            sessions: self.sessions.clone(),
            cart_sync: self.cart_sync.clone(),
            board: self.board.clone(),
        }
    }
}

impl<T: StorefrontTransport + 'static> ClaimCoordinator<T> {
    /// Creates a coordinator with an empty board.
    pub fn new(
        transport: Arc<T>,
        sessions: Arc<dyn SessionStore>,
        cart_sync: CartSynchronizer<T>,
    ) -> Self {
        Self {
            transport,
            sessions,
            cart_sync,
            board: Arc::new(Mutex::new(Board::default())),
        }
    }

    /// Claims `offer` for the current session.
    ///
    /// Without a usable session this returns
    /// [`ClaimOutcome::Unauthenticated`] immediately: no request is issued and
    /// the board is left untouched. If a claim for the same offer is already
    /// in flight, the call joins it and returns its outcome. Otherwise one
    /// request is issued; a claimed outcome is followed by cart
    /// reconciliation before this returns, and the offer's in-flight entry is
    /// released whatever the outcome.
    #[tracing::instrument(skip(self, offer), fields(offer_id = %offer.id))]
    pub async fn claim(&self, offer: &Offer) -> ClaimOutcome {
        let Some(session) = self.sessions.current() else {
            metrics::counter!("claim_outcomes_total", "outcome" => "unauthenticated")
                .increment(1);
            tracing::info!("claim without session, sign-in required");
            return ClaimOutcome::Unauthenticated;
        };

        let outcome = {
            let mut board = lock(&self.board);
            let existing = board.in_flight.get(&offer.id).map(|f| f.outcome.clone());
            match existing {
                Some(outcome) => {
                    metrics::counter!("claim_duplicate_suppressed_total").increment(1);
                    tracing::debug!("claim already in flight, joining it");
                    outcome
                }
                None => self.start_attempt(&mut board, offer.clone(), session),
            }
        };

        outcome.await
    }

    /// Returns the claim status of `offer_id`.
    pub fn status(&self, offer_id: &OfferId) -> OfferClaimStatus {
        lock(&self.board)
            .status
            .get(offer_id)
            .copied()
            .unwrap_or_default()
    }

    /// Marks every offer already claimed by `user_id` as claimed.
    pub fn mark_claimed_from<'a>(
        &self,
        offers: impl IntoIterator<Item = &'a Offer>,
        user_id: &UserId,
    ) {
        let mut board = lock(&self.board);
        for offer in offers {
            if offer.is_claimed_by(user_id) {
                board.status.entry(offer.id.clone()).or_default().claimed = true;
            }
        }
    }

    /// Forgets every offer's status and in-flight entry, for example after
    /// logout.
    ///
    /// Claims still in flight complete against the server but no longer
    /// write to the board or the cart, and a later claim of the same offer
    /// starts a fresh attempt under the new session instead of joining them.
    pub fn reset(&self) {
        let mut board = lock(&self.board);
        board.status.clear();
        board.in_flight.clear();
        board.generation += 1;
    }

    fn start_attempt(&self, board: &mut Board, offer: Offer, session: Session) -> SharedOutcome {
        board.next_attempt += 1;
        let ticket = Ticket {
            attempt: board.next_attempt,
            generation: board.generation,
        };
        board.status.entry(offer.id.clone()).or_default().state = ClaimAttemptState::Claiming;
        metrics::counter!("claim_attempts_total").increment(1);

        let offer_id = offer.id.clone();
        let handle = tokio::spawn(self.clone().run_attempt(offer, session, ticket));
        let outcome = async move {
            handle.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "claim task ended without an outcome");
                ClaimOutcome::Failed(FailureReason::Aborted)
            })
        }
        .boxed()
        .shared();

        board.in_flight.insert(
            offer_id,
            InFlight {
                attempt: ticket.attempt,
                outcome: outcome.clone(),
            },
        );
        outcome
    }

    async fn run_attempt(self, offer: Offer, session: Session, ticket: Ticket) -> ClaimOutcome {
        let release = Release {
            board: self.board.clone(),
            offer_id: offer.id.clone(),
            attempt: ticket.attempt,
        };
        let started = Instant::now();
        let epoch = self.cart_sync.cart().epoch().await;

        let request = ClaimRequest::cart_only(offer.id.clone());
        let response = self.transport.claim_offer(&session.token, &request).await;
        let (outcome, snapshot) = classify(response, &offer);

        metrics::counter!("claim_outcomes_total", "outcome" => outcome.as_str()).increment(1);
        metrics::histogram!("claim_duration_seconds").record(started.elapsed().as_secs_f64());
        match &outcome {
            ClaimOutcome::Failed(reason) => {
                tracing::error!(offer_id = %offer.id, %reason, "claim failed");
            }
            other => tracing::info!(offer_id = %offer.id, outcome = other.as_str(), "claim settled"),
        }

        self.record(&offer.id, ticket, outcome.attempt_state(), outcome.is_claimed());

        if !self.is_current(ticket) {
            tracing::debug!(offer_id = %offer.id, "session ended during claim, cart left alone");
        } else if outcome.requires_cart_refresh() {
            match snapshot {
                Some(view) => {
                    self.cart_sync.apply_snapshot(epoch, view).await;
                }
                // Failure is logged by the synchronizer; the outcome stands.
                None => {
                    let _ = self.cart_sync.reconcile(epoch).await;
                }
            }
        }

        self.record(&offer.id, ticket, ClaimAttemptState::Idle, false);
        drop(release);
        outcome
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        lock(&self.board).generation == ticket.generation
    }

    fn record(&self, offer_id: &OfferId, ticket: Ticket, state: ClaimAttemptState, claimed: bool) {
        let mut board = lock(&self.board);
        if board.generation != ticket.generation {
            return;
        }
        let status = board.status.entry(offer_id.clone()).or_default();
        status.state = state;
        status.claimed |= claimed;
    }
}

/// Maps a claim response to its outcome, plus the cart snapshot if the
/// server sent one with a success.
fn classify(
    response: Result<RawResponse, TransportError>,
    offer: &Offer,
) -> (ClaimOutcome, Option<CartView>) {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "claim request failed without a response");
            return (ClaimOutcome::Failed(FailureReason::Network), None);
        }
    };

    let body = ClaimResponseBody::parse(&response.body);

    if response.is_success() && body.success {
        let added = body
            .added_product_count
            .unwrap_or_else(|| offer.product_count());
        return (ClaimOutcome::Succeeded(added), body.cart);
    }

    if response.status == STATUS_UNAUTHORIZED {
        return (ClaimOutcome::Unauthenticated, None);
    }

    if response.is_client_error()
        && body
            .message
            .as_deref()
            .is_some_and(indicates_already_claimed)
    {
        return (ClaimOutcome::AlreadyClaimed, None);
    }

    (
        ClaimOutcome::Failed(FailureReason::Server {
            status: response.status,
            message: body.message,
        }),
        None,
    )
}
