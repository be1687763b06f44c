use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::replies::{self, Reply};
use super::state::{Session, SessionState};
use super::tokens::ButtonToken;
use crate::catalog_actor::CatalogClient;
use crate::domain::{CatalogEntry, ChatEvent, ChatInput, ChatUser};
use crate::error::{CartError, OrderError, SessionError};
use crate::messages::{RegistryRequest, ServiceResponse, ServiceResult, SessionRequest};
use crate::order_actor::OrderClient;

// =============================================================================
// SESSION SERVICE
// =============================================================================

/// Drives one chat through search, cart and checkout.
///
/// Events are handled one at a time in arrival order. Failures are turned
/// into replies at the handler boundary, so a bad event never stops the
/// session.
pub struct SessionService {
    receiver: mpsc::Receiver<SessionRequest>,
    session: Session,
    catalog_client: CatalogClient,
    order_client: OrderClient,
    results_limit: usize,
}

impl SessionService {
    pub fn new(
        buffer_size: usize,
        catalog_client: CatalogClient,
        order_client: OrderClient,
        results_limit: usize,
    ) -> (Self, SessionClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            session: Session::new(),
            catalog_client,
            order_client,
            results_limit,
        };
        let client = SessionClient::new(sender);
        (service, client)
    }

    #[instrument(name = "session_service", skip(self))]
    pub async fn run(mut self) {
        debug!("SessionService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                SessionRequest::Handle { event, respond_to } => {
                    let reply = self.handle_event(event).await;
                    let _ = respond_to.send(Ok(reply));
                }
                SessionRequest::Shutdown => {
                    debug!("SessionService shutting down");
                    break;
                }
                #[cfg(test)]
                SessionRequest::Inspect { respond_to } => {
                    let _ = respond_to.send(Ok(self.session.clone()));
                }
            }
        }

        debug!("SessionService stopped");
    }

    #[instrument(fields(user_id = %event.user.id), skip(self, event))]
    async fn handle_event(&mut self, event: ChatEvent) -> Reply {
        let ChatEvent { user, input } = event;
        let result = match input {
            ChatInput::Text(text) => self.handle_text(user, text).await,
            ChatInput::Callback(token) => self.handle_callback(&token).await,
        };

        result.unwrap_or_else(|e| self.recover(e))
    }

    /// Maps a failed step to what the user sees. Handlers only touch session
    /// state once their fallible work has succeeded.
    fn recover(&mut self, e: SessionError) -> Reply {
        match e {
            SessionError::Cart(CartError::OutOfStock {
                requested,
                in_cart,
                available,
                ..
            }) => {
                info!(requested, in_cart, available, "Add rejected, not enough stock");
                replies::out_of_stock(requested, in_cart, available)
            }
            SessionError::Cart(CartError::EmptyCart) | SessionError::Order(OrderError::EmptyCart) => {
                replies::empty_cart()
            }
            SessionError::MalformedInput(detail) => {
                warn!(detail = %detail, "Malformed input");
                replies::malformed_input()
            }
            SessionError::StaleSelection => replies::stale_selection(),
            SessionError::Order(e) => {
                error!(error = %e, "Order placement failed");
                replies::order_failed()
            }
            e => {
                error!(error = %e, "Request failed");
                replies::generic_error()
            }
        }
    }

    async fn handle_text(&mut self, user: ChatUser, text: String) -> Result<Reply, SessionError> {
        let text = text.trim();

        if let Some(command) = text.strip_prefix('/') {
            return Ok(self.handle_command(command));
        }

        if self.session.awaiting_address {
            return self.handle_address(user, text).await;
        }

        self.handle_search(text).await
    }

    fn handle_command(&mut self, command: &str) -> Reply {
        // "/cart@MediSearchBot" in group chats
        let name = command
            .split_whitespace()
            .next()
            .and_then(|word| word.split('@').next())
            .unwrap_or_default();
        debug!(command = name, "Command received");

        match name {
            "start" => replies::welcome(),
            "cart" => {
                self.session.state = SessionState::CartReview;
                replies::cart(&self.session.cart)
            }
            _ => replies::help(),
        }
    }

    #[instrument(skip(self))]
    async fn handle_search(&mut self, query: &str) -> Result<Reply, SessionError> {
        let matches = self.catalog_client.search(query.to_string()).await?;
        let available: Vec<CatalogEntry> = matches.into_iter().filter(CatalogEntry::is_available).collect();
        info!(matches = available.len(), "Search answered");

        self.session.state = SessionState::Browsing;
        if available.is_empty() {
            return Ok(replies::no_results());
        }

        let total_found = available.len();
        self.session.last_search = available.into_iter().take(self.results_limit).collect();
        Ok(replies::search_results(query, total_found, &self.session.last_search))
    }

    #[instrument(skip(self))]
    async fn handle_callback(&mut self, token: &str) -> Result<Reply, SessionError> {
        match token.parse::<ButtonToken>()? {
            ButtonToken::Medicine(index) => self.show_detail(index),
            ButtonToken::Add { index, quantity } => self.add_to_cart(index, quantity).await,
            ButtonToken::ViewCart => {
                self.session.state = SessionState::CartReview;
                Ok(replies::cart(&self.session.cart))
            }
            ButtonToken::ClearCart => {
                self.session.clear_cart();
                info!("Cart cleared");
                Ok(replies::cart_cleared())
            }
            ButtonToken::PlaceOrder => {
                self.session.state = SessionState::CartReview;
                self.session.cart.checkout()?;
                self.session.begin_checkout();
                Ok(replies::ask_address())
            }
        }
    }

    fn show_detail(&mut self, index: usize) -> Result<Reply, SessionError> {
        if self.session.last_search.is_empty() {
            return Err(SessionError::StaleSelection);
        }
        let Some(entry) = self.session.selection(index) else {
            return Ok(replies::unknown_medicine());
        };

        let reply = replies::detail(index, entry);
        self.session.state = SessionState::ViewingDetail { index };
        Ok(reply)
    }

    /// Checks the requested quantity against the catalog's current stock,
    /// not the stock shown when the results were listed.
    #[instrument(skip(self))]
    async fn add_to_cart(&mut self, index: usize, quantity: u32) -> Result<Reply, SessionError> {
        let listed = self
            .session
            .selection(index)
            .ok_or(SessionError::StaleSelection)?
            .clone();
        self.session.state = SessionState::ViewingDetail { index };

        let Some(entry) = self.catalog_client.get_entry(listed.name.clone()).await? else {
            warn!(medicine = %listed.name, "Listed medicine vanished from catalog");
            return Ok(replies::unknown_medicine());
        };

        let outcome = self.session.cart.add_item(&entry, quantity)?;
        info!(medicine = %entry.name, in_cart = outcome.item().quantity, "Added to cart");
        self.session.state = SessionState::CartReview;
        Ok(replies::added(&outcome))
    }

    #[instrument(skip(self, user, address))]
    async fn handle_address(&mut self, user: ChatUser, address: &str) -> Result<Reply, SessionError> {
        if address.is_empty() {
            return Ok(replies::invalid_address());
        }

        let items = match self.session.cart.checkout() {
            Ok(items) => items,
            Err(e) => {
                // cart was cleared some other way while we waited
                self.session.finish_order();
                return Err(e.into());
            }
        };

        let placed = self
            .order_client
            .place_order(user, items, address.to_string())
            .await?;
        info!(order_id = %placed.order_id, "Checkout complete");

        self.session.finish_order();
        Ok(replies::order_placed(&placed, address))
    }
}

#[derive(Clone)]
pub struct SessionClient {
    sender: mpsc::Sender<SessionRequest>,
}

impl SessionClient {
    pub fn new(sender: mpsc::Sender<SessionRequest>) -> Self {
        Self { sender }
    }

    /// Queues `event` with a responder the caller already holds, without
    /// waiting for queue space. A full or closed session hands the request
    /// back so its responder can still be answered.
    fn forward(
        &self,
        event: ChatEvent,
        respond_to: ServiceResponse<Reply, SessionError>,
    ) -> Result<(), TrySendError<SessionRequest>> {
        self.sender.try_send(SessionRequest::Handle { event, respond_to })
    }
}

client_shutdown!(SessionClient, SessionRequest);
#[cfg(test)]
client_method!(SessionClient => fn handle(event: ChatEvent) -> Reply as SessionRequest::Handle, Error = SessionError);
#[cfg(test)]
client_method!(SessionClient => fn inspect() -> Session as SessionRequest::Inspect, Error = SessionError);

// =============================================================================
// SESSION REGISTRY
// =============================================================================

/// Owns one [`SessionService`] per chat, created on the chat's first event.
///
/// Dispatch only enqueues onto the session's channel and never waits for
/// space in it, so a slow chat never holds up the others while per-chat
/// ordering is kept. An event for a chat whose queue is full is answered
/// with a busy reply instead of being queued.
pub struct SessionRegistry {
    receiver: mpsc::Receiver<RegistryRequest>,
    sessions: HashMap<i64, SessionClient>,
    handles: Vec<JoinHandle<()>>,
    catalog_client: CatalogClient,
    order_client: OrderClient,
    results_limit: usize,
    session_buffer: usize,
}

impl SessionRegistry {
    pub fn new(
        buffer_size: usize,
        catalog_client: CatalogClient,
        order_client: OrderClient,
        results_limit: usize,
    ) -> (Self, SessionRegistryClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let registry = Self {
            receiver,
            sessions: HashMap::new(),
            handles: Vec::new(),
            catalog_client,
            order_client,
            results_limit,
            session_buffer: buffer_size,
        };
        let client = SessionRegistryClient::new(sender);
        (registry, client)
    }

    #[instrument(name = "session_registry", skip(self))]
    pub async fn run(mut self) {
        info!("SessionRegistry starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                RegistryRequest::Dispatch {
                    session_id,
                    event,
                    respond_to,
                } => {
                    self.handle_dispatch(session_id, event, respond_to);
                }
                RegistryRequest::Shutdown => {
                    info!(sessions = self.sessions.len(), "SessionRegistry shutting down");
                    break;
                }
                #[cfg(test)]
                RegistryRequest::SessionCount { respond_to } => {
                    let _ = respond_to.send(Ok(self.sessions.len()));
                }
            }
        }

        for (session_id, client) in self.sessions.drain() {
            if let Err(e) = client.shutdown().await {
                warn!(session_id, error = %e, "Session already gone");
            }
        }
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        info!("SessionRegistry stopped");
    }

    fn handle_dispatch(
        &mut self,
        session_id: i64,
        event: ChatEvent,
        respond_to: ServiceResponse<Reply, SessionError>,
    ) {
        let client = self.session(session_id);
        match client.forward(event, respond_to) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                warn!(session_id, "Session queue full, turning event away");
                if let SessionRequest::Handle { respond_to, .. } = request {
                    let _ = respond_to.send(Ok(replies::busy()));
                }
            }
            Err(TrySendError::Closed(request)) => {
                error!(session_id, "Session task is gone, dropping it");
                self.sessions.remove(&session_id);
                if let SessionRequest::Handle { respond_to, .. } = request {
                    send_error!(
                        respond_to,
                        SessionError::ActorCommunicationError("Session closed".to_string())
                    );
                }
            }
        }
    }

    fn session(&mut self, session_id: i64) -> SessionClient {
        if let Some(client) = self.sessions.get(&session_id) {
            return client.clone();
        }

        info!(session_id, "Opening chat session");
        let (service, client) = SessionService::new(
            self.session_buffer,
            self.catalog_client.clone(),
            self.order_client.clone(),
            self.results_limit,
        );
        self.handles.push(tokio::spawn(service.run()));
        self.sessions.insert(session_id, client.clone());
        client
    }
}

#[derive(Clone)]
pub struct SessionRegistryClient {
    sender: mpsc::Sender<RegistryRequest>,
}

impl SessionRegistryClient {
    pub fn new(sender: mpsc::Sender<RegistryRequest>) -> Self {
        Self { sender }
    }

    /// Enqueues `event` for its chat and returns without waiting for the
    /// reply. Events dispatched in order are handled in order.
    #[instrument(skip(self, event))]
    pub async fn dispatch(
        &self,
        session_id: i64,
        event: ChatEvent,
    ) -> Result<oneshot::Receiver<ServiceResult<Reply, SessionError>>, SessionError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(RegistryRequest::Dispatch {
                session_id,
                event,
                respond_to,
            })
            .await
            .map_err(|_| SessionError::ActorCommunicationError("Actor closed".to_string()))?;
        Ok(response)
    }
}

client_shutdown!(SessionRegistryClient, RegistryRequest);
#[cfg(test)]
client_method!(SessionRegistryClient => fn handle(session_id: i64, event: ChatEvent) -> Reply as RegistryRequest::Dispatch, Error = SessionError);
#[cfg(test)]
client_method!(SessionRegistryClient => fn session_count() -> usize as RegistryRequest::SessionCount, Error = SessionError);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_actor::{CatalogService, CatalogStore};
    use crate::error::OrderError;
    use crate::messages::CatalogRequest;
    use crate::mock_framework::{create_mock_catalog, create_mock_order_client, expect_place_order};
    use crate::order_actor::{OrderLedger, OrderService};
    use std::path::PathBuf;

    const CATALOG: &str = "name,price(₹),manufacturer_name,type,pack_size_label,short_composition1,short_composition2,quantity\n\
        Crocin Advance,30,GSK,allopathy,strip of 15 tablets,Paracetamol (500mg),,5\n\
        Dolo 650,31.5,Micro Labs,allopathy,strip of 15 tablets,Paracetamol (650mg),,0\n\
        Augmentin 625 Duo,223.42,GSK,allopathy,strip of 10 tablets,Amoxycillin (500mg),Clavulanic Acid (125mg),12\n";

    struct Harness {
        _dir: tempfile::TempDir,
        catalog_path: PathBuf,
        catalog: CatalogClient,
        ledger: OrderLedger,
        client: SessionClient,
    }

    fn start() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("medicines.csv");
        std::fs::write(&catalog_path, CATALOG).unwrap();

        let (catalog, catalog_client) = CatalogService::new(10, CatalogStore::open(&catalog_path, 100));
        tokio::spawn(catalog.run());
        let ledger = OrderLedger::new(dir.path().join("orders.csv"));
        let (orders, order_client) = OrderService::new(10, ledger.clone(), catalog_client.clone());
        tokio::spawn(orders.run());
        let (session, client) = SessionService::new(10, catalog_client.clone(), order_client, 10);
        tokio::spawn(session.run());

        Harness {
            _dir: dir,
            catalog_path,
            catalog: catalog_client,
            ledger,
            client,
        }
    }

    fn user() -> ChatUser {
        ChatUser::new("7", "Asha Rao")
    }

    async fn say(client: &SessionClient, text: &str) -> Reply {
        client.handle(ChatEvent::text(user(), text)).await.unwrap()
    }

    async fn press(client: &SessionClient, token: &str) -> Reply {
        client.handle(ChatEvent::callback(user(), token)).await.unwrap()
    }

    #[tokio::test]
    async fn search_hides_out_of_stock_entries() {
        let h = start();

        let reply = say(&h.client, "paracetamol").await;

        assert!(reply.text.starts_with("Found 1 medicines matching 'paracetamol'"));
        assert_eq!(reply.tokens().collect::<Vec<_>>(), ["med_0"]);
        let session = h.client.inspect().await.unwrap();
        assert_eq!(session.state, SessionState::Browsing);
        assert_eq!(session.last_search[0].name, "Crocin Advance");
    }

    #[tokio::test]
    async fn empty_search_still_moves_to_browsing() {
        let h = start();

        let reply = say(&h.client, "insulin").await;

        assert_eq!(reply, replies::no_results());
        assert_eq!(h.client.inspect().await.unwrap().state, SessionState::Browsing);
    }

    #[tokio::test]
    async fn results_are_capped_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medicines.csv");
        let mut csv = String::from("name,price,quantity\n");
        for i in 0..14 {
            csv.push_str(&format!("Zincovit {},10,3\n", i));
        }
        std::fs::write(&path, csv).unwrap();
        let (catalog, catalog_client) = CatalogService::new(10, CatalogStore::open(&path, 100));
        tokio::spawn(catalog.run());
        let (order_client, _orders) = create_mock_order_client(1);
        let (session, client) = SessionService::new(10, catalog_client, order_client, 10);
        tokio::spawn(session.run());

        let reply = say(&client, "zincovit").await;

        assert!(reply.text.contains("Found 14 medicines"));
        assert!(reply.text.contains("Showing first 10 results"));
        assert_eq!(reply.buttons.len(), 10);
    }

    #[tokio::test]
    async fn detail_requires_a_previous_search() {
        let h = start();

        assert_eq!(press(&h.client, "med_0").await, replies::stale_selection());

        say(&h.client, "crocin").await;
        assert_eq!(press(&h.client, "med_4").await, replies::unknown_medicine());

        let reply = press(&h.client, "med_0").await;
        assert!(reply.text.contains("Name: Crocin Advance"));
        assert_eq!(
            h.client.inspect().await.unwrap().state,
            SessionState::ViewingDetail { index: 0 }
        );
    }

    #[tokio::test]
    async fn over_stock_add_stays_in_detail_and_keeps_cart() {
        let h = start();
        say(&h.client, "crocin").await;
        press(&h.client, "med_0").await;
        press(&h.client, "add_0_3").await;

        let reply = press(&h.client, "add_0_3").await;

        assert_eq!(reply, replies::out_of_stock(3, 3, 5));
        let session = h.client.inspect().await.unwrap();
        assert_eq!(session.state, SessionState::ViewingDetail { index: 0 });
        assert_eq!(session.cart.quantity_of("Crocin Advance"), 3);
    }

    #[tokio::test]
    async fn add_checks_current_catalog_stock() {
        let h = start();
        say(&h.client, "crocin").await;
        std::fs::write(&h.catalog_path, CATALOG.replace(",,5\n", ",,1\n")).unwrap();
        h.catalog.reload().await.unwrap();

        let reply = press(&h.client, "add_0_2").await;

        assert_eq!(reply, replies::out_of_stock(2, 0, 1));
    }

    #[tokio::test]
    async fn malformed_token_leaves_session_untouched() {
        let h = start();
        say(&h.client, "crocin").await;
        let before = h.client.inspect().await.unwrap();

        let reply = press(&h.client, "add_zero_one").await;

        assert_eq!(reply, replies::malformed_input());
        assert_eq!(h.client.inspect().await.unwrap(), before);
    }

    #[tokio::test]
    async fn place_order_on_empty_cart_returns_to_review() {
        let h = start();

        let reply = press(&h.client, "place_order").await;

        assert_eq!(reply, replies::empty_cart());
        let session = h.client.inspect().await.unwrap();
        assert_eq!(session.state, SessionState::CartReview);
        assert!(!session.awaiting_address);
        assert!(h.ledger.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_while_awaiting_address_is_the_address() {
        let h = start();
        say(&h.client, "augmentin").await;
        press(&h.client, "add_0_2").await;
        assert_eq!(press(&h.client, "place_order").await, replies::ask_address());

        // would be a valid search otherwise
        let reply = say(&h.client, "crocin").await;

        assert!(reply.text.starts_with("✅ Order placed successfully!"));
        assert!(reply.text.contains("Total Amount: ₹446.84"));
        let records = h.ledger.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].delivery_address.as_deref(), Some("crocin"));

        let session = h.client.inspect().await.unwrap();
        assert_eq!(session.state, SessionState::Idle);
        assert!(session.cart.is_empty());
        assert!(!session.awaiting_address);
    }

    #[tokio::test]
    async fn commands_are_answered_during_checkout() {
        let h = start();
        say(&h.client, "crocin").await;
        press(&h.client, "add_0_1").await;
        press(&h.client, "place_order").await;

        let reply = say(&h.client, "/cart").await;

        assert!(reply.text.contains("• 1x Crocin Advance"));
        assert!(h.client.inspect().await.unwrap().awaiting_address);
        assert_eq!(say(&h.client, "/start").await, replies::welcome());
        assert_eq!(say(&h.client, "/help@MediSearchBot").await, replies::help());
    }

    #[tokio::test]
    async fn blank_address_is_asked_again() {
        let h = start();
        say(&h.client, "crocin").await;
        press(&h.client, "add_0_1").await;
        press(&h.client, "place_order").await;

        assert_eq!(say(&h.client, "   ").await, replies::invalid_address());
        assert!(h.client.inspect().await.unwrap().awaiting_address);
        assert!(h.ledger.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_cart_abandons_checkout() {
        let h = start();
        say(&h.client, "crocin").await;
        press(&h.client, "add_0_1").await;
        press(&h.client, "place_order").await;

        assert_eq!(press(&h.client, "clear_cart").await, replies::cart_cleared());

        let session = h.client.inspect().await.unwrap();
        assert_eq!(session.state, SessionState::CartReview);
        assert!(session.cart.is_empty());
        assert!(!session.awaiting_address);
        assert_eq!(say(&h.client, "crocin").await.buttons.len(), 1);
    }

    #[tokio::test]
    async fn failed_order_keeps_cart_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medicines.csv");
        std::fs::write(&path, CATALOG).unwrap();
        let (catalog, catalog_client) = CatalogService::new(10, CatalogStore::open(&path, 100));
        tokio::spawn(catalog.run());
        let (order_client, mut orders) = create_mock_order_client(1);
        let (session, client) = SessionService::new(10, catalog_client, order_client, 10);
        tokio::spawn(session.run());
        say(&client, "crocin").await;
        press(&client, "add_0_2").await;
        press(&client, "place_order").await;

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.handle(ChatEvent::text(user(), "221B Baker St")).await }
        });
        let (items, address, responder) = expect_place_order(&mut orders)
            .await
            .expect("Expected PlaceOrder request");
        assert_eq!(items[0].quantity, 2);
        assert_eq!(address, "221B Baker St");
        responder
            .send(Err(OrderError::Persistence("disk full".into())))
            .unwrap();

        assert_eq!(pending.await.unwrap().unwrap(), replies::order_failed());
        let session = client.inspect().await.unwrap();
        assert!(session.awaiting_address);
        assert_eq!(session.cart.quantity_of("Crocin Advance"), 2);
    }

    #[tokio::test]
    async fn registry_keeps_sessions_apart() {
        let h = start();
        let (catalog, catalog_client) = CatalogService::new(10, CatalogStore::open(&h.catalog_path, 100));
        tokio::spawn(catalog.run());
        let (order_client, _orders) = create_mock_order_client(1);
        let (registry, client) = SessionRegistry::new(10, catalog_client, order_client, 10);
        tokio::spawn(registry.run());

        let alice = ChatUser::new("1", "Alice");
        let bob = ChatUser::new("2", "Bob");
        client.handle(1, ChatEvent::text(alice.clone(), "crocin")).await.unwrap();
        client.handle(1, ChatEvent::callback(alice.clone(), "add_0_2")).await.unwrap();

        let reply = client.handle(2, ChatEvent::callback(bob, "view_cart")).await.unwrap();

        assert_eq!(reply, replies::empty_cart());
        assert_eq!(client.session_count().await.unwrap(), 2);
        let alice_cart = client.handle(1, ChatEvent::callback(alice, "view_cart")).await.unwrap();
        assert!(alice_cart.text.contains("2x Crocin Advance"));
    }

    #[tokio::test]
    async fn dispatch_preserves_per_chat_order() {
        let h = start();
        let (catalog, catalog_client) = CatalogService::new(10, CatalogStore::open(&h.catalog_path, 100));
        tokio::spawn(catalog.run());
        let (order_client, _orders) = create_mock_order_client(1);
        let (registry, client) = SessionRegistry::new(10, catalog_client, order_client, 10);
        tokio::spawn(registry.run());
        let alice = ChatUser::new("1", "Alice");

        let first = client.dispatch(1, ChatEvent::text(alice.clone(), "crocin")).await.unwrap();
        let second = client.dispatch(1, ChatEvent::callback(alice.clone(), "add_0_1")).await.unwrap();
        let third = client.dispatch(1, ChatEvent::callback(alice, "view_cart")).await.unwrap();

        assert!(first.await.unwrap().unwrap().text.starts_with("Found 1"));
        assert!(second.await.unwrap().unwrap().text.starts_with("Added 1x Crocin Advance"));
        assert!(third.await.unwrap().unwrap().text.contains("Total: ₹30.00"));

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn full_session_queue_gets_busy_reply_without_stalling_other_chats() {
        let (catalog_client, mut catalog_rx) = create_mock_catalog(10);
        let (order_client, _orders) = create_mock_order_client(1);
        let (registry, client) = SessionRegistry::new(1, catalog_client, order_client, 10);
        tokio::spawn(registry.run());
        let alice = ChatUser::new("1", "Alice");

        // Alice's session blocks on a search the catalog never answers.
        let _stuck = client.dispatch(1, ChatEvent::text(alice.clone(), "crocin")).await.unwrap();
        let pending_search = match catalog_rx.recv().await {
            Some(CatalogRequest::Search { respond_to, .. }) => respond_to,
            other => panic!("expected a search request, got {:?}", other),
        };

        let _queued = client.dispatch(1, ChatEvent::callback(alice.clone(), "view_cart")).await.unwrap();
        let turned_away = client.dispatch(1, ChatEvent::callback(alice, "view_cart")).await.unwrap();
        assert_eq!(turned_away.await.unwrap().unwrap(), replies::busy());

        let bob = ChatUser::new("2", "Bob");
        let reply = client.handle(2, ChatEvent::text(bob, "/start")).await.unwrap();
        assert_eq!(reply, replies::welcome());

        drop(pending_search);
    }
}
