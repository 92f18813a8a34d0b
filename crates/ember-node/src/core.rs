//! The node's assembled runtime state and main event loop: `spec.md` §5
//! "Concurrency model" — one task owns all mutable state behind the inbound
//! channel, collaborators run as independent tasks, everything else is a
//! method call or a channel send.

use crate::config::CoreConfig;
use crate::dandelion::{self, DandelionRoute};
use crate::dm_directory::NodeRecipientDirectory;
use crate::identity_flow;
use crate::keys::NodeKeys;
use crate::multicast_driver::{self, GraftTimerFired};
use crate::overlay_driver;
use crate::{dht_responder, toxicity};

use ember_blobstore::BlobStore;
use ember_dht::Dht;
use ember_identity::IdentityRegistry;
use ember_multicast::{extract_topics, MulticastEngine};
use ember_net::dispatch::route_inbound;
use ember_net::{ChunkRequestTable, DhtRpcClient, Frame, InboundEnvelope, NetChunkFetcher, PeerTable, PendingRpcTable};
use ember_overlay::{HyParView, OverlayMessage};
use ember_post::arena::PostArena;
use ember_post::carriage::{apply_carrier_update, evaluate_thread_gc, toggle_carry, GcOutcome};
use ember_post::compose::Composer;
use ember_post::dm::{self, DeliveryRoute, DmEngine};
use ember_post::pending::{self, PendingOutcome, PendingPost};
use ember_post::rating::RatingLedger;
use ember_post::trust::{apply_attestation, build_attestation};
use ember_post::verify::{VerificationResult, VerifierPool};
use ember_storage::{KVStore, MemStore, RedbStore};
use ember_types::dm::PendingDm;
use ember_types::post::{Post, Rating, Vote};
use ember_types::time::now_ms;
use ember_types::wire::WireMessage;
use ember_types::{ConfirmationSlip, Identity};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const DHT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60 * 10);
const SHUFFLE_INTERVAL: Duration = Duration::from_secs(60);
const PENDING_POST_TICK: Duration = pending::EVALUATION_TICK;
const IDENTITY_GC_INTERVAL: Duration = Duration::from_secs(60 * 60);
const THREAD_GC_INTERVAL: Duration = Duration::from_secs(60 * 5);
const DM_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Everything a running node owns. Collaborators that need interior
/// mutability under concurrent access sit behind a `Mutex`; read-mostly
/// collaborators (`PeerTable`, `BlobStore`) already manage their own
/// concurrency internally.
pub struct Core {
    pub config: CoreConfig,
    pub keys: NodeKeys,
    pub local_node_id: [u8; 20],

    pub store: Arc<dyn KVStore>,
    pub identity: Arc<Mutex<IdentityRegistry>>,
    pub dht: Arc<Mutex<Dht>>,
    pub overlay: Arc<Mutex<HyParView>>,
    pub multicast: Arc<Mutex<MulticastEngine>>,
    pub blobstore: Arc<BlobStore>,
    pub arena: Arc<Mutex<PostArena>>,
    pub rating: Arc<Mutex<RatingLedger>>,
    pub dm_engine: Arc<DmEngine>,
    pub recipient_directory: Arc<NodeRecipientDirectory>,

    pub pending_posts: Arc<Mutex<HashMap<[u8; 16], PendingPost>>>,
    pub pending_dms: Arc<Mutex<HashMap<String, PendingDm>>>,

    pub peers: PeerTable,
    pub pending_rpc: PendingRpcTable,
    pub chunk_requests: ChunkRequestTable,

    inbound_rx: mpsc::Receiver<InboundEnvelope>,
    listener: TcpListener,
}

impl Core {
    /// Loads keys, opens storage, and wires every collaborator together.
    /// Does not yet bind the listener or join the overlay; call
    /// [`Core::run`] for that.
    pub async fn bootstrap(config: CoreConfig) -> anyhow::Result<Self> {
        let keys = NodeKeys::load_or_generate(&config.data_dir)?;
        let local_node_id = ember_crypto::sha1_20(&keys.sign.public_key_bytes());

        let store: Arc<dyn KVStore> = if config.data_dir == std::path::PathBuf::from(":memory:") {
            Arc::new(MemStore::new())
        } else {
            let db_path = config.data_dir.join("ember.redb");
            Arc::new(RedbStore::open(db_path)?)
        };

        let (inbound_tx, inbound_rx) = mpsc::channel(1024);
        let peers = PeerTable::new(inbound_tx);
        let pending_rpc = PendingRpcTable::new();
        let chunk_requests = ChunkRequestTable::new();

        let rpc_client = Arc::new(DhtRpcClient::new(peers.clone(), pending_rpc.clone()));
        let dht = Arc::new(Mutex::new(Dht::new(local_node_id, store.clone(), rpc_client)));

        let fetcher = Arc::new(NetChunkFetcher::new(peers.clone(), chunk_requests.clone()));
        let blobstore = Arc::new(BlobStore::new(store.clone(), fetcher).with_soft_cap(config.blob_cap_bytes));

        let identity = Arc::new(Mutex::new(IdentityRegistry::new(config.identity_confirmation_threshold)));
        let overlay = Arc::new(Mutex::new(HyParView::with_caps(
            config.listen_addr.clone(),
            config.active_view,
            config.passive_view,
        )));
        let multicast = Arc::new(Mutex::new(MulticastEngine::new()));
        let arena = Arc::new(Mutex::new(PostArena::new()));
        let rating = Arc::new(Mutex::new(RatingLedger::new()));

        let dm_engine = Arc::new(DmEngine::new(config.handle.clone(), keys.enc.clone()));
        let recipient_directory = Arc::new(NodeRecipientDirectory::new(identity.clone(), dht.clone()));

        let listener = TcpListener::bind(&config.listen_addr).await?;

        Ok(Self {
            config,
            keys,
            local_node_id,
            store,
            identity,
            dht,
            overlay,
            multicast,
            blobstore,
            arena,
            rating,
            dm_engine,
            recipient_directory,
            pending_posts: Arc::new(Mutex::new(HashMap::new())),
            pending_dms: Arc::new(Mutex::new(HashMap::new())),
            peers,
            pending_rpc,
            chunk_requests,
            inbound_rx,
            listener,
        })
    }

    /// `spec.md` §4.7 step 1: compose a fresh claim, broadcast it, and track
    /// it locally as our own provisional identity.
    pub async fn claim_identity(&mut self, handle: String) -> anyhow::Result<Identity> {
        let claim = identity_flow::build_claim(handle.clone(), &self.keys.sign, self.keys.enc.public_key_bytes(), None).await?;
        self.identity.lock().await.validate_claim(&claim)?;
        self.identity.lock().await.record_provisional(claim.clone());
        self.peers.broadcast(WireMessage::ProvisionalIdentityClaim { claim: claim.clone() }).await;
        self.config.handle = handle;
        Ok(claim)
    }

    /// Dials every configured bootstrap peer and joins the overlay through
    /// it. Exposed separately from [`Core::run`] so one-shot CLI commands
    /// (`identity claim`, `post compose`, `dm send`) can establish enough
    /// connectivity to disseminate a single action without entering the
    /// main event loop.
    pub async fn join_bootstrap_peers(&mut self) {
        for bootstrap in self.config.bootstrap_peers.clone() {
            let actions = self.overlay.lock().await.join(bootstrap);
            overlay_driver::execute(&self.peers, actions).await;
        }
    }

    /// Runs the main event loop until ctrl-c. Consumes `self` since nothing
    /// outside this loop should observe the node after it starts running.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.join_bootstrap_peers().await;

        let peers_for_accept = self.peers.clone();
        tokio::spawn(peers_for_accept.accept_loop(self.listener));

        let (results_tx, mut results_rx) = mpsc::channel::<VerificationResult>(64);
        let verifier_pool = VerifierPool::spawn(&self.config.post_engine_config(), results_tx);

        let (timer_tx, mut timer_rx) = mpsc::channel::<GraftTimerFired>(64);

        let mut dht_maintenance = tokio::time::interval(DHT_MAINTENANCE_INTERVAL);
        let mut shuffle_tick = tokio::time::interval(SHUFFLE_INTERVAL);
        let mut pending_post_tick = tokio::time::interval(PENDING_POST_TICK);
        let mut identity_gc_tick = tokio::time::interval(IDENTITY_GC_INTERVAL);
        let mut thread_gc_tick = tokio::time::interval(THREAD_GC_INTERVAL);
        let mut dm_retry_tick = tokio::time::interval(DM_RETRY_INTERVAL);

        info!(listen_addr = %self.config.listen_addr, "ember node running");

        loop {
            tokio::select! {
                Some(envelope) = self.inbound_rx.recv() => {
                    if let Some(envelope) = route_inbound(envelope, &self.pending_rpc, &self.chunk_requests).await {
                        self.handle_envelope(envelope, &verifier_pool, &timer_tx).await;
                    }
                }
                Some(result) = results_rx.recv() => {
                    self.handle_verification_result(result).await;
                }
                Some(fired) = timer_rx.recv() => {
                    let action = self.multicast.lock().await.graft_timer_fired(&fired.topic, fired.msg_id, fired.peer);
                    if let Some(action) = action {
                        multicast_driver::execute(&self.peers, &timer_tx, vec![action]).await;
                    }
                }
                _ = dht_maintenance.tick() => {
                    let mut dht = self.dht.lock().await;
                    dht.refresh_stale_buckets().await;
                    dht.refresh_under_replicated().await;
                }
                _ = shuffle_tick.tick() => {
                    let action = self.overlay.lock().await.shuffle_tick();
                    if let Some(action) = action {
                        overlay_driver::execute(&self.peers, vec![action]).await;
                    }
                }
                _ = pending_post_tick.tick() => {
                    self.evaluate_pending_posts(&verifier_pool).await;
                }
                _ = identity_gc_tick.tick() => {
                    self.identity.lock().await.gc_expired();
                }
                _ = thread_gc_tick.tick() => {
                    self.run_thread_gc().await;
                }
                _ = dm_retry_tick.tick() => {
                    self.retry_pending_dms().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_envelope(&mut self, envelope: InboundEnvelope, verifier_pool: &VerifierPool, timer_tx: &mpsc::Sender<GraftTimerFired>) {
        match envelope.message {
            Frame::Overlay(message) => self.handle_overlay_message(envelope.from, message).await,
            Frame::Wire(message) => self.handle_wire_message(envelope.from, message, verifier_pool, timer_tx).await,
        }
    }

    async fn handle_overlay_message(&mut self, from: String, message: OverlayMessage) {
        let mut overlay = self.overlay.lock().await;
        let actions = match message {
            OverlayMessage::Join { joiner } => overlay.handle_join(joiner),
            OverlayMessage::ForwardJoin { joiner, ttl } => overlay.handle_forward_join(from, joiner, ttl),
            OverlayMessage::Disconnect { peer } => overlay.handle_disconnect(&peer),
            OverlayMessage::Neighbor { peer } => {
                debug!(%peer, "accepted neighbor invitation");
                Vec::new()
            }
            OverlayMessage::Shuffle { sender, peers } => overlay.handle_shuffle(sender, peers),
            OverlayMessage::ShuffleReply { peers } => {
                overlay.handle_shuffle_reply(peers);
                Vec::new()
            }
        };
        drop(overlay);
        overlay_driver::execute(&self.peers, actions).await;
    }

    async fn handle_wire_message(
        &mut self,
        from: String,
        message: WireMessage,
        verifier_pool: &VerifierPool,
        timer_tx: &mpsc::Sender<GraftTimerFired>,
    ) {
        if let Some(reply) = dht_responder::respond(&self.dht, &message).await {
            let _ = self.peers.send_to(&from, reply).await;
            return;
        }

        match message {
            WireMessage::ProvisionalIdentityClaim { claim } => self.handle_provisional_claim(claim).await,
            WireMessage::IdentityConfirmationSlip { slip } => self.handle_confirmation_slip(slip).await,

            WireMessage::NewPost { post } => self.handle_new_post(post, verifier_pool).await,
            WireMessage::DandelionStem { post } => {
                // `spec.md` §4.8 step 5: this hop admits the post the same
                // as a direct arrival, then fluffs it onward so the rest of
                // the overlay sees an ordinary broadcast from here rather
                // than from the true origin.
                self.peers.broadcast(WireMessage::NewPost { post: post.clone() }).await;
                self.handle_new_post(post, verifier_pool).await;
            }
            WireMessage::ParentUpdate { .. } => {
                // Structural hint only; the arena derives parent/reply edges on insert.
            }
            WireMessage::CarrierUpdate { post_id, peer, carrying } => {
                let mut arena = self.arena.lock().await;
                if let Some(post) = arena.get_mut(&post_id) {
                    let should_drop = apply_carrier_update(post, &peer, carrying);
                    if should_drop {
                        arena.remove(&post_id);
                    }
                }
            }
            WireMessage::PostAttestation { attestation, .. } => {
                let mut arena = self.arena.lock().await;
                if let Some(post) = arena.get_mut(&attestation.post_id) {
                    let reputation = 1.0;
                    if let Err(err) = apply_attestation(post, &attestation, reputation, 1.0) {
                        debug!(%err, "rejected post attestation");
                    }
                }
            }
            WireMessage::PostRating { rating } => self.handle_rating(rating).await,

            WireMessage::E2eDm { recipient, sender, ciphertext, nonce, message_id, is_retry, .. } => {
                self.handle_incoming_dm(recipient, sender, ciphertext, nonce, message_id, is_retry).await;
            }
            WireMessage::DmDelivered { message_id, .. } => {
                if let Some(pending) = self.pending_dms.lock().await.get_mut(&message_id) {
                    dm::apply_delivery_receipt(pending);
                }
            }

            WireMessage::RequestImageChunks { .. } | WireMessage::ImageChunk { .. } => {
                // Served by the blobstore's own chunk-serving path, not modeled here
                // beyond what `NetChunkFetcher` already answers client-side.
            }

            WireMessage::PeerExchange { peers } => {
                for peer in peers {
                    debug!(peer = %peer.id, "received peer exchange hint");
                }
            }

            WireMessage::Subscribe { topic } => {
                let should_forward = self.multicast.lock().await.handle_subscribe(&topic, from.clone());
                if should_forward {
                    self.peers.broadcast(WireMessage::Subscribe { topic }).await;
                }
            }
            WireMessage::Unsubscribe { topic } => {
                let should_forward = self.multicast.lock().await.handle_unsubscribe(&topic, &from);
                if should_forward {
                    self.peers.broadcast(WireMessage::Unsubscribe { topic }).await;
                }
            }
            WireMessage::Multicast { topic, msg_id, payload } => {
                let actions = self.multicast.lock().await.receive_multicast(&topic, msg_id, payload, from);
                multicast_driver::execute(&self.peers, timer_tx, actions).await;
            }
            WireMessage::IHave { topic, msg_id } => {
                let action = self.multicast.lock().await.receive_ihave(&topic, msg_id, from);
                if let Some(action) = action {
                    multicast_driver::execute(&self.peers, timer_tx, vec![action]).await;
                }
            }
            WireMessage::Graft { topic, msg_id } => {
                let actions = self.multicast.lock().await.receive_graft(&topic, &msg_id, from);
                multicast_driver::execute(&self.peers, timer_tx, actions).await;
            }
            WireMessage::Prune { topic } => {
                self.multicast.lock().await.receive_prune(&topic, &from);
            }

            // DHT RPC replies are consumed by `route_inbound` before this
            // match runs; requests are handled by `dht_responder` above.
            WireMessage::Ping { .. }
            | WireMessage::Pong { .. }
            | WireMessage::FindNode { .. }
            | WireMessage::FindNodeReply { .. }
            | WireMessage::FindValue { .. }
            | WireMessage::FindValueReply { .. }
            | WireMessage::Store { .. }
            | WireMessage::StoreAck { .. } => {}
        }
    }

    async fn handle_provisional_claim(&mut self, claim: Identity) {
        let handle = claim.handle.clone();
        let validated = self.identity.lock().await.validate_claim(&claim);
        if let Err(err) = validated {
            debug!(%handle, %err, "rejected incoming provisional claim");
            return;
        }
        if self.dht.lock().await.local_get(&ember_dht::identity_key(&handle)).await.ok().flatten().is_some() {
            debug!(%handle, "handle already resolves in the dht, rejecting");
            return;
        }
        self.identity.lock().await.record_provisional(claim.clone());

        if self.config.handle.is_empty() || self.config.handle == handle {
            return;
        }
        let slip = identity_flow::build_confirmation_slip(&claim, &self.config.handle, &self.keys.sign);
        self.peers.broadcast(WireMessage::IdentityConfirmationSlip { slip }).await;
    }

    async fn handle_confirmation_slip(&mut self, slip: ConfirmationSlip) {
        let handle = slip.handle.clone();
        let reached = match self.identity.lock().await.add_confirmation(&slip) {
            Ok(reached) => reached,
            Err(err) => {
                debug!(%handle, %err, "rejected confirmation slip");
                return;
            }
        };
        if !reached {
            return;
        }
        let identity = match self.identity.lock().await.promote(&handle) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(%handle, %err, "promotion failed after quorum reached");
                return;
            }
        };
        let key = ember_dht::identity_key(&handle);
        let value = serde_json::to_vec(&identity).unwrap_or_default();
        let _ = self.dht.lock().await.store(key, value).await;
    }

    /// Admits a freshly arrived post as pending: `spec.md` §4.8 reception
    /// steps 1-3. The accept/full-verify decision itself is made solely by
    /// `evaluate_pending_posts`'s periodic tick (step 4), so a post never
    /// skips the trust-evaluation window and never risks a double
    /// `finalize_post` race between an immediate accept and a queued
    /// verification result.
    async fn handle_new_post(&mut self, post: Post, _verifier_pool: &VerifierPool) {
        let post_id = post.id;
        let inserted = self.arena.lock().await.insert(post.clone());
        if !inserted {
            return;
        }
        let signature_ok = ember_crypto::Verifier::verify(&post.author_pk, &post.canonical_bytes(), &post.signature).is_ok();
        if !signature_ok {
            self.arena.lock().await.remove(&post_id);
            return;
        }
        self.pending_posts.lock().await.insert(post_id, PendingPost::new(now_ms()));
    }

    async fn handle_verification_result(&mut self, result: VerificationResult) {
        self.pending_posts.lock().await.remove(&result.post_id);
        if result.accepted {
            self.finalize_post(result.post_id).await;
        } else if let Some(post) = self.arena.lock().await.remove(&result.post_id) {
            debug!(post_id = ?post.id, "dropped post that failed full verification");
        }
    }

    /// Emits this node's own attestation for a just-accepted post and
    /// broadcasts it, per `spec.md` §4.8 step 6.
    async fn finalize_post(&mut self, post_id: [u8; 16]) {
        let pk = self.keys.sign.public_key_bytes();
        let handle = self.config.handle.clone();
        let keypair = self.keys.sign.clone();

        let mut arena = self.arena.lock().await;
        let Some(post) = arena.get(&post_id) else { return };
        let attestation = build_attestation(post, &handle, &pk, |bytes| keypair.sign(bytes));
        drop(arena);

        self.peers
            .broadcast(WireMessage::PostAttestation {
                attestation,
                attester_handle: handle,
                attester_pk: pk,
                signature: Vec::new(),
            })
            .await;
    }

    async fn evaluate_pending_posts(&mut self, verifier_pool: &VerifierPool) {
        let now = now_ms();
        let entries: Vec<([u8; 16], PendingPost)> = self.pending_posts.lock().await.iter().map(|(k, v)| (*k, v.clone())).collect();

        for (post_id, entry) in entries {
            if pending::has_expired(&entry, now) {
                self.pending_posts.lock().await.remove(&post_id);
                self.arena.lock().await.remove(&post_id);
                continue;
            }

            let arena = self.arena.lock().await;
            let Some(post) = arena.get(&post_id) else {
                drop(arena);
                self.pending_posts.lock().await.remove(&post_id);
                continue;
            };
            let trust_score = post.trust_score;
            let post_timestamp = post.timestamp;
            let author = post.author.clone();
            let post_clone = post.clone();
            drop(arena);

            let outcome = pending::evaluate_tick(
                &entry,
                true,
                trust_score,
                self.config.trust_threshold,
                now,
                post_timestamp,
                self.config.attestation_timeout_ms,
            );

            match outcome {
                PendingOutcome::Drop => {
                    self.pending_posts.lock().await.remove(&post_id);
                    self.arena.lock().await.remove(&post_id);
                }
                PendingOutcome::AcceptTrustShortcut => {
                    self.pending_posts.lock().await.remove(&post_id);
                    self.finalize_post(post_id).await;
                }
                PendingOutcome::SubmitForVerification => {
                    debug!(author = %author, "pending post timed out without trust, submitting for full verification");
                    let _ = verifier_pool.submit(post_clone).await;
                }
                PendingOutcome::KeepWaiting => {}
            }
        }
    }

    async fn handle_rating(&mut self, rating: Rating) {
        let post_author = {
            let arena = self.arena.lock().await;
            arena.get(&rating.post_id).map(|p| p.author.clone())
        };
        let Some(post_author) = post_author else { return };
        if let Err(err) = self
            .rating
            .lock()
            .await
            .receive_rating(&rating, &post_author, now_ms(), self.config.rating_replay_window_ms)
        {
            debug!(%err, "rejected post rating");
        }
    }

    pub async fn cast_vote(&mut self, post_id: [u8; 16], vote: Vote) -> anyhow::Result<()> {
        let author = {
            let arena = self.arena.lock().await;
            arena.get(&post_id).map(|p| p.author.clone())
        };
        let Some(author) = author else {
            anyhow::bail!("unknown post");
        };
        self.rating.lock().await.cast_local_vote(post_id, &author, &self.config.handle, vote)?;
        let rating = Rating {
            post_id,
            voter: self.config.handle.clone(),
            vote,
            reputation: 1.0,
            timestamp: now_ms(),
            signature: Vec::new(),
            voter_pk: self.keys.sign.public_key_bytes(),
        };
        let mut signed = rating;
        signed.signature = self.keys.sign.sign(&signed.canonical_bytes());
        self.peers.broadcast(WireMessage::PostRating { rating: signed }).await;
        Ok(())
    }

    pub async fn compose_post(&mut self, content: String, parent_id: Option<[u8; 16]>, image_bytes: Option<&[u8]>) -> anyhow::Result<()> {
        let parent_depth = match parent_id {
            Some(id) => self.arena.lock().await.get(&id).map(|p| p.depth),
            None => None,
        };
        let composer = Composer::new(
            self.keys.sign.clone(),
            self.config.handle.clone(),
            self.local_node_id,
            Some(self.blobstore.clone()),
            toxicity::default_toxicity_predicate(),
            None,
        );
        let post = composer
            .compose(content, parent_id, parent_depth, image_bytes, 0, &self.config.post_engine_config())
            .await?;
        self.arena.lock().await.insert(post.clone());

        // `spec.md` §4.8 step 5: stem-then-fluff when enough peers are
        // connected to make stemming meaningful, otherwise direct broadcast.
        match dandelion::choose_route(&self.peers.connected_peers()) {
            DandelionRoute::Stem { to } => {
                if self.peers.send_to(&to, WireMessage::DandelionStem { post: post.clone() }).await.is_err() {
                    debug!(peer = %to, "dandelion stem peer unreachable, falling back to direct broadcast");
                    self.peers.broadcast(WireMessage::NewPost { post: post.clone() }).await;
                }
            }
            DandelionRoute::Fluff => {
                self.peers.broadcast(WireMessage::NewPost { post: post.clone() }).await;
            }
        }

        // "Then additionally multicast to each extracted topic."
        let payload = serde_json::to_vec(&post).unwrap_or_default();
        for topic in extract_topics(&post.content) {
            let msg_id = hex::encode(post.id);
            let actions = self.multicast.lock().await.multicast(&topic, msg_id, payload.clone(), None);
            // An origin-side multicast call never schedules a graft timer
            // (those only arise from `receive_ihave`/`graft_timer_fired`),
            // so a scratch channel with nothing reading it is harmless here.
            let (timer_tx, _timer_rx) = mpsc::channel(1);
            multicast_driver::execute(&self.peers, &timer_tx, actions).await;
        }

        Ok(())
    }

    pub async fn toggle_carry(&mut self, post_id: [u8; 16]) -> anyhow::Result<()> {
        let mut arena = self.arena.lock().await;
        let Some(post) = arena.get_mut(&post_id) else {
            anyhow::bail!("unknown post");
        };
        let carrying = toggle_carry(post, &self.config.handle);
        drop(arena);
        self.peers
            .broadcast(WireMessage::CarrierUpdate { post_id, peer: self.config.handle.clone(), carrying })
            .await;
        Ok(())
    }

    async fn run_thread_gc(&mut self) {
        let now = now_ms();
        let roots: Vec<[u8; 16]> = {
            let arena = self.arena.lock().await;
            arena.iter().map(|p| arena.find_root(&p.id)).collect()
        };
        let mut seen = std::collections::HashSet::new();

        for root in roots {
            if !seen.insert(root) {
                continue;
            }
            let arena = self.arena.lock().await;
            let member_ids = arena.thread_members(&root);
            let members: Vec<Post> = member_ids.iter().filter_map(|id| arena.get(id).cloned()).collect();
            let refs: Vec<&Post> = members.iter().collect();
            let outcome = evaluate_thread_gc(&refs, now);
            drop(arena);

            if let GcOutcome::SoleCarrierShouldWithdraw { carrier } = outcome {
                if carrier == self.config.handle {
                    let _ = self.toggle_carry(root).await;
                }
            }
        }
    }

    pub async fn send_dm(&mut self, recipient: String, text: String) -> anyhow::Result<()> {
        let pk_enc = dm::resolve_recipient(self.recipient_directory.as_ref(), &recipient).await?;
        let (pending, wire) = self.dm_engine.prepare_send(&recipient, &text, &pk_enc)?;
        let id = pending.id.clone();
        self.pending_dms.lock().await.insert(id, pending);

        let route = dm::choose_route(self.peers.is_connected(&recipient), true);
        match route {
            DeliveryRoute::DirectPeer => {
                let _ = self.peers.send_to(&recipient, wire).await;
            }
            DeliveryRoute::DhtRouted | DeliveryRoute::StoreAndForward => {
                self.peers.broadcast(wire).await;
            }
        }
        Ok(())
    }

    async fn handle_incoming_dm(
        &mut self,
        recipient: String,
        sender: String,
        ciphertext: Vec<u8>,
        nonce: Vec<u8>,
        message_id: Option<String>,
        is_retry: bool,
    ) {
        if recipient != self.config.handle {
            return;
        }
        let Some(sender_pk) = self.recipient_directory.encryption_key_for(&sender).await else {
            return;
        };
        let Some(plaintext) = self.dm_engine.try_decrypt(&sender_pk, &ciphertext, &nonce) else {
            return;
        };
        info!(%sender, "received dm: {plaintext}");

        if is_retry {
            if let Some(message_id) = message_id {
                let receipt = self.dm_engine.build_receipt(message_id, recipient);
                let _ = self.peers.send_to(&sender, receipt).await;
            }
        }
    }

    async fn retry_pending_dms(&mut self) {
        let now = now_ms();
        let mut to_retry: Vec<PendingDm> = Vec::new();
        {
            let mut pending = self.pending_dms.lock().await;
            for dm in pending.values_mut() {
                dm::expire_if_due(dm, now);
                if dm.status == ember_types::dm::DmStatus::Pending && !dm.is_exhausted() {
                    to_retry.push(dm.clone());
                }
            }
        }

        for dm_record in to_retry {
            let wire = WireMessage::E2eDm {
                recipient: dm_record.recipient.clone(),
                sender: dm_record.sender.clone(),
                ciphertext: dm_record.encrypted.ciphertext.clone(),
                nonce: dm_record.encrypted.nonce.clone(),
                ts: now,
                routing_hint: None,
                message_id: Some(dm_record.id.clone()),
                is_retry: true,
            };
            let delivered = self.peers.is_connected(&dm_record.recipient) && self.peers.send_to(&dm_record.recipient, wire.clone()).await.is_ok();
            if !delivered {
                self.peers.broadcast(wire).await;
            }
            if let Some(entry) = self.pending_dms.lock().await.get_mut(&dm_record.id) {
                dm::record_attempt(entry, now);
            }
        }
    }
}
