//! The conversation controller: a single logical actor that owns the
//! message timeline and serializes every turn.
//!
//! All mutation goes through `&mut self` entry points, so no two turns can
//! interleave their committing writes even though network I/O is
//! asynchronous. The suspension points are exactly: awaiting the next
//! streamed fragment, awaiting image generation, and (in a detached task)
//! awaiting concept-graph generation. The graph side effect never blocks a
//! turn — its result is delivered over a channel and applied whenever the
//! controller next gets control, even long after the triggering turn
//! settled.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use lumina_core::models::concept_graph::{
    should_request_graph, topic_from_prompt, ConceptGraph,
};
use lumina_core::models::message::{Attachment, Message, Sender};
use lumina_core::models::profile::UserProfile;
use lumina_core::models::progress::ProgressReport;
use lumina_core::models::session::SessionCounters;
use lumina_core::models::subject::Subject;
use lumina_gemini::provider::{
    ChatRequest, ChatRole, HistoryEntry, ImagePayload, StreamEvent, TutorProvider,
};
use lumina_storage::credential::CredentialStore;
use lumina_storage::profile::ProfileStore;
use lumina_storage::sessions::SessionCounterStore;

use crate::error::ChatError;
use crate::snapshot::TimelineSnapshot;

/// The single message a fresh (or logged-out) timeline contains.
pub const GREETING: &str = "Hi! I'm Lumina. Choose a subject and let's start learning!";

/// Shown in place of a reply when a chat stream fails for a reason other
/// than a missing credential.
pub const CHAT_APOLOGY: &str =
    "I'm sorry, I encountered an error. Please check your connection or API key.";

/// Caption on a successfully generated image.
pub const IMAGE_CAPTION: &str = "Here is the image you requested:";

/// Shown when image generation fails for a reason other than a missing
/// credential.
pub const IMAGE_APOLOGY: &str =
    "Sorry, I couldn't generate that image. Please try a different description.";

/// Where the controller is within a turn. Only one primary generation may
/// be in flight at a time; a non-idle phase refuses new turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPhase {
    Idle,
    Streaming,
    GeneratingImage,
}

/// How an accepted or refused turn ended, on the non-error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The submission was a no-op (blank input, or a turn already in
    /// flight). Nothing changed.
    Rejected,
    /// The stream settled and the reply is committed.
    Answered,
    /// The provider failed; an apology message is committed in the
    /// timeline and the learner may simply resend.
    Errored,
    /// Image generation succeeded and the image is committed.
    ImageDelivered,
}

pub struct ConversationController {
    provider: Arc<dyn TutorProvider>,
    profile_store: ProfileStore,
    session_store: SessionCounterStore,
    credentials: CredentialStore,

    timeline: Vec<Message>,
    active_subject: Subject,
    counters: SessionCounters,
    concept_graph: Option<ConceptGraph>,
    profile: Option<UserProfile>,
    phase: TurnPhase,

    graph_tx: mpsc::UnboundedSender<ConceptGraph>,
    graph_rx: mpsc::UnboundedReceiver<ConceptGraph>,
    snapshot_tx: watch::Sender<TimelineSnapshot>,
}

impl ConversationController {
    /// Build a controller over injected stores and provider. Persisted
    /// counters and profile are loaded here; unreadable state falls back to
    /// defaults rather than blocking startup.
    pub fn new(
        provider: Arc<dyn TutorProvider>,
        profile_store: ProfileStore,
        session_store: SessionCounterStore,
        credentials: CredentialStore,
    ) -> Self {
        let counters = session_store.load().unwrap_or_else(|e| {
            warn!(error = %e, "session counters unreadable, starting from zero");
            SessionCounters::default()
        });
        let profile = profile_store.load().unwrap_or_else(|e| {
            warn!(error = %e, "profile unreadable, treating as logged out");
            None
        });

        let (graph_tx, graph_rx) = mpsc::unbounded_channel();
        let timeline = vec![Message::bot(GREETING)];
        let (snapshot_tx, _) = watch::channel(TimelineSnapshot {
            messages: timeline.clone(),
            active_subject: Subject::General,
            concept_graph: None,
            busy: false,
            total_sessions: counters.total(),
        });

        Self {
            provider,
            profile_store,
            session_store,
            credentials,
            timeline,
            active_subject: Subject::General,
            counters,
            concept_graph: None,
            profile,
            phase: TurnPhase::Idle,
            graph_tx,
            graph_rx,
            snapshot_tx,
        }
    }

    // ── Read surface ─────────────────────────────────────────────────────

    pub fn timeline(&self) -> &[Message] {
        &self.timeline
    }

    pub fn active_subject(&self) -> Subject {
        self.active_subject
    }

    pub fn concept_graph(&self) -> Option<&ConceptGraph> {
        self.concept_graph.as_ref()
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn progress(&self) -> ProgressReport {
        ProgressReport::derive(&self.counters)
    }

    pub fn current_profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.profile.is_some()
    }

    pub fn has_access(&self) -> bool {
        self.credentials.has_access()
    }

    /// Subscribe to state snapshots. The shell reads these while a turn is
    /// streaming — they are the only externally observable progress signal.
    pub fn subscribe(&self) -> watch::Receiver<TimelineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    // ── Turns ────────────────────────────────────────────────────────────

    /// Send a chat turn. Blank submissions (no text, no attachment) and
    /// submissions while another generation is in flight are refused
    /// without any state change.
    pub async fn send_text(
        &mut self,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<TurnOutcome, ChatError> {
        self.pump_side_effects();

        if self.phase != TurnPhase::Idle {
            return Ok(TurnOutcome::Rejected);
        }
        if text.trim().is_empty() && attachment.is_none() {
            return Ok(TurnOutcome::Rejected);
        }

        self.record_turn()?;

        // History maps the committed timeline as it stood before this turn;
        // the new text travels separately in the request.
        let history = self.history_for_provider();
        let payload = attachment.as_ref().map(|a| ImagePayload {
            data: a.data.clone(),
            mime_type: a.mime_type.clone(),
        });
        self.timeline.push(Message::user(text, attachment));
        self.publish();

        self.phase = TurnPhase::Streaming;
        let result = self.run_stream(history, text, payload).await;
        self.phase = TurnPhase::Idle;
        self.publish();
        result
    }

    async fn run_stream(
        &mut self,
        history: Vec<HistoryEntry>,
        text: &str,
        image: Option<ImagePayload>,
    ) -> Result<TurnOutcome, ChatError> {
        // Fail fast before any network interaction. `current()` re-reads
        // the backing store, so a key set by another process is found here.
        if !self.credentials.has_access() {
            return Err(ChatError::CredentialMissing);
        }

        let request = ChatRequest {
            subject: self.active_subject,
            history,
            text: text.to_string(),
            image,
        };

        let mut stream = match self.provider.stream_chat(request).await {
            Ok(stream) => stream,
            Err(e) if e.is_credential_missing() => return Err(ChatError::CredentialMissing),
            Err(e) => {
                warn!(error = %e, "chat stream failed to open");
                self.timeline.push(Message::bot(CHAT_APOLOGY));
                return Ok(TurnOutcome::Errored);
            }
        };

        // The streaming placeholder goes in before the first fragment.
        self.timeline.push(Message::streaming_bot());
        self.publish();

        loop {
            match stream.next_event().await {
                Some(StreamEvent::Fragment {
                    text: fragment,
                    grounding_urls,
                }) => {
                    if let Some(msg) = self.streaming_message_mut() {
                        if let Some(fragment) = &fragment {
                            msg.append_text(fragment);
                        }
                        msg.merge_grounding_urls(grounding_urls);
                    }
                    self.publish();
                }
                Some(StreamEvent::Completed) | None => {
                    let settled_chars = match self.timeline.last_mut() {
                        Some(msg) if msg.is_streaming => {
                            msg.settle();
                            msg.text.chars().count()
                        }
                        _ => 0,
                    };
                    self.publish();
                    info!(
                        subject = self.active_subject.as_str(),
                        chars = settled_chars,
                        "chat turn settled"
                    );
                    self.maybe_request_graph(text, settled_chars);
                    return Ok(TurnOutcome::Answered);
                }
                Some(StreamEvent::Failed(e)) if e.is_credential_missing() => {
                    // The placeholder must not survive in the timeline.
                    self.timeline.retain(|m| !m.is_streaming);
                    self.publish();
                    return Err(ChatError::CredentialMissing);
                }
                Some(StreamEvent::Failed(e)) => {
                    warn!(error = %e, "chat stream failed");
                    if let Some(msg) = self.streaming_message_mut() {
                        msg.text = CHAT_APOLOGY.to_string();
                        msg.settle();
                    }
                    self.publish();
                    return Ok(TurnOutcome::Errored);
                }
            }
        }
    }

    /// Generate an illustrative image from a text prompt. Mutually
    /// exclusive with a chat stream — one generation of any kind at a time.
    pub async fn generate_image(&mut self, prompt: &str) -> Result<TurnOutcome, ChatError> {
        self.pump_side_effects();

        if self.phase != TurnPhase::Idle {
            return Ok(TurnOutcome::Rejected);
        }
        if prompt.trim().is_empty() {
            return Ok(TurnOutcome::Rejected);
        }

        self.record_turn()?;
        self.timeline
            .push(Message::user(format!("Generate image: {prompt}"), None));
        self.publish();

        self.phase = TurnPhase::GeneratingImage;
        let result = self.run_image(prompt).await;
        self.phase = TurnPhase::Idle;
        self.publish();
        result
    }

    async fn run_image(&mut self, prompt: &str) -> Result<TurnOutcome, ChatError> {
        if !self.credentials.has_access() {
            return Err(ChatError::CredentialMissing);
        }

        match self.provider.generate_image(prompt).await {
            Ok(image) => {
                let mut msg = Message::bot(IMAGE_CAPTION);
                msg.attachments
                    .push(Attachment::image(image.data, image.mime_type));
                self.timeline.push(msg);
                self.publish();
                Ok(TurnOutcome::ImageDelivered)
            }
            Err(e) if e.is_credential_missing() => Err(ChatError::CredentialMissing),
            Err(e) => {
                warn!(error = %e, "image generation failed");
                self.timeline.push(Message::bot(IMAGE_APOLOGY));
                self.publish();
                Ok(TurnOutcome::Errored)
            }
        }
    }

    // ── Session operations ───────────────────────────────────────────────

    /// Switch the active subject. Keeps the timeline and counters, clears
    /// the current concept graph — even when the subject is unchanged, so
    /// repeated calls are safe. Refused while a generation is in flight.
    pub fn switch_subject(&mut self, subject: Subject) {
        self.pump_side_effects();
        if self.phase != TurnPhase::Idle {
            return;
        }
        self.active_subject = subject;
        self.concept_graph = None;
        self.publish();
    }

    /// Persist the learner profile as a whole. Failure blocks: losing
    /// profile data silently is unacceptable.
    pub fn save_profile(&mut self, profile: UserProfile) -> Result<(), ChatError> {
        self.profile_store.save(&profile)?;
        self.profile = Some(profile);
        self.publish();
        Ok(())
    }

    /// Supply a user credential, effective for the next provider call.
    pub fn set_user_credential(&mut self, secret: &str) -> Result<(), ChatError> {
        self.credentials.set_user_credential(secret)?;
        Ok(())
    }

    /// End the login session: erase the persisted profile, reset the
    /// timeline to the greeting, return to General, and drop any concept
    /// graph (current or queued). Session counters survive logout.
    pub fn logout(&mut self) -> Result<(), ChatError> {
        self.profile_store.clear()?;
        self.profile = None;
        self.timeline = vec![Message::bot(GREETING)];
        self.active_subject = Subject::General;
        self.concept_graph = None;
        while self.graph_rx.try_recv().is_ok() {}
        self.phase = TurnPhase::Idle;
        self.publish();
        info!("logged out");
        Ok(())
    }

    /// Apply any concept graphs delivered since the controller last had
    /// control. Also called at every turn entry point; shells may call it
    /// from their idle loop. A late arrival replaces whatever is current.
    pub fn pump_side_effects(&mut self) {
        let mut applied = false;
        while let Ok(graph) = self.graph_rx.try_recv() {
            self.concept_graph = Some(graph);
            applied = true;
        }
        if applied {
            debug!("concept graph applied");
            self.publish();
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Count an accepted turn and persist the counters. Runs on a copy so
    /// a failed save leaves the in-memory counts untouched — a turn either
    /// fully starts or not at all.
    fn record_turn(&mut self) -> Result<(), ChatError> {
        let mut updated = self.counters.clone();
        let count = updated.increment(self.active_subject);
        self.session_store.save(&updated)?;
        self.counters = updated;
        debug!(
            subject = self.active_subject.as_str(),
            count, "session recorded"
        );
        Ok(())
    }

    fn history_for_provider(&self) -> Vec<HistoryEntry> {
        self.timeline
            .iter()
            .map(|m| HistoryEntry {
                role: match m.sender {
                    Sender::User => ChatRole::User,
                    Sender::Bot => ChatRole::Model,
                },
                text: m.text.clone(),
            })
            .collect()
    }

    fn streaming_message_mut(&mut self) -> Option<&mut Message> {
        self.timeline.last_mut().filter(|m| m.is_streaming)
    }

    /// Spawn the fire-and-forget graph extraction when the trigger policy
    /// fires. Failures are logged and dropped — they never reach the chat
    /// error surface.
    fn maybe_request_graph(&self, user_text: &str, settled_chars: usize) {
        if !should_request_graph(self.active_subject, settled_chars) {
            return;
        }
        let topic = topic_from_prompt(user_text);
        let provider = Arc::clone(&self.provider);
        let tx = self.graph_tx.clone();
        debug!(topic = %topic, "scheduling concept graph extraction");
        tokio::spawn(async move {
            match provider.generate_concept_graph(&topic).await {
                Ok(graph) => {
                    let _ = tx.send(graph);
                }
                Err(e) => debug!(error = %e, "concept graph generation failed"),
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(TimelineSnapshot {
            messages: self.timeline.clone(),
            active_subject: self.active_subject,
            concept_graph: self.concept_graph.clone(),
            busy: self.phase != TurnPhase::Idle,
            total_sessions: self.counters.total(),
        });
    }
}
