//! Applies assistant decisions to a design session.

use bannergenie_types::error::DesignError;
use bannergenie_types::render::RenderJob;
use bannergenie_types::template::Template;

use super::{AssistAction, AssistContext, ChatTurn, DecisionMaker, DesignDecision, Speaker};
use crate::render::client::RenderClient;
use crate::render::poller::Poller;
use crate::session::{DesignSession, StageResult};

/// Turns kept for the decision maker's context.
pub const HISTORY_LIMIT: usize = 8;

/// What one assistant turn did to the session.
#[derive(Debug)]
pub struct AssistTurn {
    pub action: AssistAction,
    pub reply: String,
    /// Template selected this turn, if the decision switched layouts.
    pub switched_to: Option<String>,
    pub staged: Vec<String>,
    /// Edits the session refused, with the reason.
    pub rejected: Vec<(String, DesignError)>,
    /// Layer now waiting for an uploaded image.
    pub awaiting_upload: Option<String>,
    /// Set when the turn rendered, successfully or not.
    pub render: Option<Result<RenderJob, DesignError>>,
}

impl AssistTurn {
    fn new(decision: &DesignDecision) -> Self {
        Self {
            action: decision.action,
            reply: decision.reply.clone(),
            switched_to: None,
            staged: Vec::new(),
            rejected: Vec::new(),
            awaiting_upload: None,
            render: None,
        }
    }

    fn record(&mut self, layer_name: &str, result: Result<StageResult, DesignError>) {
        match result {
            Ok(StageResult::Staged { layer_name, .. }) => self.staged.push(layer_name),
            Ok(StageResult::AwaitingUpload { layer_name }) => {
                self.awaiting_upload = Some(layer_name)
            }
            Err(err) => {
                tracing::debug!(layer = layer_name, error = %err, "assistant edit rejected");
                self.rejected.push((layer_name.to_string(), err));
            }
        }
    }
}

/// Conversation state for assistant mode: the catalog the decision maker
/// chooses from, the recent transcript and an optional attached image.
pub struct DesignAssistant<D> {
    decider: D,
    catalog: Vec<Template>,
    history: Vec<ChatTurn>,
    attachment: Option<String>,
}

impl<D: DecisionMaker> DesignAssistant<D> {
    pub fn new(decider: D) -> Self {
        Self {
            decider,
            catalog: Vec::new(),
            history: Vec::new(),
            attachment: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<Template>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Fetch every template with its layers through `session`.
    pub async fn load_catalog<C: RenderClient, P: Poller>(
        &mut self,
        session: &mut DesignSession<C, P>,
    ) -> Result<usize, DesignError> {
        self.catalog = session.catalog_details().await?;
        tracing::info!(templates = self.catalog.len(), "assistant catalog loaded");
        Ok(self.catalog.len())
    }

    pub fn catalog(&self) -> &[Template] {
        &self.catalog
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Offer `public_url` to the decision maker with the next message.
    pub fn attach_image(&mut self, public_url: impl Into<String>) {
        self.attachment = Some(public_url.into());
    }

    pub fn attachment(&self) -> Option<&str> {
        self.attachment.as_deref()
    }

    /// Decide on `text` and apply the decision to `session`.
    ///
    /// A failed decision leaves the session, transcript and attachment
    /// untouched. Rejected edits do not fail the turn; they are reported in
    /// [`AssistTurn::rejected`].
    #[tracing::instrument(name = "assist.respond", skip_all)]
    pub async fn respond<C: RenderClient, P: Poller>(
        &mut self,
        session: &mut DesignSession<C, P>,
        text: &str,
    ) -> Result<AssistTurn, DesignError> {
        let request = match self.attachment.as_deref() {
            Some(url) => format!(
                "Image context: the user uploaded an image, its URL is {url}. \
                 Their request: {text}"
            ),
            None => text.to_string(),
        };
        let current_modifications = session.modifications().to_ordered_list();
        let context = AssistContext {
            request: &request,
            catalog: &self.catalog,
            current_template: session.template().map(|t| t.uid.as_str()),
            current_modifications: &current_modifications,
            history: &self.history,
        };
        let decision = self.decider.decide(&context).await?;
        self.attachment = None;
        tracing::info!(
            action = %decision.action,
            edits = decision.edits.len(),
            "assistant decided"
        );

        let turn = self.apply(session, &decision).await;
        self.remember(Speaker::User, text);
        self.remember(Speaker::Assistant, &decision.reply);
        turn
    }

    async fn apply<C: RenderClient, P: Poller>(
        &self,
        session: &mut DesignSession<C, P>,
        decision: &DesignDecision,
    ) -> Result<AssistTurn, DesignError> {
        let mut turn = AssistTurn::new(decision);
        match decision.action {
            AssistAction::Modify => {
                let current = session.template().map(|t| t.uid.clone());
                let mut render_after = false;
                match decision.template_uid.as_deref() {
                    Some(uid) if current.as_deref() != Some(uid) => {
                        self.switch_template(session, uid, &mut turn).await?;
                        render_after = current.is_some();
                    }
                    _ if current.is_none() => return Err(DesignError::NoTemplateSelected),
                    _ => {}
                }
                for edit in &decision.edits {
                    let result =
                        session.stage_modification(&edit.layer_name, edit.kind, &edit.value);
                    turn.record(&edit.layer_name, result);
                }
                if render_after {
                    turn.render = Some(session.request_render().await);
                }
            }
            AssistAction::Generate => turn.render = Some(session.request_render().await),
            AssistAction::Reset => session.reset(),
            AssistAction::Converse => {}
        }
        Ok(turn)
    }

    /// Select `uid` and carry the staged edits over to it.
    async fn switch_template<C: RenderClient, P: Poller>(
        &self,
        session: &mut DesignSession<C, P>,
        uid: &str,
        turn: &mut AssistTurn,
    ) -> Result<(), DesignError> {
        if !self.catalog.iter().any(|t| t.uid == uid) {
            return Err(DesignError::ParseFailure(format!(
                "the assistant picked '{uid}', which is not in the catalog"
            )));
        }
        let carried = session.modifications().to_ordered_list();
        session.select_template(uid).await?;
        for m in &carried {
            let result =
                session.stage_modification(&m.layer_name, m.payload.kind(), m.payload.value());
            turn.record(&m.layer_name, result);
        }
        tracing::info!(template = uid, carried = carried.len(), "assistant switched template");
        turn.switched_to = Some(uid.to_string());
        Ok(())
    }

    fn remember(&mut self, speaker: Speaker, text: &str) {
        self.history.push(ChatTurn {
            speaker,
            text: text.to_string(),
        });
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use bannergenie_types::modification::{Modification, PENDING_UPLOAD};
    use bannergenie_types::render::RenderOutcome;
    use bannergenie_types::template::LayerKind;

    use super::*;
    use crate::assist::ProposedEdit;
    use crate::render::poller::BoundedPoller;
    use crate::testing::{MockRenderClient, event_template, sale_template};

    /// Replays queued decisions and records the requests it saw.
    #[derive(Default)]
    struct ScriptedDecider {
        decisions: Mutex<VecDeque<Result<DesignDecision, DesignError>>>,
        requests: Mutex<Vec<String>>,
        history_lens: Mutex<Vec<usize>>,
    }

    impl ScriptedDecider {
        fn with(decisions: Vec<DesignDecision>) -> Self {
            Self {
                decisions: Mutex::new(decisions.into_iter().map(Ok).collect()),
                ..Self::default()
            }
        }
    }

    impl DecisionMaker for ScriptedDecider {
        async fn decide(&self, context: &AssistContext<'_>) -> Result<DesignDecision, DesignError> {
            self.requests.lock().unwrap().push(context.request.to_string());
            self.history_lens.lock().unwrap().push(context.history.len());
            self.decisions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(DesignDecision::converse("...")))
        }
    }

    type TestSession = DesignSession<MockRenderClient, BoundedPoller>;

    fn session() -> TestSession {
        let client = MockRenderClient::new()
            .with_template(sale_template())
            .with_template(event_template());
        DesignSession::new(client, BoundedPoller::new(Duration::from_secs(3), 5))
    }

    fn assistant(decisions: Vec<DesignDecision>) -> DesignAssistant<ScriptedDecider> {
        DesignAssistant::new(ScriptedDecider::with(decisions))
            .with_catalog(vec![sale_template(), event_template()])
    }

    fn modify(uid: Option<&str>, edits: Vec<ProposedEdit>) -> DesignDecision {
        DesignDecision {
            action: AssistAction::Modify,
            template_uid: uid.map(str::to_string),
            edits,
            reply: "Done!".to_string(),
        }
    }

    fn decision(action: AssistAction) -> DesignDecision {
        DesignDecision {
            action,
            template_uid: None,
            edits: Vec::new(),
            reply: "Sure.".to_string(),
        }
    }

    fn title(value: &str) -> ProposedEdit {
        ProposedEdit::new("title", LayerKind::Text, value)
    }

    #[tokio::test]
    async fn first_modify_selects_template_and_stages_every_edit() {
        let mut s = session();
        let mut a = assistant(vec![modify(
            Some("tpl_sale"),
            vec![
                title("Summer Sale"),
                ProposedEdit::new("photo", LayerKind::Image, "https://img.example/beach.jpg"),
            ],
        )]);

        let turn = a.respond(&mut s, "make a summer sale banner").await.unwrap();

        assert_eq!(turn.action, AssistAction::Modify);
        assert_eq!(turn.switched_to.as_deref(), Some("tpl_sale"));
        assert_eq!(turn.staged, vec!["title", "photo"]);
        assert!(turn.rejected.is_empty());
        assert!(turn.render.is_none());
        assert_eq!(s.template().unwrap().uid, "tpl_sale");
        assert_eq!(s.modifications().len(), 2);
        assert_eq!(s.client().submit_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_layers_are_rejected_but_valid_edits_still_stage() {
        let mut s = session();
        let mut a = assistant(vec![modify(
            Some("tpl_sale"),
            vec![
                title("Flash Sale"),
                ProposedEdit::new("price", LayerKind::Text, "$950,000"),
                ProposedEdit::new("photo", LayerKind::Image, "not a url"),
            ],
        )]);

        let turn = a.respond(&mut s, "flash sale, price 950k").await.unwrap();

        assert_eq!(turn.staged, vec!["title"]);
        let rejected: Vec<&str> = turn.rejected.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(rejected, vec!["price", "photo"]);
        assert!(matches!(turn.rejected[0].1, DesignError::UnknownLayer { .. }));
        assert!(matches!(turn.rejected[1].1, DesignError::InvalidValue { .. }));
        assert_eq!(s.modifications().len(), 1);
    }

    #[tokio::test]
    async fn pending_upload_edit_sets_marker() {
        let mut s = session();
        let mut a = assistant(vec![modify(
            Some("tpl_sale"),
            vec![ProposedEdit::new("photo", LayerKind::Image, PENDING_UPLOAD)],
        )]);

        let turn = a.respond(&mut s, "I'll upload a photo").await.unwrap();

        assert_eq!(turn.awaiting_upload.as_deref(), Some("photo"));
        assert_eq!(s.pending_upload(), Some("photo"));
        assert!(s.modifications().is_empty());
    }

    #[tokio::test]
    async fn modify_without_any_template_fails() {
        let mut s = session();
        let mut a = assistant(vec![modify(None, vec![title("Hi")])]);

        let err = a.respond(&mut s, "set the title").await.unwrap_err();

        assert!(matches!(err, DesignError::NoTemplateSelected));
        assert_eq!(s.client().details_calls(), 0);
    }

    #[tokio::test]
    async fn template_outside_catalog_is_refused() {
        let mut s = session();
        let mut a = assistant(vec![modify(Some("tpl_made_up"), vec![title("Hi")])]);

        let err = a.respond(&mut s, "banner please").await.unwrap_err();

        assert!(matches!(err, DesignError::ParseFailure(_)));
        assert!(s.template().is_none());
        assert_eq!(s.client().details_calls(), 0);
    }

    #[tokio::test]
    async fn same_template_modify_updates_in_place() {
        let mut s = session();
        let mut a = assistant(vec![
            modify(Some("tpl_sale"), vec![title("Sale")]),
            modify(Some("tpl_sale"), vec![title("Mega Sale")]),
        ]);

        a.respond(&mut s, "sale banner").await.unwrap();
        let turn = a.respond(&mut s, "make it a mega sale").await.unwrap();

        assert_eq!(turn.switched_to, None);
        assert_eq!(s.client().details_calls(), 1);
        assert_eq!(
            s.modifications().to_ordered_list(),
            vec![Modification::text("title", "Mega Sale")]
        );
    }

    #[tokio::test]
    async fn switching_template_carries_edits_over_and_renders() {
        let mut s = session();
        s.select_template("tpl_event").await.unwrap();
        s.stage_modification("headline", LayerKind::Text, "Launch Party")
            .unwrap();
        s.stage_modification("background", LayerKind::Color, "#000000")
            .unwrap();
        let mut a = assistant(vec![modify(Some("tpl_sale"), vec![title("Launch Sale")])]);

        let turn = a.respond(&mut s, "I don't like this layout").await.unwrap();

        assert_eq!(turn.switched_to.as_deref(), Some("tpl_sale"));
        // Neither event layer exists on the sale template.
        let rejected: Vec<&str> = turn.rejected.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(rejected, vec!["headline", "background"]);
        assert_eq!(turn.staged, vec!["title"]);

        let job = turn.render.unwrap().unwrap();
        assert_eq!(job.template_uid, "tpl_sale");
        let submitted = s.client().submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].1, vec![Modification::text("title", "Launch Sale")]);
    }

    #[tokio::test]
    async fn carried_edits_survive_when_layers_match() {
        let mut alt = sale_template();
        alt.uid = "tpl_sale_alt".to_string();
        let client = MockRenderClient::new()
            .with_template(sale_template())
            .with_template(alt.clone());
        let mut s = DesignSession::new(client, BoundedPoller::new(Duration::from_secs(3), 5));
        let mut a = DesignAssistant::new(ScriptedDecider::with(vec![
            modify(Some("tpl_sale"), vec![title("Open House")]),
            modify(Some("tpl_sale_alt"), Vec::new()),
        ]))
        .with_catalog(vec![sale_template(), alt]);

        a.respond(&mut s, "open house flyer").await.unwrap();
        let turn = a.respond(&mut s, "try another layout").await.unwrap();

        assert_eq!(turn.staged, vec!["title"]);
        assert!(turn.rejected.is_empty());
        assert_eq!(s.template().unwrap().uid, "tpl_sale_alt");
        let submitted = s.client().submitted();
        assert_eq!(submitted[0].0, "tpl_sale_alt");
        assert_eq!(submitted[0].1, vec![Modification::text("title", "Open House")]);
    }

    #[tokio::test]
    async fn generate_renders_and_reports_failures_in_turn() {
        let mut s = session();
        let mut a = assistant(vec![
            decision(AssistAction::Generate),
            modify(Some("tpl_sale"), vec![title("Sale")]),
            decision(AssistAction::Generate),
        ]);

        let turn = a.respond(&mut s, "show me").await.unwrap();
        assert!(matches!(turn.render, Some(Err(DesignError::NoTemplateSelected))));

        a.respond(&mut s, "sale banner").await.unwrap();
        s.client().push_submit(Ok(RenderOutcome::Failed {
            reason: "font missing".to_string(),
        }));
        let turn = a.respond(&mut s, "let's see it").await.unwrap();
        assert!(matches!(
            turn.render,
            Some(Err(DesignError::RenderFailed { ref reason })) if reason == "font missing"
        ));
    }

    #[tokio::test]
    async fn reset_clears_session_and_converse_changes_nothing() {
        let mut s = session();
        let mut a = assistant(vec![
            modify(Some("tpl_sale"), vec![title("Sale")]),
            decision(AssistAction::Converse),
            decision(AssistAction::Reset),
        ]);

        a.respond(&mut s, "sale banner").await.unwrap();
        let turn = a.respond(&mut s, "thanks!").await.unwrap();
        assert_eq!(turn.reply, "Sure.");
        assert_eq!(s.modifications().len(), 1);

        a.respond(&mut s, "start over").await.unwrap();
        assert!(s.template().is_none());
        assert!(s.modifications().is_empty());
    }

    #[tokio::test]
    async fn attachment_is_sent_once() {
        let mut s = session();
        let mut a = assistant(Vec::new());
        a.attach_image("https://img.host/p.png");

        a.respond(&mut s, "use this as the photo").await.unwrap();
        a.respond(&mut s, "thanks").await.unwrap();

        let requests = a.decider.requests.lock().unwrap().clone();
        assert!(requests[0].contains("https://img.host/p.png"));
        assert!(requests[0].ends_with("Their request: use this as the photo"));
        assert_eq!(requests[1], "thanks");
        assert_eq!(a.attachment(), None);
    }

    #[tokio::test]
    async fn failed_decision_keeps_attachment_and_history() {
        let mut s = session();
        let mut a = DesignAssistant::new(ScriptedDecider {
            decisions: Mutex::new(VecDeque::from([Err(DesignError::ParseFailure(
                "language model unavailable".to_string(),
            ))])),
            ..ScriptedDecider::default()
        });
        a.attach_image("https://img.host/p.png");

        assert!(a.respond(&mut s, "hello").await.is_err());
        assert_eq!(a.attachment(), Some("https://img.host/p.png"));
        assert!(a.history().is_empty());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let mut s = session();
        let mut a = assistant(Vec::new());

        for i in 0..6 {
            a.respond(&mut s, &format!("message {i}")).await.unwrap();
        }

        assert_eq!(a.history().len(), HISTORY_LIMIT);
        assert_eq!(a.history()[0].text, "message 2");
        assert_eq!(a.history()[0].speaker, Speaker::User);
        let lens = a.decider.history_lens.lock().unwrap().clone();
        assert_eq!(lens, vec![0, 2, 4, 6, 8, 8]);
    }

    #[tokio::test]
    async fn load_catalog_reads_details_through_session() {
        let mut s = session();
        let mut a = DesignAssistant::new(ScriptedDecider::default());

        assert_eq!(a.load_catalog(&mut s).await.unwrap(), 2);
        assert_eq!(a.catalog()[1].uid, "tpl_event");
        assert!(s.template().is_none());
    }
}
