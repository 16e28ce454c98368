use crate::client::{HttpLokiClient, LokiClient, Stream, StreamEntry};
use crate::{entry, LokiConfig};
use anyhow::Context as _;
use models::{reason, EvalState, HistoryFrame, HistoryQuery, RuleMeta, StateTransition};
use std::collections::BTreeMap;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Records alert state transitions to a remote Loki store, off the
/// evaluation hot path. All state is captured at construction; concurrent
/// record calls share nothing mutable.
pub struct LokiBackend<C = HttpLokiClient> {
    client: C,
    external_labels: BTreeMap<String, String>,
}

impl LokiBackend<HttpLokiClient> {
    pub fn new(cfg: &LokiConfig) -> crate::Result<Self> {
        Ok(Self {
            client: HttpLokiClient::new(cfg)?,
            external_labels: cfg.external_labels.clone(),
        })
    }
}

impl<C> LokiBackend<C>
where
    C: LokiClient + Clone + Send + Sync + 'static,
{
    /// Build a backend over an arbitrary client implementation.
    pub fn with_client(client: C, external_labels: BTreeMap<String, String>) -> Self {
        Self {
            client,
            external_labels,
        }
    }

    /// Verify connectivity and auth against the store. For configuration
    /// validation; not called on the write path.
    pub async fn test_connection(&self) -> anyhow::Result<()> {
        self.client
            .ping()
            .await
            .context("connecting to Loki state history store")?;
        Ok(())
    }

    /// Record a batch of transitions belonging to `rule`.
    ///
    /// Filtering, encoding and grouping happen synchronously; the push to
    /// Loki runs on a spawned task, so this never blocks on network I/O.
    /// Exactly one terminal result is delivered on the returned channel:
    /// Ok once the batch is saved (immediately, if nothing in the batch is
    /// worth recording), or the push error. Dropping the receiver is fine;
    /// failures are also logged here.
    ///
    /// Cancelling `cancel` while the push is in flight fails the push, and
    /// that failure is delivered like any other.
    pub fn record_states_async(
        &self,
        cancel: CancellationToken,
        rule: &RuleMeta,
        transitions: &[StateTransition],
    ) -> oneshot::Receiver<anyhow::Result<()>> {
        let (streams, skipped) = self.states_to_streams(rule, transitions);

        let recorded: usize = streams.iter().map(|stream| stream.values.len()).sum();
        metrics::counter!("state_history_transitions_recorded").increment(recorded as u64);
        metrics::counter!("state_history_transitions_dropped").increment(skipped as u64);

        let (tx, rx) = oneshot::channel();
        if streams.is_empty() {
            let _ = tx.send(Ok(()));
            return rx;
        }

        let span = tracing::info_span!("record_states", org_id = rule.org_id, rule_uid = %rule.uid);
        let client = self.client.clone();
        tokio::spawn(
            async move {
                let result = tokio::select! {
                    () = cancel.cancelled() => Err(crate::Error::Cancelled),
                    result = client.push(streams) => result,
                };

                match result {
                    Ok(()) => {
                        tracing::debug!("done saving alert state history batch");
                        let _ = tx.send(Ok(()));
                    }
                    Err(err) => {
                        metrics::counter!("state_history_batches_failed").increment(1);
                        tracing::error!(error = ?err, "failed to save alert state history batch");
                        let _ = tx.send(Err(anyhow::Error::new(err)
                            .context("failed to save alert state history batch")));
                    }
                }
            }
            .instrument(span),
        );
        rx
    }

    /// Read back recorded history. Filtering is not implemented for any
    /// query shape yet; callers receive an empty frame rather than an error.
    pub async fn query_states(&self, _query: &HistoryQuery) -> anyhow::Result<HistoryFrame> {
        Ok(HistoryFrame::new("states"))
    }

    /// Bucket `transitions` into streams keyed by their fully-qualified
    /// label set. Also returns how many transitions were dropped on the way.
    fn states_to_streams(
        &self,
        rule: &RuleMeta,
        transitions: &[StateTransition],
    ) -> (Vec<Stream>, usize) {
        let mut buckets: BTreeMap<String, Vec<StreamEntry>> = BTreeMap::new();
        let mut skipped = 0;

        for transition in transitions {
            if !should_record(transition) {
                continue;
            }

            let mut stream_labels = transition.labels.without_private();
            for (name, value) in &self.external_labels {
                stream_labels.set_value(name, value);
            }
            stream_labels.set_value(labels::ORG_ID, &rule.org_id.to_string());
            stream_labels.set_value(labels::RULE_UID, &rule.uid);
            stream_labels.set_value(labels::GROUP, &rule.group);
            stream_labels.set_value(labels::FOLDER_UID, &rule.namespace_uid);
            let repr = labels::encode::canonical(&stream_labels);

            let line = match entry::encode(transition) {
                Ok(line) => line,
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode history record for state, skipping");
                    skipped += 1;
                    continue;
                }
            };

            buckets.entry(repr).or_default().push(StreamEntry {
                at: transition.last_evaluation_time,
                line,
            });
        }

        let mut streams = Vec::with_capacity(buckets.len());
        for (repr, values) in buckets {
            // The key was rendered from a LabelSet moments ago; failing to
            // parse it back is a bug, not a runtime condition.
            let stream = match labels::parse::label_set(&repr) {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::error!(error = %err, "failed to parse stream labels, skipping state history stream");
                    skipped += values.len();
                    continue;
                }
            };
            streams.push(Stream { stream, values });
        }

        (streams, skipped)
    }
}

/// Whether a transition is noteworthy enough to record.
pub fn should_record(transition: &StateTransition) -> bool {
    if !transition.changed() {
        return false;
    }
    // Stale series are swept to Normal by cleanup rather than by an actual
    // evaluation; those synthetic transitions say nothing about the rule.
    if transition.state == EvalState::Normal
        && transition.state_reason.as_deref() == Some(reason::MISSING_SERIES)
    {
        return false;
    }
    true
}
