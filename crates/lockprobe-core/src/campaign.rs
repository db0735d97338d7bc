//! The fuzzing loop.
//!
//! Each outer round selects one queue entry by weight, spends its energy on
//! mutated candidates (duplicates are skipped without spending energy), runs
//! every fresh candidate through a full connection cycle and feeds the result
//! to the oracle. Rounds end with one decay pass over the queue.

use std::future::Future;
use std::pin::Pin;

use lockprobe_explore::mutate::Mutator;
use lockprobe_explore::oracle::{InterestingnessOracle, SignatureSet};
use lockprobe_explore::rng::{campaign_rng, SELECTION_STREAM};
use lockprobe_explore::schedule::{assign_energy, SeedSelector, WeightedSelector};
use lockprobe_explore::CommandSequence;
use lockprobe_transport::Transport;
use tracing::{debug, info, warn};

use crate::config::{CampaignConfig, FuzzConfig};
use crate::findings::FindingRecord;
use crate::session::{Session, SessionError};
use crate::summary::{RunSummary, StopReason};
use crate::supervisor::{ConnectionSupervisor, CycleError, CycleOutcome};

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error(transparent)]
    Persist(#[from] SessionError),
}

/// A running campaign over one transport.
pub struct Campaign<T, M> {
    config: CampaignConfig,
    session: Session,
    transport: T,
    mutator: M,
    selector: WeightedSelector,
    supervisor: ConnectionSupervisor,
    oracle: InterestingnessOracle,
    cycle: u64,
    summary: RunSummary,
}

impl<T: Transport, M: Mutator> Campaign<T, M> {
    pub fn new(config: &FuzzConfig, session: Session, transport: T, mutator: M) -> Self {
        let selector =
            WeightedSelector::new(campaign_rng(config.campaign.rng_seed, SELECTION_STREAM));
        let supervisor = ConnectionSupervisor::new(
            config.supervisor.clone(),
            SignatureSet::new(&config.signatures.boot),
            SignatureSet::new(&config.signatures.crash),
        );
        let oracle = InterestingnessOracle::new(SignatureSet::new(&config.signatures.crash));

        Self {
            config: config.campaign.clone(),
            session,
            transport,
            mutator,
            selector,
            supervisor,
            oracle,
            cycle: 0,
            summary: RunSummary::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run until the iteration budget is spent, the queue is empty or
    /// `shutdown` resolves. The queue is persisted on every path.
    pub async fn run<F>(mut self, shutdown: F) -> Result<RunSummary, CampaignError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let stop = self.fuzz_loop(shutdown.as_mut()).await;
        if stop == StopReason::Interrupted {
            info!(cycle = self.cycle, "interrupted, shutting down");
            self.supervisor.force_disconnect(&mut self.transport).await;
        }

        let mut summary = self.summary;
        summary.stop_reason = stop;
        summary.findings_written = self.session.findings_written();
        summary.queue_len = self.session.queue().len();
        summary.queue_path = Some(self.session.close()?);

        info!(
            stop_reason = ?summary.stop_reason,
            executions = summary.executions,
            interesting = summary.interesting,
            crashes = summary.crashes,
            "campaign finished"
        );
        Ok(summary)
    }

    async fn fuzz_loop<F>(&mut self, mut shutdown: Pin<&mut F>) -> StopReason
    where
        F: Future<Output = ()>,
    {
        for iteration in 0..self.config.max_iterations {
            tokio::select! {
                biased;
                _ = shutdown.as_mut() => return StopReason::Interrupted,
                _ = std::future::ready(()) => {}
            }

            let Some(decision) = self.selector.choose_next(self.session.queue()) else {
                return StopReason::EmptyQueue;
            };
            let Some(seed) = self
                .session
                .queue()
                .get(decision.index)
                .map(|entry| entry.sequence.clone())
            else {
                return StopReason::EmptyQueue;
            };

            let energy = assign_energy(&seed);
            let max_draws = energy.saturating_mul(self.config.max_draws_per_energy);
            info!(
                iteration,
                seed = %seed,
                weight = decision.weight_used,
                energy,
                selector = self.selector.name(),
                "round started"
            );

            let mut spent = 0u32;
            let mut draws = 0u32;
            while spent < energy && draws < max_draws {
                draws += 1;
                let candidate = self.mutator.mutate(&seed);
                if !self.session.seen.tested.insert(candidate.clone()) {
                    debug!(candidate = %candidate, "duplicate skipped");
                    self.summary.duplicates_skipped += 1;
                    continue;
                }
                spent += 1;
                self.cycle += 1;
                let cycle = self.cycle;

                let outcome = tokio::select! {
                    biased;
                    _ = shutdown.as_mut() => return StopReason::Interrupted,
                    outcome = self.supervisor.run_cycle(&mut self.transport, cycle, &candidate) => outcome,
                };
                self.record(cycle, candidate, outcome).await;

                tokio::select! {
                    biased;
                    _ = shutdown.as_mut() => return StopReason::Interrupted,
                    _ = self.supervisor.reconnect_pause() => {}
                }
            }
            if spent < energy {
                warn!(
                    iteration,
                    spent,
                    energy,
                    draws,
                    mutator = self.mutator.name(),
                    "round ended early, draw limit reached"
                );
            }

            self.session.queue.decay_all(self.config.decay_factor);
            self.summary.iterations_completed += 1;
            self.log_snapshot(iteration);
        }
        StopReason::Complete
    }

    async fn record(
        &mut self,
        cycle: u64,
        candidate: CommandSequence,
        outcome: Result<CycleOutcome, CycleError>,
    ) {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(cycle, error = %err, "cycle failed");
                self.summary.cycle_errors += 1;
                self.supervisor.force_disconnect(&mut self.transport).await;
                return;
            }
        };

        let verdict = self.oracle.assess(&mut self.session.seen, &outcome.result);
        let interesting = verdict.is_interesting();
        self.summary.executions += 1;
        self.summary.write_failures += verdict.write_failures as u64;
        self.summary.non_success_responses += verdict.non_success as u64;
        if interesting {
            self.summary.interesting += 1;
        }
        if verdict.crash_detected {
            self.summary.crashes += 1;
        }

        if let Some(label) = verdict.label() {
            let record = FindingRecord {
                label,
                cycle,
                input: &candidate,
                lock_state: outcome.lock_state,
                log_lines: &outcome.result.log_lines,
            };
            match self.session.findings.write(&record) {
                Ok(path) => info!(cycle, %label, path = %path.display(), "finding saved"),
                Err(err) => warn!(cycle, error = %err, "could not save finding"),
            }
        }

        info!(
            cycle,
            input = %candidate,
            interesting,
            rebooted = outcome.rebooted,
            lock_state = %outcome.lock_state,
            new_logs = verdict.new_log_signatures,
            new_responses = verdict.new_response_signatures,
            "executed"
        );

        let weight = if interesting {
            self.config.high_weight
        } else {
            self.config.low_weight
        };
        self.session.queue.append(candidate, weight);
    }

    fn log_snapshot(&self, iteration: u64) {
        for (rank, entry) in self
            .session
            .queue()
            .top(self.config.snapshot_size)
            .into_iter()
            .enumerate()
        {
            info!(
                iteration,
                rank = rank + 1,
                weight = entry.weight,
                input = %entry.sequence,
                "queue snapshot"
            );
        }
    }
}
