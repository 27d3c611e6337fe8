//! Asynchronous, bounded finalization of an outcome.
//!
//! Flushing drains every child edge in registration order, numbers the
//! resulting trail and either hands it to the parent or writes it to the
//! sink. All waiting happens on a detached task, and every wait is bounded by
//! the flush timeout, so an abandoned branch can delay its parent but never
//! hang it.

use super::{AsyncLogPackage, ChildReport, Outcome};
use crate::entry::{EntryTag, LogEntry};
use crate::level::Level;
use std::future::Future;
use std::panic::Location;
use tokio::sync::oneshot;

/// Prefix marking lines absorbed from a child.
pub const INHERITED_PREFIX: &str = "-";

/// Replaces newlines when the trail is flattened onto one line.
const FLAT_SEPARATOR: &str = "  :|: ";

/// Where a flushed trail ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Root trail written to the sink.
    Printed,
    /// Root trail withheld because of `errors_only`.
    Suppressed,
    /// Child trail received by the parent.
    SentToParent,
    /// Parent never received it; written through the degraded channel.
    Degraded,
}

/// Summary of a completed flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Numbered trail lines, own and inherited.
    pub messages: Vec<String>,
    /// Final level, including everything drained from children.
    pub level: Level,
    /// The trail as it is written to a sink.
    pub output: String,
    /// What happened to the trail.
    pub delivery: Delivery,
}

/// Handle to a detached flush.
///
/// Dropping it is fine; the flush carries on regardless.
#[derive(Debug)]
pub struct FlushHandle {
    done: oneshot::Receiver<FlushReport>,
}

impl FlushHandle {
    /// Wait for the flush to finish.
    ///
    /// Returns `None` if the flush task died before reporting.
    pub async fn wait(self) -> Option<FlushReport> {
        self.done.await.ok()
    }
}

enum TrailLine {
    Own(LogEntry),
    Inherited(String),
}

impl Outcome {
    /// Finalize this outcome without blocking the caller.
    ///
    /// Consumes the outcome, so a second flush cannot happen. The work runs
    /// on the ambient Tokio runtime, or on a dedicated thread when there is
    /// none.
    pub fn flush(self) -> FlushHandle {
        let (done, receiver) = oneshot::channel();
        let work = async move {
            let report = self.finalize().await;
            let _ = done.send(report);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(work);
            }
            Err(_) => spawn_on_dedicated_thread(work),
        }

        FlushHandle { done: receiver }
    }

    async fn finalize(mut self) -> FlushReport {
        let timeout = self.settings.flush_timeout;
        let mut lines: Vec<TrailLine> = std::mem::take(&mut self.entries)
            .into_iter()
            .map(TrailLine::Own)
            .collect();

        let children = std::mem::take(&mut self.children);
        for (index, child) in children.into_iter().enumerate() {
            let number = index + 1;
            match tokio::time::timeout(timeout, child).await {
                Ok(Ok(report)) => {
                    // A failed receipt means the child gave up and wrote its trail itself.
                    if report.receipt.send(()).is_err() {
                        tracing::debug!(child = number, "child trail already written locally");
                        self.level.raise(Level::Info);
                        lines.push(TrailLine::Own(LogEntry::contextual(
                            EntryTag::Info,
                            format!(
                                "CHILD #{} REPORTED TOO LATE, its trail was written separately",
                                number
                            ),
                            Location::caller(),
                        )));
                        continue;
                    }
                    self.level.raise(report.package.level);
                    lines.extend(
                        report
                            .package
                            .messages
                            .into_iter()
                            .map(TrailLine::Inherited),
                    );
                }
                Ok(Err(_)) => {
                    tracing::warn!(child = number, "child outcome dropped without flushing");
                    self.level.raise(Level::Error);
                    lines.push(TrailLine::Own(LogEntry::contextual(
                        EntryTag::Error,
                        format!(
                            "CHILD #{} WAS DROPPED WITHOUT FLUSHING, continuing without it",
                            number
                        ),
                        Location::caller(),
                    )));
                }
                Err(_) => {
                    tracing::warn!(
                        child = number,
                        timeout_ms = timeout.as_millis() as u64,
                        "child outcome did not report back in time"
                    );
                    self.level.raise(Level::Error);
                    lines.push(TrailLine::Own(LogEntry::contextual(
                        EntryTag::Error,
                        format!(
                            "CHILD #{} DID NOT REPORT BACK within {:?}, flushing without it",
                            number, timeout
                        ),
                        Location::caller(),
                    )));
                }
            }
        }

        let messages = number_lines(lines, self.settings.beautify);
        let output = join_lines(&messages, self.settings.beautify);

        let delivery = match self.parent.take() {
            Some(parent) => self.hand_off(parent, &messages, &output).await,
            None if self.settings.errors_only && self.level < Level::Error => Delivery::Suppressed,
            None => {
                self.sink.write_trail(&output);
                Delivery::Printed
            }
        };

        FlushReport {
            messages,
            level: self.level,
            output,
            delivery,
        }
    }

    async fn hand_off(
        &self,
        parent: oneshot::Sender<ChildReport>,
        messages: &[String],
        output: &str,
    ) -> Delivery {
        let (receipt, received) = oneshot::channel();
        let report = ChildReport {
            package: AsyncLogPackage {
                messages: messages.to_vec(),
                level: self.level,
            },
            receipt,
        };

        if parent.send(report).is_err() {
            tracing::warn!("parent outcome is gone, writing child trail locally");
            self.sink.write_degraded(output);
            return Delivery::Degraded;
        }

        let mut received = received;
        match tokio::time::timeout(self.settings.flush_timeout, &mut received).await {
            Ok(Ok(())) => Delivery::SentToParent,
            Ok(Err(_)) => {
                tracing::warn!("parent outcome discarded child trail unread");
                self.sink.write_degraded(output);
                Delivery::Degraded
            }
            Err(_) => {
                // Closing first keeps a late parent from also taking the trail.
                received.close();
                if received.try_recv().is_ok() {
                    return Delivery::SentToParent;
                }
                tracing::warn!(
                    timeout_ms = self.settings.flush_timeout.as_millis() as u64,
                    "parent outcome not listening, writing child trail locally"
                );
                self.sink.write_degraded(output);
                Delivery::Degraded
            }
        }
    }
}

/// Own lines get ordinals (`N) ` or `N ` when beautified), inherited lines
/// get [`INHERITED_PREFIX`].
fn number_lines(lines: Vec<TrailLine>, beautify: bool) -> Vec<String> {
    let mut ordinal = 0usize;
    lines
        .into_iter()
        .map(|line| match line {
            TrailLine::Own(entry) => {
                let rendered = if beautify {
                    format!("{} {}", ordinal, entry.render())
                } else {
                    format!("{}) {}", ordinal, entry.render())
                };
                ordinal += 1;
                rendered
            }
            TrailLine::Inherited(text) => format!("{}{}", INHERITED_PREFIX, text),
        })
        .collect()
}

fn join_lines(lines: &[String], beautify: bool) -> String {
    let joined = lines.join("\n");
    if beautify {
        joined
    } else {
        joined.replace('\n', FLAT_SEPARATOR)
    }
}

fn spawn_on_dedicated_thread<F>(work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let spawned = std::thread::Builder::new()
        .name("tether-flush".to_string())
        .spawn(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(runtime) => runtime.block_on(work),
                Err(err) => {
                    tracing::error!(error = %err, "could not start runtime for outcome flush");
                }
            }
        });

    if let Err(err) = spawned {
        tracing::error!(error = %err, "could not spawn outcome flush thread");
    }
}
