//! Thread reconstruction.
//!
//! Rebuilds conversation threads from a flat list of messages in three passes:
//! - group messages by normalized subject
//! - cluster each group by participant overlap
//! - split clusters wherever consecutive dated messages are too far apart
//!
//! Every pass preserves input order, so identical input always yields
//! identical threads and identifiers.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use crate::config::ThreadingSettings;
use crate::domain::{Message, Thread, ThreadBuilder, ThreadId};
use crate::text::normalize_subject;

/// Groups messages into threads.
#[derive(Debug, Clone)]
pub struct ThreadReconstructor {
    similarity_threshold: f64,
    max_gap: Duration,
}

impl Default for ThreadReconstructor {
    fn default() -> Self {
        Self::from_settings(&ThreadingSettings::default())
    }
}

impl ThreadReconstructor {
    /// Creates a reconstructor.
    ///
    /// The threshold is clamped to `[0, 1]`; a NaN threshold falls back to the
    /// default of `0.7`. A negative gap counts as zero days.
    pub fn new(similarity_threshold: f64, max_gap_days: i64) -> Self {
        let similarity_threshold = if similarity_threshold.is_nan() {
            ThreadingSettings::default().similarity_threshold
        } else {
            similarity_threshold.clamp(0.0, 1.0)
        };
        Self {
            similarity_threshold,
            max_gap: Duration::days(max_gap_days.max(0)),
        }
    }

    pub fn from_settings(settings: &ThreadingSettings) -> Self {
        Self::new(settings.similarity_threshold, settings.max_gap_days)
    }

    /// Builds threads, numbering them `THREAD_001`, `THREAD_002`, ... in
    /// creation order.
    ///
    /// Every input message lands in exactly one thread.
    pub fn build_threads<'a>(&self, messages: &'a [Message]) -> Vec<Thread<'a>> {
        tracing::info!(messages = messages.len(), "Reconstructing threads");

        let mut threads = Vec::new();
        for group in group_by_subject(messages) {
            for cluster in self.cluster_by_participants(group) {
                for segment in self.split_by_time_gap(cluster) {
                    let mut builder = ThreadBuilder::new(ThreadId::sequential(threads.len() + 1));
                    builder.extend(segment);
                    threads.push(builder.build());
                }
            }
        }

        tracing::info!(threads = threads.len(), "Threads reconstructed");
        threads
    }

    /// Greedy first-match clustering over a subject group, in input order.
    ///
    /// A message joins the first cluster whose accumulated participants cover
    /// at least `similarity_threshold` of its own participants. Clusters with
    /// no participants never match.
    fn cluster_by_participants<'a>(&self, group: Vec<&'a Message>) -> Vec<Vec<&'a Message>> {
        let mut clusters: Vec<(Vec<&'a Message>, HashSet<&'a str>)> = Vec::new();

        for message in group {
            let participants = message.participants();
            let denominator = participants.len().max(1) as f64;

            let target = clusters.iter().position(|(_, known)| {
                if known.is_empty() {
                    return false;
                }
                let overlap = participants.intersection(known).count() as f64;
                overlap / denominator >= self.similarity_threshold
            });

            match target {
                Some(idx) => {
                    let (members, known) = &mut clusters[idx];
                    members.push(message);
                    known.extend(participants);
                }
                None => clusters.push((vec![message], participants)),
            }
        }

        clusters.into_iter().map(|(members, _)| members).collect()
    }

    /// Orders a cluster by date and cuts it wherever two consecutive dated
    /// messages are more than `max_gap` apart.
    ///
    /// Undated messages sort first and never cause a split.
    fn split_by_time_gap<'a>(&self, mut cluster: Vec<&'a Message>) -> Vec<Vec<&'a Message>> {
        cluster.sort_by_key(|m| m.date);

        let mut segments: Vec<Vec<&'a Message>> = Vec::new();
        let mut current: Vec<&'a Message> = Vec::new();

        for message in cluster {
            let split = match (current.last().and_then(|m| m.date), message.date) {
                (Some(previous), Some(date)) => date - previous > self.max_gap,
                _ => false,
            };
            if split {
                segments.push(std::mem::take(&mut current));
            }
            current.push(message);
        }

        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

/// Buckets messages by normalized subject, in order of first appearance.
fn group_by_subject(messages: &[Message]) -> Vec<Vec<&Message>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<&Message>> = Vec::new();

    for message in messages {
        let key = normalize_subject(&message.subject);
        match index.get(&key) {
            Some(&idx) => groups[idx].push(message),
            None => {
                tracing::trace!(subject = %key, "New subject group");
                index.insert(key, groups.len());
                groups.push(vec![message]);
            }
        }
    }

    groups
}

/// Reconstructs threads with explicit parameters.
pub fn build_threads(
    messages: &[Message],
    similarity_threshold: f64,
    max_gap_days: i64,
) -> Vec<Thread<'_>> {
    ThreadReconstructor::new(similarity_threshold, max_gap_days).build_threads(messages)
}
