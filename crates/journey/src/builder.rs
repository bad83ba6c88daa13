//! Session-to-conversion matching.
//!
//! A session qualifies for a conversion when both belong to the same user and
//! the session happened strictly before the conversion. Among the qualifying
//! sessions of one conversion, the latest is the last touch. Ties on the
//! timestamp go to the greatest session id so each conversion has exactly one.

use std::collections::HashMap;

use attribution_core::{Conversion, CustomerJourney, Session};
use tracing::{debug, info};

/// Build one journey per qualifying (conversion, session) pair.
///
/// Output is ordered by user, session time, conversion id, then session id.
/// Conversions without a qualifying session produce nothing.
pub fn build_journeys(conversions: &[Conversion], sessions: &[Session]) -> Vec<CustomerJourney> {
    info!(
        conversions = conversions.len(),
        sessions = sessions.len(),
        "Matching sessions to conversions"
    );

    let mut sessions_by_user: HashMap<&str, Vec<&Session>> = HashMap::new();
    for session in sessions {
        sessions_by_user
            .entry(session.user_id.as_str())
            .or_default()
            .push(session);
    }

    let mut keyed: Vec<(&str, CustomerJourney)> = Vec::new();
    let mut unmatched = 0usize;

    for conversion in conversions {
        let qualifying: Vec<&Session> = sessions_by_user
            .get(conversion.user_id.as_str())
            .map(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .filter(|s| s.event_timestamp < conversion.conv_timestamp)
                    .collect()
            })
            .unwrap_or_default();

        let Some(last_touch) = qualifying
            .iter()
            .max_by(|a, b| {
                a.event_timestamp
                    .cmp(&b.event_timestamp)
                    .then_with(|| a.session_id.cmp(&b.session_id))
            })
            .map(|s| s.session_id.as_str())
        else {
            unmatched += 1;
            debug!(conversion_id = %conversion.conversion_id, "No session precedes conversion");
            continue;
        };

        for session in &qualifying {
            keyed.push((
                conversion.user_id.as_str(),
                CustomerJourney {
                    conversion_id: conversion.conversion_id.clone(),
                    session_id: session.session_id.clone(),
                    timestamp: session.event_timestamp,
                    channel_label: session.channel_name.clone(),
                    holder_engagement: session.holder_engagement,
                    closer_engagement: session.closer_engagement,
                    impression_interaction: session.impression_interaction,
                    is_last_touch: session.session_id == last_touch,
                },
            ));
        }
    }

    keyed.sort_by(|(user_a, a), (user_b, b)| {
        user_a
            .cmp(user_b)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
            .then_with(|| a.conversion_id.cmp(&b.conversion_id))
            .then_with(|| a.session_id.cmp(&b.session_id))
    });

    let journeys: Vec<CustomerJourney> = keyed.into_iter().map(|(_, j)| j).collect();
    info!(
        journeys = journeys.len(),
        unmatched_conversions = unmatched,
        "Customer journeys built"
    );
    journeys
}
