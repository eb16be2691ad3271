// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead commands: `claim`, `resubmit`, `review`, `release`.

use leadpool_core::{ClaimResult, Lead, LeadPayload, LeadStatus, LeadpoolError, WorkerId};
use leadpool_engine::LeadEngine;
use serde::Serialize;

use crate::output::{Output, Painter};

#[derive(Debug, Serialize)]
struct ClaimResponse<'a> {
    key: String,
    #[serde(flatten)]
    result: &'a ClaimResult,
}

fn print_claim(result: &ClaimResult, paint: &Painter) {
    match result {
        ClaimResult::Accepted { lead_id } => {
            println!("{} lead #{lead_id}", paint.good("accepted"));
        }
        ClaimResult::Duplicate(conflict) => {
            let category = conflict.category.as_deref().unwrap_or("no category");
            println!(
                "{}: already claimed by {} as lead #{} ({category}, {})",
                paint.bad("duplicate"),
                conflict.worker_id,
                conflict.lead_id,
                conflict.status
            );
        }
    }
}

fn emit_claim(engine: &LeadEngine, raw: &str, result: &ClaimResult, out: &Output) {
    let response = ClaimResponse {
        key: engine.normalize(raw),
        result,
    };
    out.emit(&response, |paint| print_claim(result, paint));
}

pub async fn run_claim(
    engine: &LeadEngine,
    payload: &LeadPayload,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let result = engine.submit_lead(payload).await?;
    emit_claim(engine, &payload.raw_contact, &result, out);
    Ok(())
}

pub async fn run_resubmit(
    engine: &LeadEngine,
    lead_id: i64,
    worker: &str,
    contact: &str,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let result = engine
        .resubmit_lead(lead_id, &WorkerId::from(worker), contact)
        .await?;
    emit_claim(engine, contact, &result, out);
    Ok(())
}

fn print_lead(lead: &Lead) {
    println!(
        "lead #{} {} by {}: {} [{}]",
        lead.id, lead.status, lead.worker_id, lead.raw_contact, lead.normalized_key
    );
}

pub async fn run_review(
    engine: &LeadEngine,
    lead_id: i64,
    status: LeadStatus,
    out: &Output,
) -> Result<(), LeadpoolError> {
    let lead = engine.set_lead_status(lead_id, status).await?;
    out.emit(&lead, |_| print_lead(&lead));
    Ok(())
}

pub async fn run_release(engine: &LeadEngine, contact: &str, out: &Output) -> Result<(), LeadpoolError> {
    let released = engine.release_lead(contact).await?;
    out.emit(&released, |paint| match &released {
        Some(lead) => {
            print!("{} ", paint.good("released"));
            print_lead(lead);
        }
        None => println!("{}", paint.warn("no lead holds this contact")),
    });
    Ok(())
}
