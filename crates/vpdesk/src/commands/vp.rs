//! VP command handlers: one-shot lookups and commands, list browsing, and
//! the interactive collection session.

use chrono::Utc;
use dialoguer::{Input, Select};
use serde::Serialize;
use tabled::Tabled;

use vpdesk_core::{
    ActionGate, ActionReceipt, CommandKind, DmsGateway, EffectiveView, MessageLevel,
    OptimisticOverlay, SessionPhase, SessionSnapshot, VpListQuery, VpPage, VpRecord, VpSession,
    merge,
};

use crate::cli::{GlobalOpts, OutputFormat, VpArgs, VpCommand, VpListArgs};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Output shapes ───────────────────────────────────────────────────

/// A record as the session sees it right now.
#[derive(Debug, Serialize)]
struct VpStatus {
    phase: SessionPhase,
    record: VpRecord,
    view: EffectiveView,
    gate: ActionGate,
}

impl VpStatus {
    fn from_snapshot(snap: &SessionSnapshot) -> Option<Self> {
        Some(Self {
            phase: snap.phase,
            record: snap.record.clone()?,
            view: snap.view?,
            gate: snap.gate,
        })
    }
}

/// A command the server accepted, with the record as re-fetched after it.
#[derive(Debug, Serialize)]
struct ActionOutcome {
    receipt: ActionReceipt,
    status: Option<VpStatus>,
}

#[derive(Tabled)]
struct VpRow {
    #[tabled(rename = "Barcode")]
    barcode: String,
    #[tabled(rename = "Payable")]
    payable: String,
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "OTP")]
    otp: String,
    #[tabled(rename = "Paid")]
    paid: String,
    #[tabled(rename = "Sender")]
    sender: String,
    #[tabled(rename = "Booked At")]
    booked: String,
}

impl VpRow {
    fn new(record: &VpRecord, color: bool) -> Self {
        // Outside a session there is no overlay; merge still flags lapsed OTPs.
        let view = merge(record, &OptimisticOverlay::default(), Utc::now());
        Self {
            barcode: record.barcode.clone(),
            payable: record.payable_amount.to_string(),
            received: output::paint(
                record.received_status,
                if record.is_received() { Tone::Good } else { Tone::Waiting },
                color,
            ),
            otp: output::paint(view.display_otp_status, otp_tone(&view), color),
            paid: output::paint(
                record.paid_status,
                if record.is_paid() { Tone::Good } else { Tone::Waiting },
                color,
            ),
            sender: record.details.sender_name.clone().unwrap_or_default(),
            booked: record.details.booked_branch.name.clone().unwrap_or_default(),
        }
    }
}

fn otp_tone(view: &EffectiveView) -> Tone {
    use vpdesk_core::DisplayOtpStatus as D;
    match view.display_otp_status {
        D::Verified => Tone::Good,
        D::SentSuccess | D::Pending => Tone::Waiting,
        D::SentFailed | D::Expired => Tone::Bad,
    }
}

// ── Detail rendering ────────────────────────────────────────────────

fn status_detail(status: &VpStatus, color: bool) -> String {
    let record = &status.record;
    let view = &status.view;
    let now = Utc::now();

    let otp = match (view.effective_expires_at, view.remaining(now)) {
        (Some(at), Some(left)) => format!(
            "{} (expires {}, {} left)",
            view.display_otp_status,
            util::local_time(at),
            util::countdown(left)
        ),
        (Some(at), None) => format!("{} (at {})", view.display_otp_status, util::local_time(at)),
        (None, _) => view.display_otp_status.to_string(),
    };

    let sender = match (&record.details.sender_name, &record.details.sender_phone) {
        (Some(name), Some(phone)) => format!("{name} ({phone})"),
        (Some(name), None) => name.clone(),
        (None, Some(phone)) => phone.clone(),
        (None, None) => "-".into(),
    };

    let mut pairs = vec![
        ("Barcode", record.barcode.clone()),
        ("Phase", status.phase.to_string()),
        (
            "Received",
            output::paint(
                record.received_status,
                if record.is_received() { Tone::Good } else { Tone::Waiting },
                color,
            ),
        ),
        ("OTP", output::paint(otp, otp_tone(view), color)),
        (
            "Paid",
            output::paint(
                record.paid_status,
                if record.is_paid() { Tone::Good } else { Tone::Waiting },
                color,
            ),
        ),
        ("Payable amount", record.payable_amount.to_string()),
        ("Commission", record.commission.to_string()),
        ("Total VP cost", record.total_vp_cost.to_string()),
        ("Sender", sender),
    ];
    if let Some(ref name) = record.details.booked_branch.name {
        pairs.push(("Booked at", name.clone()));
    }
    if let Some(ref name) = record.details.delivery_branch.name {
        pairs.push(("Delivery", name.clone()));
    }
    pairs.push(("Next", output::paint(next_steps(&status.gate), Tone::Muted, color)));

    output::detail_lines(&pairs)
}

fn next_steps(gate: &ActionGate) -> String {
    let mut steps = Vec::new();
    if gate.can_receive {
        steps.push("receive");
    }
    if gate.can_send_otp {
        steps.push("send-otp");
    }
    if gate.can_pay_with_otp {
        steps.push("pay");
    }
    if steps.is_empty() {
        "-".into()
    } else {
        steps.join(", ")
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: VpArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let profile = resolved.profile_name.clone();
    run(args.command, resolved, global)
        .await
        .map_err(|e| e.for_profile(&profile))
}

async fn run(cmd: VpCommand, resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let session = VpSession::new(DmsGateway::connect(&resolved.gateway)?, resolved.session);
    let color = output::should_color(&global.color);

    let result = match cmd {
        VpCommand::List(args) => list(session.gateway(), &args, global, color).await,
        VpCommand::Collect { barcode } => collect(&session, barcode, global, color).await,
        VpCommand::Info { barcode } => info(&session, &barcode, global, color).await,
        VpCommand::Receive { barcode } => {
            one_shot(&session, &barcode, CommandKind::Receive, None, global, color).await
        }
        VpCommand::SendOtp { barcode } => {
            one_shot(&session, &barcode, CommandKind::SendOtp, None, global, color).await
        }
        VpCommand::Pay { barcode, otp } => {
            let otp = match otp {
                Some(otp) => otp,
                None => prompt_otp()?,
            };
            one_shot(&session, &barcode, CommandKind::PayWithOtp, Some(&otp), global, color).await
        }
    };
    session.shutdown().await;
    result
}

async fn info(
    session: &VpSession<DmsGateway>,
    barcode: &str,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    util::with_spinner("Loading VP information", global, session.open(barcode)).await?;
    let snap = session.snapshot().await;
    session.close().await;
    let Some(status) = VpStatus::from_snapshot(&snap) else {
        return Err(CliError::NotFound {
            barcode: barcode.into(),
        });
    };
    let out = output::render_single(
        &global.output,
        &status,
        |s| status_detail(s, color),
        |s| s.record.barcode.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Open a session, run one command through it, and report the outcome.
async fn one_shot(
    session: &VpSession<DmsGateway>,
    barcode: &str,
    kind: CommandKind,
    otp: Option<&str>,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let result = async {
        util::with_spinner("Loading VP information", global, session.open(barcode)).await?;
        let label = kind.to_string();
        let receipt = util::with_spinner(&label, global, execute(session, kind, otp))
            .await?;
        Ok::<_, CliError>(receipt)
    }
    .await;

    let snap = session.snapshot().await;
    session.close().await;
    let receipt = result?;

    let outcome = ActionOutcome {
        receipt,
        status: VpStatus::from_snapshot(&snap),
    };
    let out = output::render_single(
        &global.output,
        &outcome,
        |o| {
            let mut text = output::paint(
                format!("✓ {}", o.receipt.display_message()),
                Tone::Good,
                color,
            );
            if let Some(ref status) = o.status {
                text.push_str("\n\n");
                text.push_str(&status_detail(status, color));
            }
            text
        },
        |o| {
            o.status
                .as_ref()
                .map_or_else(String::new, |s| s.phase.to_string())
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn execute(
    session: &VpSession<DmsGateway>,
    kind: CommandKind,
    otp: Option<&str>,
) -> Result<ActionReceipt, CliError> {
    let receipt = match kind {
        CommandKind::Receive => session.receive().await?,
        CommandKind::SendOtp => session.send_otp().await?,
        CommandKind::PayWithOtp => session.pay_with_otp(otp.unwrap_or_default()).await?,
    };
    Ok(receipt)
}

fn prompt_otp() -> Result<String, CliError> {
    Input::<String>::new()
        .with_prompt("OTP from the sender")
        .interact_text()
        .map_err(util::prompt_err)
}

// ── List ────────────────────────────────────────────────────────────

fn list_query(args: &VpListArgs) -> VpListQuery {
    VpListQuery {
        page: args.page,
        page_size: args.page_size,
        search: args.search.clone(),
        from_date: args.from.clone(),
        to_date: args.to.clone(),
        paid_status: args.paid.wire().map(str::to_owned),
        received_status: args.received.wire().map(str::to_owned),
        otp_status: args.otp.wire().map(str::to_owned),
        service_type: args.service_type.clone(),
    }
}

async fn list(
    gateway: &DmsGateway,
    args: &VpListArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let query = list_query(args);
    let page: VpPage =
        util::with_spinner("Loading VP records", global, gateway.list(&query)).await?;

    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => output::render_list(
            &global.output,
            &page.records,
            |r| VpRow::new(r, color),
            |r| r.barcode.clone(),
        )?,
        // Structured formats keep the paging envelope.
        _ => output::render_single(&global.output, &page, |_| String::new(), |_| String::new())?,
    };
    output::print_output(&out, global.quiet);

    if !global.quiet && matches!(global.output, OutputFormat::Table) {
        eprintln!(
            "Page {} of {} · {} records",
            page.current_page, page.total_pages, page.total_records
        );
    }
    if page.skipped > 0 {
        tracing::warn!(skipped = page.skipped, "some VP rows could not be read");
        if !global.quiet {
            eprintln!("{} unreadable rows skipped", page.skipped);
        }
    }
    Ok(())
}

// ── Collect: interactive session ────────────────────────────────────

enum Choice {
    Run(CommandKind),
    Refresh,
    Quit,
}

fn choices(snap: &SessionSnapshot) -> Vec<(String, Choice)> {
    let mut items = Vec::new();
    if snap.can(CommandKind::Receive) {
        items.push((CommandKind::Receive.to_string(), Choice::Run(CommandKind::Receive)));
    }
    if snap.can(CommandKind::SendOtp) {
        let resend = snap
            .view
            .is_some_and(|v| v.display_otp_status != vpdesk_core::DisplayOtpStatus::Pending);
        let label = if resend { "Resend payment OTP" } else { "Send payment OTP" };
        items.push((label.into(), Choice::Run(CommandKind::SendOtp)));
    }
    if snap.can(CommandKind::PayWithOtp) {
        items.push((CommandKind::PayWithOtp.to_string(), Choice::Run(CommandKind::PayWithOtp)));
    }
    items.push(("Refresh".into(), Choice::Refresh));
    items.push(("Quit".into(), Choice::Quit));
    items
}

/// Print log entries added since `seen`, returning the new count.
fn print_new_messages(snap: &SessionSnapshot, seen: usize, color: bool) -> usize {
    let entries = snap.messages.entries();
    for msg in entries.iter().skip(seen) {
        let tone = match msg.level {
            MessageLevel::Info => Tone::Good,
            MessageLevel::Error => Tone::Bad,
        };
        let mark = if msg.is_error() { "✗" } else { "✓" };
        eprintln!("{}", output::paint(format!("{mark} {}", msg.text), tone, color));
    }
    entries.len()
}

async fn collect(
    session: &VpSession<DmsGateway>,
    barcode: Option<String>,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let barcode = match barcode {
        Some(b) => b,
        None => Input::<String>::new()
            .with_prompt("Barcode")
            .interact_text()
            .map_err(util::prompt_err)?,
    };

    let opened =
        util::with_spinner("Loading VP information", global, session.open(&barcode)).await;
    let mut seen = 0;
    if let Err(e) = opened {
        let snap = session.snapshot().await;
        print_new_messages(&snap, seen, color);
        session.close().await;
        return Err(e.into());
    }
    tracing::info!(barcode = %barcode, "collection session opened");

    loop {
        let snap = session.snapshot().await;
        seen = print_new_messages(&snap, seen, color);

        if let Some(status) = VpStatus::from_snapshot(&snap) {
            eprintln!("\n{}\n", status_detail(&status, color));
        }
        if snap.phase.is_terminal() {
            eprintln!("{}", output::paint("VP paid. Collection complete.", Tone::Good, color));
            break;
        }

        let items = choices(&snap);
        let labels: Vec<&str> = items.iter().map(|(label, _)| label.as_str()).collect();
        let picked = Select::new()
            .with_prompt("Next step")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(util::prompt_err)?;
        let Some((_, choice)) = items.into_iter().nth(picked) else {
            continue;
        };

        // Failures are already in the session log; the loop prints them.
        match choice {
            Choice::Run(kind) => {
                let otp = if kind == CommandKind::PayWithOtp {
                    Some(prompt_otp()?)
                } else {
                    None
                };
                let label = kind.to_string();
                let result =
                    util::with_spinner(&label, global, execute(session, kind, otp.as_deref()))
                        .await;
                if let Err(e) = result {
                    tracing::debug!(error = %e, "command failed");
                }
            }
            Choice::Refresh => {
                if let Err(e) =
                    util::with_spinner("Refreshing", global, session.refresh()).await
                {
                    tracing::debug!(error = %e, "refresh failed");
                }
            }
            Choice::Quit => break,
        }
    }

    session.close().await;
    tracing::info!(barcode = %barcode, "collection session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use vpdesk_core::{OtpStatus, ReceivedStatus};

    use super::*;

    fn snapshot(record: VpRecord) -> SessionSnapshot {
        let view = merge(&record, &OptimisticOverlay::default(), Utc::now());
        SessionSnapshot {
            barcode: Some(record.barcode.clone()),
            phase: SessionPhase::derive(Some(&record), Some(&view)),
            gate: ActionGate::evaluate(&record, &view),
            view: Some(view),
            record: Some(record),
            ..SessionSnapshot::default()
        }
    }

    fn labels(snap: &SessionSnapshot) -> Vec<String> {
        choices(snap).into_iter().map(|(label, _)| label).collect()
    }

    #[test]
    fn pending_record_offers_receive() {
        let snap = snapshot(VpRecord::pending("EV1"));
        assert_eq!(labels(&snap), ["Receive VP money", "Refresh", "Quit"]);
    }

    #[test]
    fn failed_otp_offers_resend() {
        let mut record = VpRecord::pending("EV1");
        record.received_status = ReceivedStatus::Received;
        record.otp_status = OtpStatus::SentFailed;
        let snap = snapshot(record);
        assert_eq!(labels(&snap), ["Resend payment OTP", "Refresh", "Quit"]);
    }

    #[test]
    fn next_steps_lists_permitted_commands() {
        let gate = ActionGate {
            can_receive: false,
            can_send_otp: true,
            can_pay_with_otp: false,
        };
        assert_eq!(next_steps(&gate), "send-otp");
        assert_eq!(next_steps(&ActionGate::closed()), "-");
    }

    #[test]
    fn all_filters_are_dropped_from_the_query() {
        use crate::cli::{OtpFilter, PaidFilter, ReceivedFilter};
        let args = VpListArgs {
            page: 2,
            page_size: 25,
            search: None,
            from: None,
            to: None,
            paid: PaidFilter::Paid,
            received: ReceivedFilter::All,
            otp: OtpFilter::SentSuccess,
            service_type: None,
        };
        let query = list_query(&args);
        assert_eq!(query.page, 2);
        assert_eq!(query.paid_status.as_deref(), Some("Paid"));
        assert_eq!(query.received_status, None);
        assert_eq!(query.otp_status.as_deref(), Some("sent_success"));
    }
}
