use std::collections::VecDeque;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use proclusive_workflow::domain::commission::parse_currency;
use proclusive_workflow::domain::{AdminId, CommissionTerms, EntityType, ReferralId};
use proclusive_workflow::infra::{AuditLog, LogOnlyPublisher, PgAuditLog, ReferralRepository};
use proclusive_workflow::metrics::MetricsRegistry;
use proclusive_workflow::telemetry::{init_telemetry, TelemetryConfig};
use proclusive_workflow::workflow::{ApprovalReconciler, Repositories, SideEffectDispatcher};

fn print_help() {
    eprintln!(
        "\
proclusive-admin

USAGE:
  proclusive-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  reconcile                       Find approved applications whose profile is not verified
  audit-log                       Print audit entries as NDJSON
  commission                      Compute commission for a referral or an amount

COMMON OPTIONS:
  --database-url <postgres_url>    (defaults to env DATABASE_URL)

reconcile OPTIONS:
  --repair                        Re-apply profile verification where safe
  --admin-id <uuid>               (default: system) Admin recorded on repair audit entries

audit-log OPTIONS:
  --entity-type <application|profile|referral>
  --entity-id <uuid>              (requires --entity-type)
  --limit <n>                     (default: 50; used without --entity-id)

commission OPTIONS:
  --referral-id <uuid>            Completed referral to compute from
  --value <amount>                Project value, e.g. \"$125,000\" (no database needed)
  --rate <fraction>               (optional with --value) Custom referrer rate, e.g. 0.03
"
    );
}

fn require_database_url(database_url: Option<String>) -> anyhow::Result<String> {
    database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (or pass --database-url)"))
}

fn next_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

async fn connect(database_url: Option<String>) -> anyhow::Result<PgPool> {
    let database_url = require_database_url(database_url)?;
    Ok(PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    init_telemetry(&TelemetryConfig {
        log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        ..TelemetryConfig::default()
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {e}"))?;

    match command.as_str() {
        "migrate" => {
            let mut database_url: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let pool = connect(database_url).await?;
            proclusive_workflow::migrations::run_postgres(&pool).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "reconcile" => {
            let mut database_url: Option<String> = None;
            let mut repair = false;
            let mut admin = AdminId::system();

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "--repair" => repair = true,
                    "--admin-id" => {
                        let raw = next_value(&mut args, &arg)?;
                        admin = AdminId::from_uuid(Uuid::parse_str(&raw)?);
                    }
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let pool = connect(database_url).await?;
            let metrics = Arc::new(MetricsRegistry::new());
            let dispatcher = Arc::new(SideEffectDispatcher::new(
                Arc::new(PgAuditLog::new(pool.clone())),
                Arc::new(LogOnlyPublisher),
                metrics.clone(),
            ));
            let reconciler =
                ApprovalReconciler::new(Repositories::postgres(pool), dispatcher, metrics);

            let report = if repair {
                reconciler.repair(admin).await?
            } else {
                reconciler.scan().await?
            };

            for finding in &report.findings {
                println!("{}", serde_json::to_string(finding)?);
            }
            if report.is_consistent() {
                println!("ok: no inconsistent approvals");
            } else {
                println!(
                    "found {} inconsistent member(s), repaired {}",
                    report.findings.len(),
                    report.repaired
                );
            }
            Ok(())
        }
        "audit-log" => {
            let mut database_url: Option<String> = None;
            let mut entity_type: Option<EntityType> = None;
            let mut entity_id: Option<Uuid> = None;
            let mut limit: i64 = 50;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "--entity-type" => {
                        let raw = next_value(&mut args, &arg)?;
                        entity_type = Some(raw.parse().map_err(|e: String| anyhow::anyhow!(e))?);
                    }
                    "--entity-id" => {
                        let raw = next_value(&mut args, &arg)?;
                        entity_id = Some(Uuid::parse_str(&raw)?);
                    }
                    "--limit" => limit = next_value(&mut args, &arg)?.parse()?,
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let audit = PgAuditLog::new(connect(database_url).await?);
            let entries = match (entity_type, entity_id) {
                (Some(entity_type), Some(entity_id)) => {
                    audit.for_entity(entity_type, entity_id).await?
                }
                (None, Some(_)) => anyhow::bail!("--entity-id requires --entity-type"),
                (Some(entity_type), None) => audit
                    .recent(limit)
                    .await?
                    .into_iter()
                    .filter(|e| e.entity_type == entity_type)
                    .collect(),
                (None, None) => audit.recent(limit).await?,
            };

            for entry in entries {
                println!("{}", serde_json::to_string(&entry)?);
            }
            Ok(())
        }
        "commission" => {
            let mut database_url: Option<String> = None;
            let mut referral_id: Option<Uuid> = None;
            let mut value: Option<String> = None;
            let mut rate: Option<String> = None;

            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--database-url" => database_url = Some(next_value(&mut args, &arg)?),
                    "--referral-id" => {
                        let raw = next_value(&mut args, &arg)?;
                        referral_id = Some(Uuid::parse_str(&raw)?);
                    }
                    "--value" => value = Some(next_value(&mut args, &arg)?),
                    "--rate" => rate = Some(next_value(&mut args, &arg)?),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let breakdown = match (referral_id, value) {
                (Some(id), None) => {
                    let repos = Repositories::postgres(connect(database_url).await?);
                    let referral = repos
                        .referrals
                        .get(&ReferralId::from_uuid(id))
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("referral not found: {id}"))?;
                    referral.commission_due().ok_or_else(|| {
                        anyhow::anyhow!(
                            "referral {id} is {} or has no parseable value",
                            referral.status
                        )
                    })?
                }
                (None, Some(value)) => {
                    let amount = parse_currency(&value).map_err(|e| anyhow::anyhow!(e))?;
                    let terms = match rate {
                        Some(rate) => CommissionTerms::custom(rate.parse()?)
                            .map_err(|e| anyhow::anyhow!(e))?,
                        None => CommissionTerms::Standard,
                    };
                    terms.breakdown(amount)
                }
                _ => anyhow::bail!("pass exactly one of --referral-id or --value"),
            };

            println!("{}", serde_json::to_string_pretty(&breakdown)?);
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
