use crate::output::{display_path, print_json};
use std::path::Path;
use std::process::ExitCode;
use syntaxfix_core::{FixStatus, ProcessingMode};
use syntaxfix_engine::{Caller, ProcessResponse, RunSummary, SyntaxFixEngine};
use syntaxfix_security::Admission;

/// Exit status for a request refused by the rate limiter
pub const DENIED_EXIT_CODE: u8 = 2;

pub async fn execute(
    engine: &SyntaxFixEngine,
    path: &Path,
    mode: ProcessingMode,
    caller: &Caller,
    json: bool,
    verbose: bool,
) -> eyre::Result<ExitCode> {
    let response = engine.process(path, caller, mode).await?;

    if json {
        print_json(&response)?;
    } else {
        match &response {
            ProcessResponse::Completed(summary) => print_summary(summary, verbose),
            ProcessResponse::Denied {
                tier,
                reason,
                window,
                retry_after,
                upgrade_available,
            } => {
                println!("✗ Request denied ({tier} tier, {window} window): {reason}");
                println!("  retry in {}s", retry_after.as_secs());
                if *upgrade_available {
                    println!(
                        "  higher limits: syntaxfix request-key --company <NAME> --email <EMAIL>"
                    );
                }
            }
        }
    }

    Ok(if response.is_denied() {
        ExitCode::from(DENIED_EXIT_CODE)
    } else {
        ExitCode::SUCCESS
    })
}

fn print_summary(summary: &RunSummary, verbose: bool) {
    let metrics = &summary.metrics;

    if summary.mode == summary.requested_mode {
        println!(
            "✓ Processed {} files in {:.2}s ({} mode, {} strategy, {} tier)",
            metrics.total_files_processed,
            metrics.execution_time_secs,
            summary.mode,
            summary.strategy,
            summary.tier
        );
    } else {
        println!(
            "✓ Processed {} files in {:.2}s ({} mode requested, ran {} with {} strategy, {} tier)",
            metrics.total_files_processed,
            metrics.execution_time_secs,
            summary.requested_mode,
            summary.mode,
            summary.strategy,
            summary.tier
        );
    }
    println!(
        "  errors found: {}  fixes applied: {}  success rate: {:.1}%  over-correction: {:.2}x",
        metrics.total_errors_found,
        metrics.total_fixes_applied,
        metrics.success_rate,
        metrics.over_correction_factor
    );
    println!(
        "  estimated errors: {}  accuracy: {:.1}%",
        metrics.estimated_vs_actual.estimated, metrics.estimated_vs_actual.accuracy
    );

    if summary.cancelled {
        println!("  run stopped early, {} files not started", summary.skipped);
    }
    if summary.duplicates_removed > 0 {
        println!("  {} duplicate paths ignored", summary.duplicates_removed);
    }

    if !metrics.method_breakdown.is_empty() {
        println!("  by method:");
        for (method, breakdown) in &metrics.method_breakdown {
            println!(
                "    {method:<16} {:>5} files {:>6} fixes  avg {:.3}s",
                breakdown.files, breakdown.fixes, breakdown.avg_time_secs
            );
        }
    }

    let listed = summary
        .outcomes
        .iter()
        .filter(|o| verbose || !matches!(o.status, FixStatus::Success | FixStatus::CacheHit));
    for outcome in listed {
        println!(
            "    {} {} via {} ({} errors, {} fixes)",
            display_path(&summary.root, &outcome.path),
            outcome.status,
            outcome.method,
            outcome.errors_found,
            outcome.fixes_applied
        );
    }

    if let Admission::Admitted {
        remaining_daily,
        remaining_hourly,
        ..
    } = &summary.admission
    {
        println!("  quota left: {remaining_hourly} this hour, {remaining_daily} today");
    }
}
