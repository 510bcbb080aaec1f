use crate::output::print_json;
use syntaxfix_engine::{Caller, SyntaxFixEngine};
use syntaxfix_security::KeyRequest;

pub fn request_key(
    engine: &SyntaxFixEngine,
    company: String,
    email: String,
    use_case: Option<String>,
    json: bool,
) -> eyre::Result<()> {
    let request = KeyRequest {
        company,
        email,
        use_case,
    };
    let issued = engine.request_quota_upgrade(&request)?;

    if json {
        return print_json(&issued);
    }

    println!("✓ Issued {} key", issued.tier);
    println!("  {}", issued.api_key);
    println!(
        "  limits: {} fixes/day, {} fixes/hour",
        issued.limits.fixes_per_day, issued.limits.fixes_per_hour
    );
    println!("  pass it with --api-key; it is not shown again");
    Ok(())
}

pub async fn usage(engine: &SyntaxFixEngine, caller: &Caller, json: bool) -> eyre::Result<()> {
    let usage = engine.usage(caller).await?;

    if json {
        return print_json(&usage);
    }

    println!("Tier: {}", usage.tier);
    println!(
        "  this hour: {} used, {} left",
        usage.used_hourly, usage.remaining_hourly
    );
    println!(
        "  today:     {} used, {} left",
        usage.used_daily, usage.remaining_daily
    );
    Ok(())
}
