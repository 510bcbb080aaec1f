use crate::output::{format_bytes, print_json};
use syntaxfix_engine::{SyntaxFixEngine, TierInfo};

pub fn tiers(json: bool) -> eyre::Result<()> {
    let tiers = SyntaxFixEngine::tiers();
    if json {
        return print_json(&tiers);
    }
    print_tiers(&tiers);
    Ok(())
}

pub fn status(engine: &SyntaxFixEngine, json: bool) -> eyre::Result<()> {
    let status = engine.status();
    if json {
        return print_json(&status);
    }

    println!("{} {}", status.service, status.version);
    println!("Languages:");
    for (language, extensions) in &status.extensions {
        let marker = if status.configured_languages.contains(language) {
            "✓"
        } else {
            " "
        };
        println!("  {marker} {:<12} {}", language.as_str(), extensions.join(" "));
    }

    let stats = &status.orchestration_stats;
    println!("Orchestration:");
    println!(
        "  requests {}  local {}  remote {}  patterns {}  cache hits {}",
        stats.total_requests,
        stats.local_successes,
        stats.remote_successes,
        stats.pattern_based_uses,
        stats.cache_hits
    );
    if let Some(cache) = &status.cache {
        println!(
            "  cache: {} entries, {:.1}% hit rate",
            cache.entries,
            cache.hit_rate() * 100.0
        );
    }

    println!("Tiers:");
    print_tiers(&status.tiers);
    Ok(())
}

fn print_tiers(tiers: &[TierInfo]) {
    for info in tiers {
        println!(
            "  {:<11} {:>6}/day {:>6}/hour  max file {:>8}  {}",
            info.tier.as_str(),
            info.limits.fixes_per_day,
            info.limits.fixes_per_hour,
            format_bytes(info.limits.max_file_size),
            info.limits.features.join(", ")
        );
    }
}
