use crate::output::{format_bytes, print_json};
use std::path::Path;
use syntaxfix_engine::SyntaxFixEngine;

pub async fn execute(engine: &SyntaxFixEngine, path: &Path, json: bool) -> eyre::Result<()> {
    let analysis = engine.analyze(path).await?;

    if json {
        return print_json(&analysis);
    }

    println!("Repository: {}", path.display());
    println!(
        "  {} files, {}",
        analysis.total_files,
        format_bytes(analysis.total_size_bytes)
    );
    for (language, count) in &analysis.languages {
        println!("    {:<12} {count}", language.as_str());
    }
    println!("  estimated errors: {}", analysis.estimated_errors);
    println!("  strategy: {}", analysis.strategy);

    let profile = &analysis.performance_profile;
    println!(
        "  estimated time: {:.1}s sequential, {:.1}s with {} workers ({:.1}x)",
        profile.estimated_sequential_secs,
        profile.estimated_parallel_secs,
        profile.optimal_workers,
        profile.speedup_factor
    );
    println!(
        "  memory estimate: {:.1} MB, complexity {:.1}",
        profile.memory_usage_estimate_mb, profile.complexity_score
    );
    if analysis.orchestration_recommended {
        println!("  orchestrated processing recommended");
    }
    Ok(())
}
